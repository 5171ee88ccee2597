//! Retention sweeper
//!
//! Periodically expires miss events older than the configured age. Runs
//! in the server binary only; the store exposes `expire_before` and knows
//! nothing about schedules.

use crate::config::RetentionConfig;
use crate::store::{LogStore, StoreResult};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// How long events are kept and how often the sweeper looks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// 0 keeps everything
    pub max_age_days: u32,
    pub sweep_interval: Duration,
}

impl RetentionPolicy {
    pub fn new(max_age_days: u32, sweep_interval: Duration) -> Self {
        Self {
            max_age_days,
            // Zero would make tokio's interval panic
            sweep_interval: sweep_interval.max(Duration::from_secs(1)),
        }
    }

    pub fn from_config(config: &RetentionConfig) -> Self {
        Self::new(config.days, Duration::from_secs(config.sweep_interval_secs))
    }

    pub fn is_enabled(&self) -> bool {
        self.max_age_days > 0
    }

    /// Events created before this instant are expired
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.is_enabled() {
            return None;
        }
        now.checked_sub_signed(ChronoDuration::days(i64::from(self.max_age_days)))
    }
}

/// Expire everything older than the policy allows, as of `now`
pub fn sweep_once(
    store: &LogStore,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> StoreResult<usize> {
    let Some(cutoff) = policy.cutoff(now) else {
        return Ok(0);
    };

    let removed = store.expire_before(cutoff)?;
    if removed > 0 {
        tracing::info!(removed, cutoff = %cutoff, "Expired old miss events");
    } else {
        tracing::debug!(cutoff = %cutoff, "Retention sweep found nothing to expire");
    }

    Ok(removed)
}

/// Start the background sweeper. Returns None when retention is disabled.
pub fn spawn_sweeper(
    store: Arc<LogStore>,
    policy: RetentionPolicy,
) -> Option<tokio::task::JoinHandle<()>> {
    if !policy.is_enabled() {
        return None;
    }

    tracing::info!(
        days = policy.max_age_days,
        interval_secs = policy.sweep_interval.as_secs(),
        "Starting retention sweeper"
    );

    Some(tokio::spawn(async move {
        let mut ticker = interval(policy.sweep_interval);

        loop {
            ticker.tick().await;

            let store = Arc::clone(&store);
            let result =
                tokio::task::spawn_blocking(move || sweep_once(&store, &policy, Utc::now())).await;

            match result {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::error!("Retention sweep failed: {}", e),
                Err(e) => tracing::error!("Retention sweep task failed: {}", e),
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NewMissEvent;

    #[test]
    fn test_disabled_policy_keeps_everything() {
        let store = LogStore::open_in_memory().unwrap();
        let now = Utc::now();
        store
            .insert(NewMissEvent::new("/ancient").at(now - ChronoDuration::days(4000)))
            .unwrap();

        let policy = RetentionPolicy::new(0, Duration::from_secs(60));
        assert!(policy.cutoff(now).is_none());
        assert_eq!(sweep_once(&store, &policy, now).unwrap(), 0);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_sweep_expires_old_events() {
        let store = LogStore::open_in_memory().unwrap();
        let now = Utc::now();
        store
            .insert(NewMissEvent::new("/old").at(now - ChronoDuration::days(31)))
            .unwrap();
        store
            .insert(NewMissEvent::new("/recent").at(now - ChronoDuration::days(2)))
            .unwrap();

        let policy = RetentionPolicy::new(30, Duration::from_secs(60));
        assert_eq!(sweep_once(&store, &policy, now).unwrap(), 1);
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.get(2).unwrap().map(|e| e.url), Some("/recent".to_string()));
    }

    #[test]
    fn test_zero_interval_is_raised() {
        let policy = RetentionPolicy::new(1, Duration::ZERO);
        assert_eq!(policy.sweep_interval, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_spawn_sweeper_disabled() {
        let store = Arc::new(LogStore::open_in_memory().unwrap());
        let policy = RetentionPolicy::new(0, Duration::from_secs(60));
        assert!(spawn_sweeper(store, policy).is_none());
    }

    #[tokio::test]
    async fn test_spawn_sweeper_runs_first_tick() {
        let store = Arc::new(LogStore::open_in_memory().unwrap());
        store
            .insert(NewMissEvent::new("/old").at(Utc::now() - ChronoDuration::days(10)))
            .unwrap();

        let policy = RetentionPolicy::new(1, Duration::from_secs(3600));
        let handle = spawn_sweeper(Arc::clone(&store), policy).unwrap();

        // The first tick fires immediately
        for _ in 0..50 {
            if store.count().unwrap() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        handle.abort();
        assert_eq!(store.count().unwrap(), 0);
    }
}
