//! Core data types for the miss-event log
//!
//! - `MissEvent`: one recorded 404 occurrence
//! - `NewMissEvent`: insert payload, before an id is assigned
//! - `GroupSummary`: derived count per distinct group value

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single "URL not found" occurrence
///
/// Immutable once stored. The only way to change the log is to delete rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MissEvent {
    /// Unique id, assigned by the store and never reused
    pub id: i64,
    /// Requested path that matched nothing
    pub url: String,
    /// Originating page, if the client sent one
    #[serde(default)]
    pub referrer: Option<String>,
    /// Client user agent
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Client network address
    #[serde(default)]
    pub ip: Option<String>,
    /// When the miss happened
    pub created_at: DateTime<Utc>,
}

impl MissEvent {
    /// Value of the given group dimension, with a missing value mapped to the
    /// empty bucket key
    pub fn group_key(&self, dimension: GroupBy) -> &str {
        match dimension {
            GroupBy::Url => &self.url,
            GroupBy::Ip => self.ip.as_deref().unwrap_or(""),
        }
    }
}

/// Payload for recording a new miss event
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NewMissEvent {
    pub url: String,
    #[serde(default)]
    pub referrer: Option<String>,
    #[serde(default, alias = "agent")]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    /// Defaults to the time of insertion
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewMissEvent {
    /// Create a new event for a URL, timestamped on insert
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            referrer: None,
            user_agent: None,
            ip: None,
            created_at: None,
        }
    }

    /// Builder method: set referrer
    pub fn referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    /// Builder method: set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Builder method: set client address
    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Builder method: set occurrence time
    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Dimension used to bucket events in grouped views and group deletes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Ip,
    Url,
}

impl GroupBy {
    /// Parse a `groupBy` parameter. Anything outside `ip`/`url` means
    /// "no grouping".
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ip" => Some(Self::Ip),
            "url" => Some(Self::Url),
            _ => None,
        }
    }

    /// Dimension used when a bulk delete receives a group value.
    ///
    /// Only an explicit `ip` grouping deletes by address; everything else
    /// deletes by exact URL.
    pub fn for_deletion(group_by: Option<GroupBy>) -> Self {
        match group_by {
            Some(GroupBy::Ip) => GroupBy::Ip,
            _ => GroupBy::Url,
        }
    }

    /// Column holding this dimension
    pub fn column(&self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::Url => "url",
        }
    }
}

impl std::fmt::Display for GroupBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.column())
    }
}

/// Aggregate row of a grouped view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupSummary {
    /// Distinct value of the group dimension (`""` for missing values)
    pub group_key: String,
    /// Number of matching events in this bucket, always at least 1
    pub count: u64,
}
