//! Log Store - SQLite-backed record of miss events
//!
//! One table keyed by `id` with secondary indexes on `url`, `ip` and
//! `created_at`. The connection sits behind a `std::sync::Mutex`:
//!
//! - every insert or delete is a single statement, so each is atomic
//! - `list()` reads its count and its page inside one transaction, so both
//!   come from the same snapshot
//!
//! # Layout
//! ```text
//! miss_events(id PK AUTOINCREMENT, url, referrer, user_agent, ip, created_at ms)
//! ```

use crate::filter::{Predicate, SqlClause};
use crate::query::{ListItems, ListResult, Page, Plan};
use crate::store::error::{StoreError, StoreResult};
use crate::store::types::{GroupBy, GroupSummary, MissEvent, NewMissEvent};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OpenFlags, Row, ToSql};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS miss_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        url TEXT NOT NULL,
        referrer TEXT,
        user_agent TEXT,
        ip TEXT,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_miss_events_url ON miss_events(url);
    CREATE INDEX IF NOT EXISTS idx_miss_events_ip ON miss_events(ip);
    CREATE INDEX IF NOT EXISTS idx_miss_events_created_at ON miss_events(created_at);
";

const COLUMNS: &str = "id, url, referrer, user_agent, ip, created_at";

/// Configuration for the log store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the database file
    pub data_dir: PathBuf,
    /// How long a writer waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("misslog_data"),
            busy_timeout_ms: 5000,
        }
    }
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Get path to the database file
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("misslog.db")
    }
}

/// Durable, append-mostly store of miss events
pub struct LogStore {
    /// std::sync::Mutex because a SQLite connection is Send but not Sync
    conn: Mutex<Connection>,
    /// None for in-memory stores
    path: Option<PathBuf>,
}

impl LogStore {
    /// Create or open the store on disk
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let path = config.db_path();

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;

        // Configure for concurrent readers and cheap commits
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            ",
        )?;
        conn.execute_batch(SCHEMA)?;

        tracing::info!(path = ?path, "Opened miss-event log");

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path),
        })
    }

    /// Create a throwaway store in memory
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    /// Record a miss event and return it with its assigned id
    pub fn insert(&self, event: NewMissEvent) -> StoreResult<MissEvent> {
        if event.url.trim().is_empty() {
            return Err(StoreError::Validation("url cannot be empty".to_string()));
        }

        let created_at = truncate_to_millis(event.created_at.unwrap_or_else(Utc::now));
        let referrer = non_empty(event.referrer);
        let user_agent = non_empty(event.user_agent);
        let ip = non_empty(event.ip);

        let id = {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO miss_events (url, referrer, user_agent, ip, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    event.url,
                    referrer,
                    user_agent,
                    ip,
                    created_at.timestamp_millis()
                ],
            )?;
            conn.last_insert_rowid()
        };

        Ok(MissEvent {
            id,
            url: event.url,
            referrer,
            user_agent,
            ip,
            created_at,
        })
    }

    /// Fetch one event by id
    pub fn get(&self, id: i64) -> StoreResult<Option<MissEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {COLUMNS} FROM miss_events WHERE id = ?"
        ))?;
        let mut rows = stmt.query_map(params![id], row_to_event)?;
        let event = rows.next().transpose()?;

        Ok(event)
    }

    /// Run a plan and return one page plus the total
    pub fn list(&self, plan: &Plan) -> StoreResult<ListResult> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let clause = plan.predicate().to_sql();
        let order = plan.order_sql();

        let result = match plan {
            Plan::Flat { page, .. } => ListResult {
                total: count_events(&tx, &clause)?,
                items: ListItems::Events(page_events(&tx, &clause, &order, *page)?),
            },
            Plan::Grouped { group_by, page, .. } => ListResult {
                total: count_groups(&tx, &clause, *group_by)?,
                items: ListItems::Groups(page_groups(&tx, &clause, *group_by, &order, *page)?),
            },
        };

        tx.commit()?;
        Ok(result)
    }

    /// Every event matching the predicate, oldest id first
    pub fn export(&self, predicate: &Predicate) -> StoreResult<Vec<MissEvent>> {
        let clause = predicate.to_sql();
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM miss_events{} ORDER BY id ASC",
            clause.where_sql
        ))?;

        let events = stmt
            .query_map(params_from_iter(clause.params.iter()), row_to_event)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(events)
    }

    /// Number of stored events
    pub fn count(&self) -> StoreResult<u64> {
        let conn = self.conn()?;
        count_events(&conn, &SqlClause::default())
    }

    /// Delete one event. Returns whether a row was removed; a missing id is
    /// not an error.
    pub fn delete_by_id(&self, id: i64) -> StoreResult<bool> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM miss_events WHERE id = ?", params![id])?;

        tracing::debug!(id, removed, "Deleted miss event by id");
        Ok(removed > 0)
    }

    /// Delete every event matching a non-empty predicate in one statement.
    ///
    /// An always-true predicate is refused; wiping the log goes through
    /// `delete_all` so the intent is visible at the call site.
    pub fn delete_matching(&self, predicate: &Predicate) -> StoreResult<usize> {
        if predicate.is_always() {
            return Err(StoreError::Validation(
                "refusing to delete with an empty predicate, use delete_all".to_string(),
            ));
        }

        let clause = predicate.to_sql();
        let conn = self.conn()?;
        let removed = conn.execute(
            &format!("DELETE FROM miss_events{}", clause.where_sql),
            params_from_iter(clause.params.iter()),
        )?;

        tracing::debug!(removed, conditions = predicate.len(), "Deleted matching miss events");
        Ok(removed)
    }

    /// Delete every event sharing a group value
    pub fn delete_group(&self, dimension: GroupBy, value: &str) -> StoreResult<usize> {
        self.delete_matching(&Predicate::group(dimension, value))
    }

    /// Delete every event in the store
    pub fn delete_all(&self) -> StoreResult<usize> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM miss_events", [])?;

        tracing::warn!(removed, "Deleted all miss events");
        Ok(removed)
    }

    /// Delete events that happened before `cutoff`
    pub fn expire_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM miss_events WHERE created_at < ?",
            params![cutoff.timestamp_millis()],
        )?;

        Ok(removed)
    }

    /// Force checkpoint for WAL mode
    pub fn checkpoint(&self) -> StoreResult<()> {
        if self.path.is_none() {
            return Ok(());
        }

        self.conn()?
            .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }

    /// Get the database file path (None when in memory)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn count_events(conn: &Connection, clause: &SqlClause) -> StoreResult<u64> {
    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM miss_events{}", clause.where_sql),
        params_from_iter(clause.params.iter()),
        |row| row.get(0),
    )?;

    Ok(total as u64)
}

fn count_groups(conn: &Connection, clause: &SqlClause, group_by: GroupBy) -> StoreResult<u64> {
    let total: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(DISTINCT COALESCE({}, '')) FROM miss_events{}",
            group_by.column(),
            clause.where_sql
        ),
        params_from_iter(clause.params.iter()),
        |row| row.get(0),
    )?;

    Ok(total as u64)
}

fn page_events(
    conn: &Connection,
    clause: &SqlClause,
    order: &str,
    page: Page,
) -> StoreResult<Vec<MissEvent>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM miss_events{} {} LIMIT ? OFFSET ?",
        clause.where_sql, order
    );

    let limit = page.limit();
    let offset = page.offset();
    let mut bind: Vec<&dyn ToSql> = clause.params.iter().map(|p| p as &dyn ToSql).collect();
    bind.push(&limit);
    bind.push(&offset);

    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map(bind.as_slice(), row_to_event)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

fn page_groups(
    conn: &Connection,
    clause: &SqlClause,
    group_by: GroupBy,
    order: &str,
    page: Page,
) -> StoreResult<Vec<GroupSummary>> {
    let sql = format!(
        "SELECT COALESCE({}, '') AS group_key, COUNT(*) AS total
         FROM miss_events{}
         GROUP BY group_key
         {} LIMIT ? OFFSET ?",
        group_by.column(),
        clause.where_sql,
        order
    );

    let limit = page.limit();
    let offset = page.offset();
    let mut bind: Vec<&dyn ToSql> = clause.params.iter().map(|p| p as &dyn ToSql).collect();
    bind.push(&limit);
    bind.push(&offset);

    let mut stmt = conn.prepare(&sql)?;
    let groups = stmt
        .query_map(bind.as_slice(), |row| {
            let count: i64 = row.get(1)?;
            Ok(GroupSummary {
                group_key: row.get(0)?,
                count: count as u64,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(groups)
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<MissEvent> {
    let created_ms: i64 = row.get(5)?;

    Ok(MissEvent {
        id: row.get(0)?,
        url: row.get(1)?,
        referrer: row.get(2)?,
        user_agent: row.get(3)?,
        ip: row.get(4)?,
        created_at: DateTime::from_timestamp_millis(created_ms).unwrap_or_default(),
    })
}

/// Stored timestamps carry millisecond precision
fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
