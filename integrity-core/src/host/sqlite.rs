//! SQLite-backed host
//!
//! Stores state in one `state(key BLOB, value BLOB)` table. SQLite compares
//! BLOBs with memcmp, so `ORDER BY key` gives the same byte order the codec
//! relies on, and a prefix scan is the half-open range
//! `[prefix, prefix_successor(prefix))`.

use super::{
    prefix_successor, ChaincodeHost, HostError, HostResult, Invocation, StateEntry, StateScan,
};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Current schema version for the state database
pub const CURRENT_STATE_SCHEMA_VERSION: i32 = 1;

/// Migration descriptor
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up_sql: &'static str,
}

/// All available migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial key/value state schema",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS state (
                key BLOB PRIMARY KEY,       -- composite key bytes
                value BLOB NOT NULL
            ) WITHOUT ROWID;
        "#,
    }]
}

impl From<rusqlite::Error> for HostError {
    fn from(err: rusqlite::Error) -> Self {
        HostError::Storage(err.to_string())
    }
}

impl From<r2d2::Error> for HostError {
    fn from(err: r2d2::Error) -> Self {
        HostError::Storage(format!("Failed to get connection: {}", err))
    }
}

fn current_version(pool: &Pool<SqliteConnectionManager>) -> HostResult<i32> {
    let conn = pool.get()?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS state_schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let version: Result<i32, _> = conn.query_row(
        "SELECT version FROM state_schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get(0),
    );
    Ok(version.unwrap_or(0))
}

/// Run all pending migrations
pub fn migrate(pool: &Pool<SqliteConnectionManager>) -> HostResult<()> {
    let current = current_version(pool)?;
    let pending: Vec<_> = get_migrations()
        .into_iter()
        .filter(|m| m.version > current)
        .collect();

    if pending.is_empty() {
        return Ok(());
    }

    let conn = pool.get()?;
    for migration in pending {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.up_sql)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        tx.execute(
            "INSERT INTO state_schema_version (version, applied_at) VALUES (?, ?)",
            params![migration.version, now],
        )?;
        tx.commit()?;

        info!(
            version = migration.version,
            description = migration.description,
            "Applied state migration"
        );
    }

    Ok(())
}

/// Pooled SQLite key/value state
pub struct SqliteStateDb {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStateDb {
    /// Open (or create) the database file at `path`
    pub fn open(path: impl AsRef<Path>, pool_size: u32) -> HostResult<Self> {
        let manager = SqliteConnectionManager::file(path.as_ref());
        let pool = Pool::builder().max_size(pool_size.max(1)).build(manager)?;
        Self::new(pool)
    }

    /// Private in-memory database
    ///
    /// Every SQLite in-memory connection is its own database, so the pool
    /// is pinned to a single connection.
    pub fn memory() -> HostResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;
        Self::new(pool)
    }

    fn new(pool: Pool<SqliteConnectionManager>) -> HostResult<Self> {
        migrate(&pool)?;
        Ok(Self { pool })
    }

    /// Create or overwrite one entry
    pub fn put(&self, key: &[u8], value: &[u8]) -> HostResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Value stored at `key`
    pub fn get(&self, key: &[u8]) -> HostResult<Option<Vec<u8>>> {
        let conn = self.pool.get()?;
        let value = conn
            .query_row("SELECT value FROM state WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    /// Every entry whose key starts with `prefix`, in key order
    pub fn scan(&self, prefix: &[u8]) -> HostResult<Vec<StateEntry>> {
        let conn = self.pool.get()?;
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<StateEntry> {
            Ok(StateEntry {
                key: row.get(0)?,
                value: row.get(1)?,
            })
        };

        let entries = match prefix_successor(prefix) {
            Some(end) => {
                let mut stmt = conn.prepare(
                    "SELECT key, value FROM state WHERE key >= ?1 AND key < ?2 ORDER BY key",
                )?;
                let rows = stmt.query_map(params![prefix, end], map_row)?;
                let entries = rows.collect::<Result<Vec<_>, _>>()?;
                entries
            }
            None => {
                let mut stmt =
                    conn.prepare("SELECT key, value FROM state WHERE key >= ?1 ORDER BY key")?;
                let rows = stmt.query_map(params![prefix], map_row)?;
                let entries = rows.collect::<Result<Vec<_>, _>>()?;
                entries
            }
        };

        debug!(prefix_len = prefix.len(), entries = entries.len(), "State scan");
        Ok(entries)
    }

    /// Number of stored entries
    pub fn count(&self) -> HostResult<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM state", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Host context for one invocation against this database
    pub fn host(&self, identity: Option<Vec<u8>>, invocation: Invocation) -> SqliteHost<'_> {
        SqliteHost {
            db: self,
            identity,
            invocation,
        }
    }
}

/// One invocation's view of a `SqliteStateDb`
pub struct SqliteHost<'db> {
    db: &'db SqliteStateDb,
    identity: Option<Vec<u8>>,
    invocation: Invocation,
}

impl ChaincodeHost for SqliteHost<'_> {
    fn caller_identity(&self) -> HostResult<Vec<u8>> {
        self.identity
            .clone()
            .ok_or_else(|| HostError::IdentityUnavailable("no caller identity configured".to_string()))
    }

    fn put_state(&self, key: &[u8], value: &[u8]) -> HostResult<()> {
        self.db.put(key, value)
    }

    fn scan_prefix<'a>(&'a self, prefix: &[u8]) -> HostResult<Box<dyn StateScan + 'a>> {
        let entries = self.db.scan(prefix)?;
        Ok(Box::new(SqliteScan {
            entries: Some(entries.into_iter()),
        }))
    }

    fn invocation(&self) -> HostResult<Invocation> {
        Ok(self.invocation.clone())
    }
}

/// Scan over rows read in one statement
struct SqliteScan {
    entries: Option<std::vec::IntoIter<StateEntry>>,
}

impl StateScan for SqliteScan {
    fn next_entry(&mut self) -> HostResult<Option<StateEntry>> {
        match self.entries.as_mut() {
            Some(entries) => Ok(entries.next()),
            None => Err(HostError::ScanClosed),
        }
    }

    fn close(&mut self) -> HostResult<()> {
        self.entries = None;
        Ok(())
    }
}
