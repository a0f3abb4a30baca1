use std::path::Path;
use std::sync::Mutex;

use beacon_core::error::{BeaconError, BeaconResult};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::TimestampStore;

/// SQLite-backed timestamp store.
///
/// Timestamps are stored as RFC 3339 text in a single `pixel_timestamps`
/// table. Opening is fallible; once open, operations log and degrade per the
/// [`TimestampStore`] contract.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the store at `path`.
    pub fn open(path: &Path) -> BeaconResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| BeaconError::store(format!("Failed to open timestamp store: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS pixel_timestamps (
                key TEXT PRIMARY KEY,
                fired_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| BeaconError::store(format!("Failed to create schema: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl TimestampStore for SqliteStore {
    fn last_fire(&self, key: &str) -> Option<DateTime<Utc>> {
        let conn = self.conn.lock().unwrap();
        let text: Option<String> = match conn
            .query_row(
                "SELECT fired_at FROM pixel_timestamps WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()
        {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Failed to read timestamp for {}: {}", key, e);
                None
            }
        };

        text.and_then(|t| match DateTime::parse_from_rfc3339(&t) {
            Ok(dt) => Some(dt.with_timezone(&Utc)),
            Err(e) => {
                log::warn!("Discarding malformed timestamp for {}: {}", key, e);
                None
            }
        })
    }

    fn set_last_fire(&self, key: &str, when: DateTime<Utc>) {
        let conn = self.conn.lock().unwrap();
        if let Err(e) = conn.execute(
            "INSERT INTO pixel_timestamps (key, fired_at) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET fired_at = excluded.fired_at",
            rusqlite::params![key, when.to_rfc3339()],
        ) {
            log::warn!("Failed to record timestamp for {}: {}", key, e);
        }
    }

    fn remove(&self, key: &str) {
        let conn = self.conn.lock().unwrap();
        if let Err(e) = conn.execute("DELETE FROM pixel_timestamps WHERE key = ?", [key]) {
            log::warn!("Failed to remove timestamp for {}: {}", key, e);
        }
    }

    fn keys(&self) -> Vec<String> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn.prepare("SELECT key FROM pixel_timestamps") {
            Ok(stmt) => stmt,
            Err(e) => {
                log::warn!("Failed to list timestamp keys: {}", e);
                return Vec::new();
            }
        };

        match stmt
            .query_map([], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        {
            Ok(keys) => keys,
            Err(e) => {
                log::warn!("Failed to list timestamp keys: {}", e);
                Vec::new()
            }
        }
    }
}
