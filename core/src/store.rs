use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::identity::Identity;

/// String-keyed storage of JSON text.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Returns whether a value was removed.
    fn remove(&self, key: &str) -> Result<bool>;
}

/// Storage keys. Everything but the current user is partitioned by identity.
pub mod keys {
    use super::Identity;

    pub const CURRENT_USER: &str = "userEmail";

    #[must_use]
    pub fn history(identity: &Identity) -> String {
        format!("nutritionAnalysisHistory_{identity}")
    }

    #[must_use]
    pub fn settings(identity: &Identity) -> String {
        format!("nutritionAppSettings_{identity}")
    }

    #[must_use]
    pub fn daily_intake(identity: &Identity) -> String {
        format!("dailyIntake_{identity}")
    }

    #[must_use]
    pub fn achievements(identity: &Identity) -> String {
        format!("achievementHistory_{identity}")
    }

    #[must_use]
    pub fn pending_meal(identity: &Identity) -> String {
        format!("pendingMeal_{identity}")
    }
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    /// All keys, sorted. Used by diagnostics and tests.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}

impl KvStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }
}

/// Read and decode a JSON value.
///
/// A value that no longer parses is logged, removed, and reported as absent so
/// the caller falls back to its default.
pub fn load_json<T: DeserializeOwned>(store: &(impl KvStore + ?Sized), key: &str) -> Result<Option<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key, error = %e, "discarding unreadable stored value");
            store.remove(key)?;
            Ok(None)
        }
    }
}

pub fn save_json<T: Serialize + ?Sized>(store: &(impl KvStore + ?Sized), key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value).with_context(|| format!("Failed to encode {key}"))?;
    store.set(key, &json)
}
