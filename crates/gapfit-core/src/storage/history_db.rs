//! SQLite-backed notification history store.
//!
//! Persists the send log and the notification policy. Writes are serialized
//! through a store-level lock so a send and an open/ignore feedback racing
//! on the same profile cannot lose updates.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::data_dir;
use crate::error::StoreError;
use crate::notify::{
    NotificationHistoryStore, NotificationKind, NotificationPolicy, NotificationRecord,
    RecordMutation, MAX_HISTORY_RECORDS,
};

const POLICY_KEY: &str = "notification_policy";

/// SQLite store for notification history and policy.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Open the store at `~/.config/gapfit/history.db`, creating the schema
    /// if needed.
    pub fn open() -> Result<Self, StoreError> {
        let path = data_dir()
            .map_err(|e| StoreError::OpenFailed {
                path: "~/.config/gapfit".into(),
                message: e.to_string(),
            })?
            .join("history.db");
        Self::open_at(&path)
    }

    /// Open at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::OpenFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// In-memory store, for tests.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::OpenFailed {
            path: ":memory:".into(),
            message: e.to_string(),
        })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS notifications (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                kind        TEXT NOT NULL,
                sent_at     TEXT NOT NULL,
                was_opened  INTEGER NOT NULL DEFAULT 0,
                was_ignored INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_notifications_sent_at
                ON notifications(sent_at);
            CREATE TABLE IF NOT EXISTS settings (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::WriteFailed(e.to_string()))
    }
}

impl NotificationHistoryStore for SqliteHistoryStore {
    fn append(&self, record: NotificationRecord) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO notifications (kind, sent_at, was_opened, was_ignored)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.kind.as_str(),
                record.sent_at.to_rfc3339(),
                record.was_opened as i64,
                record.was_ignored as i64,
            ],
        )
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        // Enforce the cap, oldest first.
        conn.execute(
            "DELETE FROM notifications WHERE id NOT IN (
                SELECT id FROM notifications ORDER BY id DESC LIMIT ?1
            )",
            params![MAX_HISTORY_RECORDS as i64],
        )
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    fn recent_records(&self, since: DateTime<Utc>) -> Result<Vec<NotificationRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT kind, sent_at, was_opened, was_ignored
                 FROM notifications WHERE sent_at >= ?1 ORDER BY id ASC",
            )
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params![since.to_rfc3339()], |row| {
                let kind: String = row.get(0)?;
                let sent_at: String = row.get(1)?;
                let was_opened: i64 = row.get(2)?;
                let was_ignored: i64 = row.get(3)?;
                Ok((kind, sent_at, was_opened, was_ignored))
            })
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            let (kind, sent_at, was_opened, was_ignored) =
                row.map_err(|e| StoreError::ReadFailed(e.to_string()))?;
            let kind = NotificationKind::parse(&kind)
                .ok_or_else(|| StoreError::ReadFailed(format!("unknown kind '{kind}'")))?;
            let sent_at = DateTime::parse_from_rfc3339(&sent_at)
                .map_err(|e| StoreError::ReadFailed(e.to_string()))?
                .with_timezone(&Utc);
            records.push(NotificationRecord {
                kind,
                sent_at,
                was_opened: was_opened != 0,
                was_ignored: was_ignored != 0,
            });
        }
        Ok(records)
    }

    fn update_latest(
        &self,
        kind: NotificationKind,
        mutation: RecordMutation,
    ) -> Result<(), StoreError> {
        let column = match mutation {
            RecordMutation::Opened => "was_opened",
            RecordMutation::Ignored => "was_ignored",
        };
        let conn = self.lock()?;
        let updated = conn
            .execute(
                &format!(
                    "UPDATE notifications SET {column} = 1 WHERE id = (
                        SELECT id FROM notifications WHERE kind = ?1
                        ORDER BY id DESC LIMIT 1
                    )"
                ),
                params![kind.as_str()],
            )
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        if updated == 0 {
            return Err(StoreError::NoSuchRecord {
                kind: kind.as_str().to_string(),
            });
        }
        Ok(())
    }

    fn load_policy(&self) -> Result<NotificationPolicy, StoreError> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![POLICY_KEY],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(StoreError::ReadFailed(other.to_string())),
            })?;

        match raw {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| StoreError::ReadFailed(e.to_string())),
            None => Ok(NotificationPolicy::default()),
        }
    }

    fn save_policy(&self, policy: &NotificationPolicy) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(policy).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![POLICY_KEY, json],
        )
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        Ok(())
    }
}
