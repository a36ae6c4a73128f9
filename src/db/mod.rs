pub mod models;

use models::{ChatMessage, Role};
use rusqlite::{params, types::Type, Connection, Result};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(app_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(app_dir).ok();
        let db_path = app_dir.join("doc-chat.db");
        tracing::debug!(path = %db_path.display(), "opening history store");
        Self::from_connection(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves the connection itself usable.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS history (
                slot TEXT NOT NULL,
                position INTEGER NOT NULL,
                role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
                content TEXT NOT NULL,
                PRIMARY KEY (slot, position)
            );

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    // ── History ──

    /// Transcript stored under `slot`, or an empty one if the slot was never saved.
    pub fn load_history(&self, slot: &str) -> Result<Vec<ChatMessage>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT role, content FROM history WHERE slot = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![slot], |row| {
            let role: String = row.get(0)?;
            let role = role.parse::<Role>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, Type::Text, e.into())
            })?;
            Ok(ChatMessage {
                role,
                content: row.get(1)?,
            })
        })?;
        rows.collect()
    }

    /// Replace the whole transcript under `slot`.
    pub fn save_history(&self, slot: &str, messages: &[ChatMessage]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM history WHERE slot = ?1", params![slot])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO history (slot, position, role, content) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, message) in messages.iter().enumerate() {
                insert.execute(params![
                    slot,
                    position as i64,
                    message.role.as_str(),
                    message.content
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(slot, messages = messages.len(), "history saved");
        Ok(())
    }

    // ── Settings ──

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn();
        let result = conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );
        match result {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn delete_setting(&self, key: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(())
    }
}
