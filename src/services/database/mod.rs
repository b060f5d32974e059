// Database service module
// SQLite connection and schema management for the meeting store

use anyhow::{Context, Result};
use rusqlite::Connection;

mod migrations;

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new database connection
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file (or ":memory:" for in-memory)
    ///
    /// # Examples
    /// ```
    /// use meeting_grid::services::database::Database;
    /// let db = Database::new(":memory:").unwrap();
    /// ```
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .context(format!("Failed to open database at {}", path))?;

        conn.execute("PRAGMA foreign_keys = ON", [])
            .context("Failed to enable foreign keys")?;

        Ok(Self { conn })
    }

    /// Initialize the database schema
    /// Creates all required tables if they don't exist
    pub fn initialize_schema(&self) -> Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS meetings (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    start_datetime TEXT NOT NULL,
                    end_datetime TEXT NOT NULL,
                    recurrence_rule TEXT,
                    recurrence_exceptions TEXT,
                    last_occurrence TEXT,
                    subjects TEXT NOT NULL DEFAULT '[]',
                    notes TEXT NOT NULL DEFAULT '',
                    participants TEXT NOT NULL DEFAULT '[]',
                    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                )",
                [],
            )
            .context("Failed to create meetings table")?;

        migrations::ensure_column(
            &self.conn,
            "meetings",
            "match_ref",
            "ALTER TABLE meetings ADD COLUMN match_ref TEXT",
        )?;

        self.conn
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_meetings_range
                 ON meetings (start_datetime, end_datetime)",
                [],
            )
            .context("Failed to create meetings index")?;

        Ok(())
    }

    /// Get a reference to the database connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
