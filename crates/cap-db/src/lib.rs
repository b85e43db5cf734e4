//! Storage layer for capacity planning.
//!
//! Keeps estimate configurations and the FTE results computed for them using
//! `rusqlite`. This is the local side of estimate fetch and persist; the
//! remote side lives in `cap-api`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Wrap it in a `Mutex` or open one `Database` per thread for shared access.
//!
//! # Schema
//!
//! Configurations and results are stored as JSON TEXT in the same shape the
//! remote backend uses, so a pulled estimate can be stored verbatim.
//! Timestamps are ISO 8601 TEXT in UTC.

use std::path::Path;

use cap_core::{EstimateConfig, FteResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored JSON payload could not be read back or written.
    #[error("invalid stored data for estimate {id}: {source}")]
    InvalidData {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    /// The referenced estimate does not exist.
    #[error("unknown estimate: {0}")]
    UnknownEstimate(String),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// One row of [`Database::list_estimates`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimateSummary {
    pub id: String,
    pub updated_at: String,
    pub has_fte_result: bool,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            -- config: JSON estimate configuration (phases, elapsed_days, common)
            CREATE TABLE IF NOT EXISTS estimates (
                id TEXT PRIMARY KEY,
                config TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_estimates_updated ON estimates(updated_at);

            -- result: JSON FTE result as returned by the effort model
            CREATE TABLE IF NOT EXISTS fte_results (
                estimate_id TEXT PRIMARY KEY,
                result TEXT NOT NULL,
                computed_at TEXT NOT NULL,
                FOREIGN KEY (estimate_id) REFERENCES estimates(id) ON DELETE CASCADE
            );
            ",
        )?;
        Ok(())
    }

    /// Loads an estimate configuration, or `None` if it was never stored.
    pub fn fetch_estimate(&self, id: &str) -> Result<Option<EstimateConfig>, DbError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT config FROM estimates WHERE id = ?",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        tracing::debug!(id, found = raw.is_some(), "fetched estimate");
        raw.map(|raw| decode(id, &raw)).transpose()
    }

    /// Inserts or replaces an estimate configuration.
    pub fn persist_estimate_config(
        &mut self,
        id: &str,
        config: &EstimateConfig,
    ) -> Result<(), DbError> {
        self.persist_estimate_config_at(id, config, Utc::now())
    }

    fn persist_estimate_config_at(
        &mut self,
        id: &str,
        config: &EstimateConfig,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let json = encode(id, config)?;
        let now = format_timestamp(now);
        self.conn.execute(
            "
            INSERT INTO estimates (id, config, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT(id) DO UPDATE SET config = excluded.config, updated_at = excluded.updated_at
            ",
            params![id, json, now],
        )?;
        tracing::debug!(id, "persisted estimate config");
        Ok(())
    }

    /// Lists stored estimates ordered by ID.
    pub fn list_estimates(&self) -> Result<Vec<EstimateSummary>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT e.id, e.updated_at, f.estimate_id IS NOT NULL
            FROM estimates e
            LEFT JOIN fte_results f ON f.estimate_id = e.id
            ORDER BY e.id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(EstimateSummary {
                id: row.get(0)?,
                updated_at: row.get(1)?,
                has_fte_result: row.get(2)?,
            })
        })?;
        let mut estimates = Vec::new();
        for row in rows {
            estimates.push(row?);
        }
        Ok(estimates)
    }

    /// Stores the FTE result for an existing estimate, replacing any previous one.
    pub fn store_fte_result(&mut self, id: &str, result: &FteResult) -> Result<(), DbError> {
        if !self.estimate_exists(id)? {
            return Err(DbError::UnknownEstimate(id.to_string()));
        }
        let json = encode(id, result)?;
        self.conn.execute(
            "
            INSERT INTO fte_results (estimate_id, result, computed_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(estimate_id) DO UPDATE SET result = excluded.result, computed_at = excluded.computed_at
            ",
            params![id, json, format_timestamp(Utc::now())],
        )?;
        tracing::debug!(id, "stored FTE result");
        Ok(())
    }

    /// Loads the FTE result of an estimate, or `None` if none was stored.
    pub fn fetch_fte_result(&self, id: &str) -> Result<Option<FteResult>, DbError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT result FROM fte_results WHERE estimate_id = ?",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|raw| decode(id, &raw)).transpose()
    }

    /// Deletes an estimate and its FTE result. Returns whether it existed.
    pub fn delete_estimate(&mut self, id: &str) -> Result<bool, DbError> {
        let deleted = self
            .conn
            .execute("DELETE FROM estimates WHERE id = ?", [id])?;
        Ok(deleted > 0)
    }

    fn estimate_exists(&self, id: &str) -> Result<bool, DbError> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM estimates WHERE id = ?)",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

fn encode<T: serde::Serialize>(id: &str, value: &T) -> Result<String, DbError> {
    serde_json::to_string(value).map_err(|source| DbError::InvalidData {
        id: id.to_string(),
        source,
    })
}

fn decode<T: serde::de::DeserializeOwned>(id: &str, raw: &str) -> Result<T, DbError> {
    serde_json::from_str(raw).map_err(|source| DbError::InvalidData {
        id: id.to_string(),
        source,
    })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
