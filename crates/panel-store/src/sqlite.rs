//! SQLite-based store implementation.

use async_trait::async_trait;
use chrono::Utc;
use panel_core::{EntityObservation, EntityProfile, PanelError, Result, TableStore};
use polars::prelude::*;
use rusqlite::{Connection, OptionalExtension, params};
use std::io::Cursor;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, instrument};

/// SQLite-based store for the pipeline's intermediate tables.
///
/// Observations and profiles are kept as JSON rows; frames are kept as
/// parquet blobs keyed by sheet name. The database survives between CLI runs,
/// so each stage can start from the previous stage's output.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new SQLite store at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| PanelError::Store(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| PanelError::Store(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PanelError::Store(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS observations (
                source TEXT NOT NULL,
                seq INTEGER NOT NULL,
                entity TEXT NOT NULL,
                date TEXT NOT NULL,
                data_json TEXT NOT NULL,
                stored_at TEXT NOT NULL,
                PRIMARY KEY (source, seq)
            )",
            [],
        )
        .map_err(|e| PanelError::Store(e.to_string()))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_observations_source_entity
             ON observations(source, entity, date)",
            [],
        )
        .map_err(|e| PanelError::Store(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS profiles (
                entity TEXT PRIMARY KEY,
                data_json TEXT NOT NULL,
                stored_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| PanelError::Store(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS frames (
                sheet TEXT PRIMARY KEY,
                row_count INTEGER NOT NULL,
                parquet BLOB NOT NULL,
                stored_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| PanelError::Store(e.to_string()))?;

        debug!("SQLite store schema initialized");
        Ok(())
    }
}

fn encode_frame(frame: &DataFrame) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut frame = frame.clone();
    ParquetWriter::new(&mut buffer).finish(&mut frame)?;
    Ok(buffer)
}

fn decode_frame(bytes: Vec<u8>) -> Result<DataFrame> {
    Ok(ParquetReader::new(Cursor::new(bytes)).finish()?)
}

#[async_trait]
impl TableStore for SqliteStore {
    #[instrument(skip(self))]
    async fn get_observations(&self, source: &str) -> Result<Option<Vec<EntityObservation>>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PanelError::Store(e.to_string()))?;

        let mut stmt = conn
            .prepare("SELECT data_json FROM observations WHERE source = ?1 ORDER BY seq ASC")
            .map_err(|e| PanelError::Store(e.to_string()))?;
        let rows = stmt
            .query_map(params![source], |row| row.get::<_, String>(0))
            .map_err(|e| PanelError::Store(e.to_string()))?;

        let mut observations = Vec::new();
        for row in rows {
            let json = row.map_err(|e| PanelError::Store(e.to_string()))?;
            let observation: EntityObservation =
                serde_json::from_str(&json).map_err(|e| PanelError::Parse(e.to_string()))?;
            observations.push(observation);
        }

        if observations.is_empty() {
            debug!("No stored observations found");
            return Ok(None);
        }
        debug!("Found {} stored observations", observations.len());
        Ok(Some(observations))
    }

    #[instrument(skip(self, observations), fields(count = observations.len()))]
    async fn put_observations(
        &self,
        source: &str,
        observations: &[EntityObservation],
    ) -> Result<()> {
        let stored_at = Utc::now().to_rfc3339();
        let conn = self
            .conn
            .lock()
            .map_err(|e| PanelError::Store(e.to_string()))?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| PanelError::Store(e.to_string()))?;

        tx.execute("DELETE FROM observations WHERE source = ?1", params![source])
            .map_err(|e| PanelError::Store(e.to_string()))?;
        for (seq, observation) in observations.iter().enumerate() {
            let data_json = serde_json::to_string(observation)
                .map_err(|e| PanelError::Parse(e.to_string()))?;
            tx.execute(
                "INSERT INTO observations (source, seq, entity, date, data_json, stored_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    source,
                    seq as i64,
                    observation.entity.as_str(),
                    observation.date.to_string(),
                    data_json,
                    stored_at
                ],
            )
            .map_err(|e| PanelError::Store(e.to_string()))?;
        }

        tx.commit().map_err(|e| PanelError::Store(e.to_string()))?;
        debug!("Stored {} observations", observations.len());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_profiles(&self) -> Result<Option<Vec<EntityProfile>>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PanelError::Store(e.to_string()))?;

        let mut stmt = conn
            .prepare("SELECT data_json FROM profiles ORDER BY entity ASC")
            .map_err(|e| PanelError::Store(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| PanelError::Store(e.to_string()))?;

        let mut profiles = Vec::new();
        for row in rows {
            let json = row.map_err(|e| PanelError::Store(e.to_string()))?;
            let profile: EntityProfile =
                serde_json::from_str(&json).map_err(|e| PanelError::Parse(e.to_string()))?;
            profiles.push(profile);
        }

        if profiles.is_empty() {
            return Ok(None);
        }
        debug!("Found {} stored profiles", profiles.len());
        Ok(Some(profiles))
    }

    #[instrument(skip(self, profiles), fields(count = profiles.len()))]
    async fn put_profiles(&self, profiles: &[EntityProfile]) -> Result<()> {
        let stored_at = Utc::now().to_rfc3339();
        let conn = self
            .conn
            .lock()
            .map_err(|e| PanelError::Store(e.to_string()))?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| PanelError::Store(e.to_string()))?;

        tx.execute("DELETE FROM profiles", [])
            .map_err(|e| PanelError::Store(e.to_string()))?;
        for profile in profiles {
            let data_json =
                serde_json::to_string(profile).map_err(|e| PanelError::Parse(e.to_string()))?;
            tx.execute(
                "INSERT OR REPLACE INTO profiles (entity, data_json, stored_at)
                 VALUES (?1, ?2, ?3)",
                params![profile.entity.as_str(), data_json, stored_at],
            )
            .map_err(|e| PanelError::Store(e.to_string()))?;
        }

        tx.commit().map_err(|e| PanelError::Store(e.to_string()))?;
        debug!("Stored {} profiles", profiles.len());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_frame(&self, sheet: &str) -> Result<Option<DataFrame>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PanelError::Store(e.to_string()))?;

        let blob = conn
            .query_row(
                "SELECT parquet FROM frames WHERE sheet = ?1",
                params![sheet],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()
            .map_err(|e| PanelError::Store(e.to_string()))?;

        match blob {
            Some(bytes) => {
                let frame = decode_frame(bytes)?;
                debug!(rows = frame.height(), "Found stored frame");
                Ok(Some(frame))
            }
            None => {
                debug!("No stored frame found");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, frame), fields(rows = frame.height()))]
    async fn put_frame(&self, sheet: &str, frame: &DataFrame) -> Result<()> {
        let stored_at = Utc::now().to_rfc3339();
        let bytes = encode_frame(frame)?;
        let conn = self
            .conn
            .lock()
            .map_err(|e| PanelError::Store(e.to_string()))?;

        conn.execute(
            "INSERT OR REPLACE INTO frames (sheet, row_count, parquet, stored_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![sheet, frame.height() as i64, bytes, stored_at],
        )
        .map_err(|e| PanelError::Store(e.to_string()))?;

        debug!("Stored frame");
        Ok(())
    }

    async fn sheets(&self) -> Result<Vec<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PanelError::Store(e.to_string()))?;
        let mut stmt = conn
            .prepare("SELECT sheet FROM frames ORDER BY sheet ASC")
            .map_err(|e| PanelError::Store(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| PanelError::Store(e.to_string()))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PanelError::Store(e.to_string()))
    }

    #[instrument(skip(self))]
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(ttl)
                .map_err(|e| PanelError::InvalidParameter(format!("Invalid TTL duration: {e}")))?;
        let cutoff_str = cutoff.to_rfc3339();

        let conn = self
            .conn
            .lock()
            .map_err(|e| PanelError::Store(e.to_string()))?;

        let mut total_deleted = 0usize;
        for table in ["observations", "profiles", "frames"] {
            let deleted = conn
                .execute(
                    &format!("DELETE FROM {table} WHERE stored_at < ?1"),
                    params![cutoff_str],
                )
                .map_err(|e| PanelError::Store(e.to_string()))?;
            total_deleted += deleted;
        }

        if total_deleted > 0 {
            debug!("Invalidated {} stale store rows", total_deleted);
        }
        Ok(total_deleted)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PanelError::Store(e.to_string()))?;

        conn.execute("DELETE FROM observations", [])
            .map_err(|e| PanelError::Store(e.to_string()))?;
        conn.execute("DELETE FROM profiles", [])
            .map_err(|e| PanelError::Store(e.to_string()))?;
        conn.execute("DELETE FROM frames", [])
            .map_err(|e| PanelError::Store(e.to_string()))?;

        debug!("Cleared all store entries");
        Ok(())
    }
}
