//! SQLite-backed [`RecordStore`].

use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, TransactionBehavior, params, params_from_iter};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::core::{FieldPatch, RecordFilter, RecordStore};
use crate::error::{StoreError, StoreResult};
use crate::record::{Record, RecordKey};

use super::schema;

/// Configuration for the SQLite record store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Maximum number of connections in the pool. In-memory databases always
    /// use a single connection.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,

    /// Enable WAL mode for better concurrency.
    #[serde(default = "default_true")]
    pub enable_wal: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_busy_timeout_ms() -> u32 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            enable_wal: true,
        }
    }
}

/// Record store keeping one collection in a SQLite database.
pub struct SqliteRecordStore {
    pool: Pool<SqliteConnectionManager>,
    config: SqliteStoreConfig,
    collection: String,
    is_memory: bool,
}

impl Debug for SqliteRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRecordStore")
            .field("collection", &self.collection)
            .field("config", &self.config)
            .field("is_memory", &self.is_memory)
            .finish_non_exhaustive()
    }
}

impl SqliteRecordStore {
    /// Creates a store on a fresh in-memory database.
    pub fn in_memory(collection: impl Into<String>) -> StoreResult<Self> {
        Self::with_config(":memory:", collection, SqliteStoreConfig::default())
    }

    /// Opens or creates a file-based database.
    pub fn open<P: AsRef<Path>>(path: P, collection: impl Into<String>) -> StoreResult<Self> {
        Self::with_config(path, collection, SqliteStoreConfig::default())
    }

    /// Creates a store with custom configuration. The schema is created if
    /// missing.
    pub fn with_config<P: AsRef<Path>>(
        path: P,
        collection: impl Into<String>,
        config: SqliteStoreConfig,
    ) -> StoreResult<Self> {
        let is_memory = path.as_ref().to_string_lossy() == ":memory:";

        // Every connection to ":memory:" opens its own database.
        let (manager, max_size) = if is_memory {
            (SqliteConnectionManager::memory(), 1)
        } else {
            (
                SqliteConnectionManager::file(path.as_ref()),
                config.max_connections.max(1),
            )
        };

        // Concurrent writers wait on each other instead of failing with SQLITE_BUSY.
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms as u64);
        let manager = manager.with_init(move |conn| conn.busy_timeout(busy_timeout));

        let mut builder = Pool::builder()
            .max_size(max_size)
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms));
        if is_memory {
            // Recycling the only connection would drop the database with it.
            builder = builder.max_lifetime(None).idle_timeout(None);
        }

        let pool = builder
            .build(manager)
            .map_err(|e| StoreError::ConnectionFailed {
                backend_name: "sqlite".to_string(),
                message: e.to_string(),
            })?;

        let store = Self {
            pool,
            config,
            collection: collection.into(),
            is_memory,
        };

        store.configure_connection()?;
        store.init_schema()?;

        Ok(store)
    }

    /// Initialize the database schema.
    pub fn init_schema(&self) -> StoreResult<()> {
        let conn = self.get_connection()?;
        schema::initialize_schema(&conn)
    }

    /// Returns the collection this store reads and writes.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns whether this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.is_memory
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    fn get_connection(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| StoreError::ConnectionFailed {
            backend_name: "sqlite".to_string(),
            message: e.to_string(),
        })
    }

    fn configure_connection(&self) -> StoreResult<()> {
        let conn = self.get_connection()?;

        conn.busy_timeout(Duration::from_millis(self.config.busy_timeout_ms as u64))
            .map_err(|e| StoreError::Internal {
                backend_name: "sqlite".to_string(),
                message: format!("Failed to set busy timeout: {}", e),
                source: None,
            })?;

        if self.config.enable_wal && !self.is_memory {
            // journal_mode returns the resulting mode as a row.
            conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
                .map_err(|e| StoreError::Internal {
                    backend_name: "sqlite".to_string(),
                    message: format!("Failed to enable WAL mode: {}", e),
                    source: None,
                })?;
        }

        Ok(())
    }

    fn select(
        &self,
        conn: &rusqlite::Connection,
        filter: &RecordFilter,
    ) -> StoreResult<Vec<Record>> {
        let (predicate, mut args) = filter_sql(filter);
        args.insert(0, self.collection.clone());

        let sql = format!(
            "SELECT id, data FROM records WHERE collection = ? AND ({}) ORDER BY id",
            predicate
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, data) = row?;
            records.push(decode(id, &data)?);
        }
        Ok(records)
    }

    fn write(&self, conn: &rusqlite::Connection, record: &Record) -> StoreResult<()> {
        let data = serde_json::to_string(record.fields())?;
        conn.execute(
            "INSERT INTO records (collection, id, data) VALUES (?1, ?2, ?3)
             ON CONFLICT (collection, id) DO UPDATE SET data = excluded.data",
            params![self.collection, record.key().as_str(), data],
        )?;
        Ok(())
    }
}

fn decode(id: String, data: &str) -> StoreResult<Record> {
    let value: Value = serde_json::from_str(data)?;
    Record::from_value(id, value).ok_or_else(|| StoreError::Serialization {
        message: "stored record is not a JSON object".to_string(),
    })
}

/// Builds a JSON path addressing a top-level field.
fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', "\\\""))
}

/// Translates a filter into a SQL predicate over the `data` column and its
/// positional arguments.
fn filter_sql(filter: &RecordFilter) -> (String, Vec<String>) {
    // A field is set when it holds a non-empty string.
    const IS_SET: &str =
        "COALESCE(json_type(data, ?) = 'text' AND json_extract(data, ?) <> '', 0)";

    match filter {
        RecordFilter::All => ("1 = 1".to_string(), Vec::new()),
        RecordFilter::Set(field) => {
            let path = json_path(field);
            (format!("{} = 1", IS_SET), vec![path.clone(), path])
        }
        RecordFilter::Unset(field) => {
            let path = json_path(field);
            (format!("{} = 0", IS_SET), vec![path.clone(), path])
        }
        RecordFilter::In { field, values } => {
            if values.is_empty() {
                return ("0 = 1".to_string(), Vec::new());
            }
            let path = json_path(field);
            let placeholders = vec!["?"; values.len()].join(", ");
            let mut args = vec![path.clone(), path];
            args.extend(values.iter().cloned());
            (
                format!(
                    "json_type(data, ?) = 'text' AND json_extract(data, ?) IN ({})",
                    placeholders
                ),
                args,
            )
        }
    }
}

fn project(record: Record, fields: Option<&[String]>) -> Record {
    let Some(fields) = fields else {
        return record;
    };
    let key = record.key().clone();
    let projected = record
        .into_fields()
        .into_iter()
        .filter(|(name, _)| fields.iter().any(|f| f == name))
        .collect();
    Record::new(key, projected)
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn find(
        &self,
        filter: &RecordFilter,
        projection: Option<&[String]>,
    ) -> StoreResult<Vec<Record>> {
        let conn = self.get_connection()?;
        let records = self.select(&conn, filter)?;
        debug!(collection = %self.collection, matched = records.len(), "Found records");
        Ok(records
            .into_iter()
            .map(|record| project(record, projection))
            .collect())
    }

    async fn save(&self, record: &Record) -> StoreResult<()> {
        let conn = self.get_connection()?;
        self.write(&conn, record)
    }

    async fn update_one(&self, key: &RecordKey, patch: &FieldPatch) -> StoreResult<()> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let data: Option<String> = tx
            .query_row(
                "SELECT data FROM records WHERE collection = ?1 AND id = ?2",
                params![self.collection, key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let data = data.ok_or_else(|| StoreError::NotFound { key: key.clone() })?;

        let mut record = decode(key.as_str().to_string(), &data)?;
        patch.apply(&mut record);
        self.write(&tx, &record)?;
        tx.commit()?;
        Ok(())
    }

    async fn update_many(&self, filter: &RecordFilter, patch: &FieldPatch) -> StoreResult<u64> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let records = self.select(&tx, filter)?;
        for mut record in records.iter().cloned() {
            patch.apply(&mut record);
            self.write(&tx, &record)?;
        }
        tx.commit()?;

        debug!(collection = %self.collection, updated = records.len(), "Patched records");
        Ok(records.len() as u64)
    }
}
