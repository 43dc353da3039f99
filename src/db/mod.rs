use std::sync::Arc;
use std::time::Duration;

use crate::error::{TaggerError, TaggerResult};

pub mod backend;
pub mod mysql;
pub mod postgres;
pub mod sqlite;
pub mod store;

pub use backend::{StorageBackend, StorageEngine};
pub use store::TagStore;

/// Longest image path, in characters, any engine accepts. MySQL's unique
/// index on a utf8mb4 `VARCHAR` caps out here, so every engine uses it.
pub const MAX_IMAGE_PATH_CHARS: usize = 768;

/// Longest single tag, in characters. Bounded by MySQL's multi-valued index.
pub const MAX_TAG_CHARS: usize = 255;

/// Bounded pool shape shared by all engines.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

/// Table names are spliced into SQL, so only plain identifiers are accepted.
pub fn validate_table_name(table: &str) -> TaggerResult<()> {
    let mut chars = table.chars();
    let valid_head = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_head && valid_tail && table.len() <= 48 {
        Ok(())
    } else {
        Err(TaggerError::Configuration(format!(
            "invalid tag table name: {table:?}"
        )))
    }
}

/// Connect to the chosen engine with a bounded pool.
pub async fn connect(
    engine: StorageEngine,
    database_url: &str,
    table: &str,
    settings: &PoolSettings,
) -> TaggerResult<Arc<dyn StorageBackend>> {
    validate_table_name(table)?;

    let backend: Arc<dyn StorageBackend> = match engine {
        StorageEngine::Postgres => {
            Arc::new(postgres::PostgresBackend::connect(database_url, table, settings).await?)
        }
        StorageEngine::MySql => {
            Arc::new(mysql::MySqlBackend::connect(database_url, table, settings).await?)
        }
        StorageEngine::Sqlite => {
            Arc::new(sqlite::SqliteBackend::connect(database_url, table, settings).await?)
        }
    };

    tracing::info!(engine = %engine, table = %table, "Connected to tag database");
    Ok(backend)
}

/// Connect and initialize the schema in one step.
pub async fn open_store(
    engine: StorageEngine,
    database_url: &str,
    table: &str,
    settings: &PoolSettings,
) -> TaggerResult<TagStore> {
    let backend = connect(engine, database_url, table, settings).await?;
    TagStore::open(backend).await
}
