//! Durable "last known good" snapshot storage.

use std::error::Error;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use crate::error::AppError;

pub mod memory;
pub mod migrations;
pub mod models;
pub mod repository;
pub mod stale;

pub use memory::MemoryStore;
pub use repository::SqliteStore;
pub use stale::StaleCache;

pub type StoreError = Box<dyn Error + Send + Sync>;

/// Key-value seam over the storage medium. Values are opaque JSON strings.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Open the SQLite database behind `database_url`, creating it if needed, and migrate it.
pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    // `:memory:` databases are per connection.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    migrations::run_migrations(&pool).await?;
    info!(url = database_url, "🗄️ Snapshot store ready");

    Ok(pool)
}
