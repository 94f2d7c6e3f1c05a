//! Subscriber store backed by SQLite through SQLx.

use std::str::FromStr;

use log::debug;
use log::info;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;

use crate::repository::error::DatabaseError;
use crate::repository::table::BroadcastTable;
use crate::repository::table::ServiceStateTable;
use crate::repository::table::SubscriberTable;
use crate::repository::table::TableBase;

pub mod error;
pub mod table;

/// Main database struct containing all table handlers.
///
/// Constructed once at startup and shared as `Arc<Repository>` with every component that needs
/// the store.
pub struct Repository {
    pool: SqlitePool,
    pub subscriber: SubscriberTable,
    pub broadcast: BroadcastTable,
    pub service_state: ServiceStateTable,
}

impl Repository {
    /// Creates a new database connection and initializes table handlers.
    pub async fn new(db_url: &str, db_path: &str) -> Result<Self, DatabaseError> {
        let path = std::path::Path::new(db_path);
        if !path.exists() {
            debug!("Database path {db_path} does not exist. Creating...");
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, "")?;
            info!("Created {db_path}");
        }

        debug!("Connecting to db...");
        let opts = SqliteConnectOptions::from_str(db_url)?.foreign_keys(true);
        let pool = SqlitePool::connect_with(opts).await?;
        info!("Connected to db.");

        Ok(Self {
            subscriber: SubscriberTable::new(pool.clone()),
            broadcast: BroadcastTable::new(pool.clone()),
            service_state: ServiceStateTable::new(pool.clone()),
            pool,
        })
    }

    /// Runs database migrations from the migrations directory.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Drops all tables. Use with caution!
    pub async fn drop_all_tables(&self) -> Result<(), DatabaseError> {
        self.subscriber.drop_table().await?;
        self.broadcast.drop_table().await?;
        self.service_state.drop_table().await?;
        Ok(())
    }

    /// Deletes all data from all tables. Use with caution!
    pub async fn delete_all_tables(&self) -> Result<(), DatabaseError> {
        self.subscriber.delete_all().await?;
        self.broadcast.delete_all().await?;
        self.service_state.delete_all().await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
