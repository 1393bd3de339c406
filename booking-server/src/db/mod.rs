//! Database Module
//!
//! Owns the embedded SurrealDB instance and defines schema on startup.

pub mod models;
pub mod repository;

use crate::utils::AppError;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, RocksDb};

const NAMESPACE: &str = "booking";
const DATABASE: &str = "main";

/// Database service - owns the embedded SurrealDB handle
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// Open (or create) the RocksDB-backed database under `db_path` and
    /// make sure schema exists.
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        let db: Surreal<Db> = Surreal::new::<RocksDb>(db_path)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

        Self::define_schema(&db).await?;

        tracing::info!("Database connection established (SurrealDB RocksDB)");

        Ok(Self { db })
    }

    /// Tables plus the indexes behind the hot list queries
    async fn define_schema(db: &Surreal<Db>) -> Result<(), AppError> {
        db.query(
            "DEFINE TABLE IF NOT EXISTS shop SCHEMALESS; \
             DEFINE TABLE IF NOT EXISTS reservation SCHEMALESS; \
             DEFINE INDEX IF NOT EXISTS shop_owner ON shop FIELDS owner_id; \
             DEFINE INDEX IF NOT EXISTS reservation_customer_created ON reservation FIELDS customer_id, created_at; \
             DEFINE INDEX IF NOT EXISTS reservation_shop_created ON reservation FIELDS shop_id, created_at;",
        )
        .await
        .map_err(|e| AppError::database(format!("Failed to define schema: {e}")))?;
        Ok(())
    }
}
