//! Repository Module
//!
//! Provides CRUD and transactional operations for SurrealDB tables.

// Shop Domain
pub mod shop;

// Reservations
pub mod reservation;

// Re-exports
pub use reservation::ReservationRepository;
pub use shop::ShopRepository;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// A guarded transaction observed state that changed under it
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

// =============================================================================
// ID Convention: 全栈统一使用 "table:id" 格式
// =============================================================================
//
// 使用 surrealdb::RecordId 处理所有 ID：
//   - 解析: let id: RecordId = "shop:abc".parse()?;
//   - 获取表名: id.table()
//   - CRUD: db.select(id) / db.delete(id) 直接使用 RecordId
//
// 跨表引用字段 (如 reservation.shop_id) 以完整的 "table:id" 字符串存储,
// 查询时按字符串绑定。

/// Transaction guard markers thrown inside SurrealQL blocks.
///
/// 事务中 THROW 的文本会出现在 surrealdb::Error 的消息里, 据此区分
/// 可重试的竞争冲突和真正的数据库错误。
const TX_STATE_CHANGED: &str = "reservation_state_changed";
const TX_CAPACITY_EXHAUSTED: &str = "capacity_exhausted";

/// Map a transaction failure onto `RepoError`. Guard throws become
/// `Conflict` (retryable by the caller), anything else is `Database`.
pub fn classify_transaction_error(err: surrealdb::Error) -> RepoError {
    let msg = err.to_string();
    if msg.contains(TX_STATE_CHANGED) || msg.contains(TX_CAPACITY_EXHAUSTED) {
        RepoError::Conflict(msg)
    } else {
        RepoError::Database(msg)
    }
}

/// Base repository with database reference
#[derive(Clone, Debug)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}
