//! 统一错误处理
//!
//! 提供应用级错误类型和响应结构：
//! - [`AppError`] - 应用错误枚举
//! - 每个变体映射到稳定的错误码和 HTTP 状态
//!
//! # 错误码规范
//!
//! | 前缀 | 分类 | 示例 |
//! |------|------|------|
//! | E0xxx | 通用业务错误 | E0002 验证失败 |
//! | E1xxx | 预约领域错误 | E1001 店铺未营业 |
//! | E2xxx | 权限错误 | E2001 无权限 |
//! | E3xxx | 认证错误 | E3001 未登录 |
//! | E9xxx | 系统错误 | E9002 数据库错误 |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::db::repository::RepoError;

/// Error payload returned to clients: stable code plus a short message.
/// Handlers never format UI copy themselves; this is the only place an
/// error kind becomes text.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== 认证/权限错误 (4xx) ==========
    #[error("Authentication required")]
    /// 未登录 (401)
    Unauthorized,

    #[error("Permission denied: {0}")]
    /// 无权限 (403)
    Forbidden(String),

    // ========== 通用业务错误 (4xx) ==========
    #[error("Resource not found: {0}")]
    /// 资源不存在 (404)
    NotFound(String),

    #[error("Resource already exists: {0}")]
    /// 资源冲突 (409)
    Duplicate(String),

    #[error("Validation failed: {0}")]
    /// 验证失败 (400)
    Validation(String),

    // ========== 预约领域错误 (4xx) ==========
    #[error("Shop is closed at the requested time: {0}")]
    /// 店铺未营业 (422)
    OutOfHours(String),

    #[error("Illegal status change: {0}")]
    /// 非法状态迁移 (409)
    InvalidTransition(String),

    #[error("Cancellation window expired: {elapsed_minutes} minute(s) elapsed, window is {window_minutes}")]
    /// 超出取消时限 (422)
    CancellationWindowExpired {
        elapsed_minutes: i64,
        window_minutes: i64,
    },

    #[error("No capacity left: {0}")]
    /// 无可用座位 (409)
    NoCapacity(String),

    #[error("Concurrent update conflict: {0}")]
    /// 并发写冲突，重试耗尽后才会到达这里 (409)
    ConcurrencyConflict(String),

    // ========== 系统错误 (5xx) ==========
    #[error("Database error: {0}")]
    /// 数据库错误 (500)
    Database(String),

    #[error("Internal server error: {0}")]
    /// 内部错误 (500)
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Authentication (401)
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "E3001",
                "Please login first".to_string(),
            ),

            // Authorization (403)
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "E2001", msg.clone()),

            // Not found (404)
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "E0003", msg.clone()),

            // Duplicate (409)
            AppError::Duplicate(msg) => (StatusCode::CONFLICT, "E0004", msg.clone()),

            // Validation (400)
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "E0002", msg.clone()),

            // Booking domain (409/422)
            AppError::OutOfHours(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "E1001", msg.clone())
            }
            AppError::InvalidTransition(msg) => (StatusCode::CONFLICT, "E1002", msg.clone()),
            AppError::CancellationWindowExpired { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "E1003",
                self.to_string(),
            ),
            AppError::NoCapacity(msg) => (StatusCode::CONFLICT, "E1004", msg.clone()),
            AppError::ConcurrencyConflict(msg) => (StatusCode::CONFLICT, "E1005", msg.clone()),

            // Database errors (500)
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9002",
                    "Database error".to_string(),
                )
            }

            // Internal errors (500)
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9001",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorBody {
            code: code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            RepoError::Duplicate(msg) => AppError::Duplicate(msg),
            RepoError::Conflict(msg) => AppError::ConcurrencyConflict(msg),
            RepoError::Validation(msg) => AppError::Validation(msg),
            RepoError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

// ========== Helper Constructors ==========

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn duplicate(msg: impl Into<String>) -> Self {
        Self::Duplicate(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn out_of_hours(msg: impl Into<String>) -> Self {
        Self::OutOfHours(msg.into())
    }

    pub fn no_capacity(msg: impl Into<String>) -> Self {
        Self::NoCapacity(msg.into())
    }

    /// Concurrency conflict, surfaced only after the retry budget is spent
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::ConcurrencyConflict(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
