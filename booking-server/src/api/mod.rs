//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查接口
//! - [`shops`] - 店铺与排班管理接口
//! - [`reservations`] - 预订生命周期接口

pub mod health;
pub mod reservations;
pub mod shops;

// Re-export common types for handlers
pub use crate::utils::{AppError, AppResult};
