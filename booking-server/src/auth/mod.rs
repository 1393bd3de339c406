//! 认证授权模块
//!
//! 本服务不做登录; 身份由前置网关解析后随请求传入, 这里只负责:
//! - [`IdentityProvider`] 身份解析接口与默认的 [`HeaderIdentity`] 实现
//! - [`CurrentUser`] axum 提取器, 供受保护的 handler 取当前用户

pub mod extractor;
pub mod identity;

pub use identity::{
    HeaderIdentity, Identity, IdentityProvider, Role, SharedIdentityProvider, USER_ID_HEADER,
    USER_ROLE_HEADER,
};

use crate::utils::{AppError, AppResult};

/// 当前请求的调用方
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }

    /// Owner-only 接口的前置检查
    pub fn require_owner(&self) -> AppResult<()> {
        if self.is_owner() {
            Ok(())
        } else {
            Err(AppError::forbidden("Owner role required"))
        }
    }
}
