//! Identity Extractor
//!
//! 在受保护的 handler 中使用 [`CurrentUser`] 提取器即可完成鉴权

use axum::{extract::FromRequestParts, http::request::Parts};

use super::CurrentUser;
use crate::core::ServerState;
use crate::utils::error::AppError;

impl FromRequestParts<ServerState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        // 同一请求内只解析一次, 后续提取直接复用
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let identity = state
            .identity
            .resolve(&parts.headers)
            .await
            .ok_or(AppError::Unauthorized)?;

        let user = CurrentUser {
            user_id: identity.user_id,
            role: identity.role,
        };
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}
