//! Identity Resolution
//!
//! 认证由前置网关完成, 引擎只向 provider 询问"来的人是谁"。

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

/// Caller roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Owner,
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "owner" => Ok(Role::Owner),
            _ => Err(()),
        }
    }
}

/// Resolved caller identity
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

/// Pluggable identity lookup; `None` means the caller is anonymous
#[async_trait]
pub trait IdentityProvider: Send + Sync + fmt::Debug {
    async fn resolve(&self, headers: &http::HeaderMap) -> Option<Identity>;
}

pub type SharedIdentityProvider = Arc<dyn IdentityProvider>;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Default provider: trusts the authenticating proxy fronting the binary
/// to pass a stable user id, with an optional role header defaulting to
/// customer.
#[derive(Debug, Default, Clone)]
pub struct HeaderIdentity;

#[async_trait]
impl IdentityProvider for HeaderIdentity {
    async fn resolve(&self, headers: &http::HeaderMap) -> Option<Identity> {
        let user_id = headers.get(USER_ID_HEADER)?.to_str().ok()?.trim();
        if user_id.is_empty() {
            return None;
        }
        let role = headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(Role::Customer);
        Some(Identity {
            user_id: user_id.to_string(),
            role,
        })
    }
}
