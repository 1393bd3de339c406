//! 工具模块 - 通用工具函数和类型
//!
//! - [`AppError`] / [`AppResult`] - 应用错误类型
//! - [`clock`] - 可注入时钟
//! - 时间、日志、校验等工具

pub mod clock;
pub mod error;
pub mod logger;
pub mod result;
pub mod time;
pub mod validation;

pub use clock::{Clock, FixedClock, ManualClock, SharedClock, SystemClock};
pub use error::AppError;
pub use result::AppResult;
