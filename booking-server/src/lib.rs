//! Booking Server - 店铺座位预订引擎
//!
//! # 架构概述
//!
//! 本模块是预订引擎的主入口，提供以下核心功能：
//!
//! - **排班解析** (`schedule`): 周排班 + 单日覆盖的营业判定
//! - **容量追踪** (`capacity`): 座位/桌台水位与压力分级
//! - **预订生命周期** (`reservations`): 状态机、桌位分配、守护事务、定时清理
//! - **数据库** (`db`): 嵌入式 SurrealDB 存储
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! booking-server/src/
//! ├── core/          # 配置、状态、HTTP 装配
//! ├── auth/          # 调用方身份与角色
//! ├── api/           # HTTP 路由和处理器
//! ├── schedule/      # 营业时间解析
//! ├── capacity.rs    # 容量水位与压力分级
//! ├── reservations/  # 预订领域服务
//! ├── notify/        # 资源变更广播
//! ├── utils/         # 工具函数
//! └── db/            # 数据库层
//! ```

pub mod api;
pub mod auth;
pub mod capacity;
pub mod core;
pub mod db;
pub mod notify;
pub mod reservations;
pub mod schedule;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, Role};
pub use core::{Config, Server, ServerState};
pub use notify::{Notice, Notifier};
pub use reservations::ReservationService;
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

/// 进程级环境准备: dotenv、工作目录、日志
///
/// 在读取配置之前调用一次。
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    // .env 不存在时静默跳过
    let _ = dotenv::dotenv();

    let config = Config::from_env();
    config.ensure_work_dir_structure()?;

    let log_dir = config.log_dir();
    let log_dir = log_dir.to_string_lossy();
    init_logger_with_file(&config.log_level, config.log_json, Some(log_dir.as_ref()))?;

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ____              __   _
   / __ )____  ____  / /__(_)___  ____ _
  / __  / __ \/ __ \/ //_/ / __ \/ __ `/
 / /_/ / /_/ / /_/ / ,< / / / / / /_/ /
/_____/\____/\____/_/|_/_/_/ /_/\__, /
                               /____/
    "#
    );
}
