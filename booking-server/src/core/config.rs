use std::path::{Path, PathBuf};

/// 服务器配置 - 预订引擎的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | BOOKING_WORK_DIR | ./data | 工作目录 |
/// | BOOKING_HTTP_PORT | 8080 | HTTP 服务端口 |
/// | BOOKING_LOG_LEVEL | info | 日志级别 |
/// | BOOKING_LOG_JSON | false | 控制台日志使用 JSON 格式 |
/// | BOOKING_CANCEL_WINDOW_MINS | 20 | 客户自助取消窗口(分钟) |
/// | BOOKING_PURGE_INTERVAL_SECS | 3600 | 终态预订清理间隔(秒) |
/// | BOOKING_PURGE_DELETED_HOURS | 10 | 已取消预订的保留时长(小时) |
/// | BOOKING_PURGE_DONE_HOURS | 24 | 已完成预订的保留时长(小时) |
/// | BOOKING_TX_MAX_RETRIES | 3 | 守护事务的最大重试次数 |
///
/// # 示例
///
/// ```ignore
/// BOOKING_WORK_DIR=/data/booking BOOKING_HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录, 存储数据库和日志文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 日志级别: trace | debug | info | warn | error
    pub log_level: String,
    /// 控制台日志是否输出 JSON (生产环境建议开启)
    pub log_json: bool,

    // === 预订策略配置 ===
    /// 客户自助取消窗口 (分钟)
    pub cancel_window_mins: i64,
    /// 终态预订清理间隔 (秒)
    pub purge_interval_secs: u64,
    /// 已取消预订保留时长 (小时)
    pub purge_deleted_hours: i64,
    /// 已完成预订保留时长 (小时)
    pub purge_done_hours: i64,
    /// 守护事务在放弃前的最大重试次数
    pub tx_max_retries: u32,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或解析失败，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("BOOKING_WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: std::env::var("BOOKING_HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            log_level: std::env::var("BOOKING_LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("BOOKING_LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            cancel_window_mins: std::env::var("BOOKING_CANCEL_WINDOW_MINS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(20),
            purge_interval_secs: std::env::var("BOOKING_PURGE_INTERVAL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3600),
            purge_deleted_hours: std::env::var("BOOKING_PURGE_DELETED_HOURS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10),
            purge_done_hours: std::env::var("BOOKING_PURGE_DONE_HOURS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(24),
            tx_max_retries: std::env::var("BOOKING_TX_MAX_RETRIES")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 数据库目录 (work_dir/db)
    pub fn database_dir(&self) -> PathBuf {
        Path::new(&self.work_dir).join("db")
    }

    /// 日志目录 (work_dir/logs)
    pub fn log_dir(&self) -> PathBuf {
        Path::new(&self.work_dir).join("logs")
    }

    /// 创建工作目录结构
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }

    /// 客户自助取消窗口
    pub fn cancel_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cancel_window_mins)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
