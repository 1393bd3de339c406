//! Logging Infrastructure
//!
//! Structured logging setup with support for both development and production environments
//! Features:
//! - Daily rotating application logs (deleted after 14 days)
//! - Permanent HTTP access logs (never deleted)

use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, filter::filter_fn, fmt, prelude::*};

/// 应用日志保留天数
const LOG_RETENTION_DAYS: i64 = 14;

/// Clean up old application log files (older than [`LOG_RETENTION_DAYS`])
///
/// Call this periodically (e.g., daily) to maintain log size.
/// Access logs are never touched.
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<()> {
    use chrono::{Local, TimeZone};

    let cutoff = Local::now() - chrono::Duration::days(LOG_RETENTION_DAYS);

    // Application logs subdirectory
    let app_log_dir = log_dir.join("app");
    if app_log_dir.exists() {
        // tracing-appender daily files are named app.YYYY-MM-DD
        for entry in fs::read_dir(app_log_dir)? {
            let entry = entry?;
            let path = entry.path();

            if let Some(name) = path.file_name().and_then(|n| n.to_str())
                && let Some(date_part) = name.strip_prefix("app.")
                && let Ok(naive_date) = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            {
                // Parse as local date at midnight
                if let Some(local_datetime) = Local
                    .from_local_datetime(&naive_date.and_hms_opt(0, 0, 0).unwrap())
                    .single()
                    && local_datetime < cutoff
                {
                    fs::remove_file(&path)?;
                    tracing::info!(file = %name, "Deleted old log file");
                }
            }
        }
    }

    Ok(())
}

/// Initialize the logging system with daily rotating logs
///
/// # Arguments
/// * `level` - Log level (e.g., "info", "debug", "warn"); `RUST_LOG` wins if set
/// * `json_console` - Whether console output uses JSON (true for production)
/// * `log_dir` - Optional directory for file logging (e.g., Some("./data/logs"))
///
/// File layers are always JSON and split by target:
/// - `logs/app/` - everything except HTTP access entries, cleaned after 14 days
/// - `logs/access/` - `http_access` target only, kept forever
pub fn init_logger_with_file(
    level: &str,
    json_console: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry().with(env_filter);

    if let Some(dir) = log_dir {
        let log_dir = Path::new(dir);
        fs::create_dir_all(log_dir)?;

        let app_log_dir = log_dir.join("app");
        let access_log_dir = log_dir.join("access");
        fs::create_dir_all(&app_log_dir)?;
        fs::create_dir_all(&access_log_dir)?;

        // Standard application logs (rotated daily, subject to cleanup)
        let app_log = RollingFileAppender::new(Rotation::DAILY, app_log_dir, "app");
        let app_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_writer(std::sync::Mutex::new(app_log))
            .with_filter(filter_fn(|meta| meta.target() != "http_access"));

        // Permanent access logs
        let access_log = RollingFileAppender::new(Rotation::DAILY, access_log_dir, "access");
        let access_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::sync::Mutex::new(access_log))
            .with_filter(filter_fn(|meta| meta.target() == "http_access"));

        // Start cleanup task
        tokio::spawn(periodic_cleanup(log_dir.to_path_buf()));

        if json_console {
            let console_layer = fmt::layer().json().with_target(true).with_current_span(true);
            subscriber
                .with(console_layer)
                .with(app_layer)
                .with(access_layer)
                .init();
        } else {
            let console_layer = fmt::layer().with_target(true);
            subscriber
                .with(console_layer)
                .with(app_layer)
                .with(access_layer)
                .init();
        }
    } else if json_console {
        let console_layer = fmt::layer().json().with_target(true).with_current_span(true);
        subscriber.with(console_layer).init();
    } else {
        let console_layer = fmt::layer().with_target(true);
        subscriber.with(console_layer).init();
    }

    Ok(())
}

/// Periodic cleanup task - runs every hour to clean old logs
async fn periodic_cleanup(log_dir: PathBuf) {
    use tokio::time::{Duration, sleep};

    loop {
        sleep(Duration::from_secs(3600)).await;

        if let Err(e) = cleanup_old_logs(&log_dir) {
            tracing::error!(error = %e, "Failed to cleanup old logs");
        }
    }
}

/// Initialize the logging system (console only)
///
/// Convenience function for console-only logging
pub fn init_logger(level: &str) -> anyhow::Result<()> {
    init_logger_with_file(level, false, None)
}
