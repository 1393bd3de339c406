//! Terminal Reservation Purge
//!
//! 周期清理终止状态的预约: `deleted` 超出保留期后删除, `done` 同理,
//! 两个窗口都从配置读取。归档标记不影响清理, 只看状态和年龄。

use chrono::Duration;
use tokio_util::sync::CancellationToken;

use crate::core::ServerState;
use crate::db::models::ReservationStatus;

/// 注册为 `TaskKind::Periodic`, 在 `Server::run()` 中启动。
pub struct PurgeScheduler {
    state: ServerState,
    shutdown: CancellationToken,
}

impl PurgeScheduler {
    pub fn new(state: ServerState, shutdown: CancellationToken) -> Self {
        Self { state, shutdown }
    }

    /// 主循环: 启动先清一轮, 之后每个 purge_interval 周期清一轮
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.state.config.purge_interval_secs,
            "Reservation purge scheduler started"
        );

        self.sweep().await;

        let interval = std::time::Duration::from_secs(self.state.config.purge_interval_secs);
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    self.sweep().await;
                }
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Purge scheduler received shutdown signal");
                    return;
                }
            }
        }
    }

    /// One retention pass over both terminal windows
    async fn sweep(&self) {
        let jobs = [
            (
                ReservationStatus::Deleted,
                self.state.config.purge_deleted_hours,
            ),
            (ReservationStatus::Done, self.state.config.purge_done_hours),
        ];

        for (status, hours) in jobs {
            match self
                .state
                .reservations
                .purge_terminal_reservations(Duration::hours(hours), status)
                .await
            {
                Ok(0) => tracing::debug!(status = %status, "Nothing to purge"),
                Ok(count) => tracing::info!(status = %status, count, "Purge pass complete"),
                Err(e) => tracing::error!(status = %status, "Purge pass failed: {}", e),
            }
        }
    }
}
