//! Change Notification
//!
//! 资源变更的广播通道。业务逻辑只负责发出通知, 从不依赖有没有人在听;
//! 客户端通过版本号判断数据新旧。

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// 资源版本管理器
///
/// 使用 DashMap 实现无锁并发的版本号管理, 每种资源类型维护独立的
/// 版本号, 支持原子递增。
#[derive(Debug)]
pub struct ResourceVersions {
    versions: DashMap<String, u64>,
}

impl ResourceVersions {
    pub fn new() -> Self {
        Self {
            versions: DashMap::new(),
        }
    }

    /// 递增指定资源的版本号并返回新值 (资源不存在时从 0 起步, 返回 1)
    pub fn increment(&self, resource: &str) -> u64 {
        let mut entry = self.versions.entry(resource.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// 获取指定资源的当前版本号 (不存在时返回 0)
    pub fn get(&self, resource: &str) -> u64 {
        self.versions.get(resource).map(|v| *v).unwrap_or(0)
    }
}

impl Default for ResourceVersions {
    fn default() -> Self {
        Self::new()
    }
}

/// One change notice pushed to subscribers
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    /// Resource kind, e.g. "shop" or "reservation"
    pub resource: String,
    /// What happened, e.g. "created", "accepted", "purged"
    pub action: String,
    pub id: String,
    /// Monotonic per-resource version
    pub version: u64,
    /// Snapshot of the changed record, absent for deletions
    pub data: Option<serde_json::Value>,
}

/// Fire-and-forget broadcast fan-out with per-resource versions
#[derive(Clone, Debug)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
    versions: Arc<ResourceVersions>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            versions: Arc::new(ResourceVersions::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Current version of a resource kind
    pub fn version(&self, resource: &str) -> u64 {
        self.versions.get(resource)
    }

    /// Publish a change notice. Send failures (nobody listening) are
    /// ignored; the version still advances.
    pub fn notify<T: Serialize>(
        &self,
        resource: &str,
        action: &str,
        id: &str,
        data: Option<&T>,
    ) -> u64 {
        let version = self.versions.increment(resource);
        let notice = Notice {
            resource: resource.to_string(),
            action: action.to_string(),
            id: id.to_string(),
            version,
            data: data.and_then(|d| serde_json::to_value(d).ok()),
        };
        let _ = self.tx.send(notice);
        version
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// 常驻订阅者: 把每条变更通知落到日志里
///
/// 消费慢于生产时 broadcast 会跳过积压消息, 这里记录跳过数后继续。
pub async fn notice_logger(notifier: Notifier, shutdown: CancellationToken) {
    let mut rx = notifier.subscribe();
    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(notice) => {
                    tracing::debug!(
                        resource = %notice.resource,
                        action = %notice.action,
                        id = %notice.id,
                        version = notice.version,
                        "Change notice"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Notice log fell behind the broadcast channel");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
            _ = shutdown.cancelled() => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn versions_increment_per_resource() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();

        notifier.notify("shop", "created", "shop:a", Some(&serde_json::json!({"n": 1})));
        notifier.notify("reservation", "created", "reservation:b", None::<&()>);
        notifier.notify("shop", "updated", "shop:a", None::<&()>);

        assert_eq!(notifier.version("shop"), 2);
        assert_eq!(notifier.version("reservation"), 1);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.resource, "shop");
        assert_eq!(first.version, 1);
        assert!(first.data.is_some());
    }

    #[test]
    fn notify_without_receivers_is_fine() {
        let notifier = Notifier::new(8);
        let v = notifier.notify("shop", "created", "shop:a", None::<&()>);
        assert_eq!(v, 1);
    }
}
