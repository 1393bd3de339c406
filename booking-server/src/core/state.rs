use std::path::PathBuf;
use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::auth::{HeaderIdentity, SharedIdentityProvider};
use crate::core::Config;
use crate::db::DbService;
use crate::notify::Notifier;
use crate::reservations::ReservationService;
use crate::utils::{SharedClock, SystemClock};

/// 服务器状态 - 持有所有服务的单例引用
///
/// ServerState 是预订引擎的核心数据结构，持有所有服务的共享引用。
/// 使用 Arc 实现浅拷贝，克隆成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | Surreal<Db> | 嵌入式数据库 |
/// | clock | SharedClock | 可注入时钟 (墙钟或测试时钟) |
/// | identity | SharedIdentityProvider | 调用方身份解析 |
/// | notifier | Notifier | 资源变更广播与版本号 |
/// | reservations | ReservationService | 预订领域服务 |
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 嵌入式数据库 (SurrealDB)
    pub db: Surreal<Db>,
    /// 可注入时钟; 所有业务时间判断都经过它
    pub clock: SharedClock,
    /// 调用方身份解析
    pub identity: SharedIdentityProvider,
    /// 资源变更广播器
    pub notifier: Notifier,
    /// 预订领域服务
    pub reservations: ReservationService,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构
    /// 2. 数据库 (work_dir/db/booking.db)
    /// 3. 领域服务
    ///
    /// # Panics
    ///
    /// 工作目录或数据库初始化失败时 panic
    pub async fn initialize(config: &Config) -> Self {
        let clock: SharedClock = Arc::new(SystemClock);
        let identity: SharedIdentityProvider = Arc::new(HeaderIdentity);
        Self::initialize_with(config, clock, identity).await
    }

    /// 以自定义时钟和身份源初始化
    ///
    /// 测试场景注入 ManualClock 即可驱动取消窗口和清理判定。
    ///
    /// # Panics
    ///
    /// 同 [`ServerState::initialize`]
    pub async fn initialize_with(
        config: &Config,
        clock: SharedClock,
        identity: SharedIdentityProvider,
    ) -> Self {
        // 0. Ensure work_dir structure exists
        config
            .ensure_work_dir_structure()
            .expect("Failed to create work directory structure");

        // 1. Initialize DB
        let db_path = config.database_dir().join("booking.db");
        let db_path_str = db_path.to_string_lossy();

        let db_service = DbService::new(&db_path_str)
            .await
            .expect("Failed to initialize database");
        let db = db_service.db;

        // 2. Initialize Services
        let notifier = Notifier::default();
        let reservations =
            ReservationService::new(db.clone(), notifier.clone(), clock.clone(), config);

        Self {
            config: config.clone(),
            db,
            clock,
            identity,
            notifier,
            reservations,
        }
    }

    /// 获取数据库实例
    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }

    /// 获取工作目录
    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.work_dir)
    }
}
