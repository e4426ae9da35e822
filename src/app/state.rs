// ==========================================
// 图书馆流通管理系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{FineApi, LoanApi, PolicyApi, ReservationApi};
use crate::config::policy_store::PolicyStore;
use crate::db;
use crate::engine::fine_ledger::FineLedger;
use crate::engine::loan_engine::LoanEngine;
use crate::engine::reservation_queue::ReservationQueue;
use crate::engine::sinks::{
    AuditSink, NotificationSink, PaymentGateway, SqliteAuditSink, SqliteNotificationSink,
    StubPaymentGateway,
};
use crate::repository::{
    AuditLogRepository, FineRepository, LibrarianRepository, LoanRepository,
    NotificationRepository, ReservationRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 借阅API
    pub loan_api: Arc<LoanApi>,

    /// 罚款API
    pub fine_api: Arc<FineApi>,

    /// 预约API
    pub reservation_api: Arc<ReservationApi>,

    /// 借阅策略API
    pub policy_api: Arc<PolicyApi>,

    /// 审计日志仓储（管理端审计追踪用）
    pub audit_log_repo: Arc<AuditLogRepository>,

    /// 通知仓储（管理端投递队列查看用）
    pub notification_repo: Arc<NotificationRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开共享连接并初始化 schema（幂等）
    /// 2. 初始化所有Repository与旁路接收器
    /// 3. 初始化引擎并创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        // 创建数据库连接（共享连接，统一 PRAGMA）
        let conn = db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        db::init_schema(&conn).map_err(|e| format!("无法初始化数据库schema: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let loan_repo = Arc::new(LoanRepository::new(Arc::clone(&conn)));
        let fine_repo = Arc::new(FineRepository::new(Arc::clone(&conn)));
        let reservation_repo = Arc::new(ReservationRepository::new(Arc::clone(&conn)));
        let librarian_repo = Arc::new(LibrarianRepository::new(Arc::clone(&conn)));
        let audit_log_repo = Arc::new(AuditLogRepository::new(Arc::clone(&conn)));
        let notification_repo = Arc::new(NotificationRepository::new(Arc::clone(&conn)));
        let policy_store = Arc::new(PolicyStore::new(Arc::clone(&conn)));

        // ==========================================
        // 初始化旁路接收器（审计/通知/支付网关）
        // ==========================================
        let audit: Arc<dyn AuditSink> = Arc::new(SqliteAuditSink::new(Arc::clone(&conn)));
        let notifier: Arc<dyn NotificationSink> =
            Arc::new(SqliteNotificationSink::new(Arc::clone(&conn)));
        let gateway: Arc<dyn PaymentGateway> = Arc::new(StubPaymentGateway);

        // ==========================================
        // 初始化引擎层
        // ==========================================
        let loan_engine = Arc::new(LoanEngine::new(
            Arc::clone(&conn),
            Arc::clone(&audit),
            Arc::clone(&notifier),
        ));
        let fine_ledger = Arc::new(FineLedger::new(
            Arc::clone(&conn),
            Arc::clone(&audit),
            Arc::clone(&gateway),
        ));
        let reservation_queue = Arc::new(ReservationQueue::new(
            Arc::clone(&conn),
            Arc::clone(&audit),
        ));

        // ==========================================
        // 创建API实例
        // ==========================================
        let loan_api = Arc::new(LoanApi::new(loan_engine, Arc::clone(&loan_repo)));
        let fine_api = Arc::new(FineApi::new(fine_ledger, Arc::clone(&fine_repo)));
        let reservation_api = Arc::new(ReservationApi::new(
            reservation_queue,
            Arc::clone(&reservation_repo),
        ));
        let policy_api = Arc::new(PolicyApi::new(
            policy_store,
            Arc::clone(&librarian_repo),
            Arc::clone(&audit),
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            loan_api,
            fine_api,
            reservation_api,
            policy_api,
            audit_log_repo,
            notification_repo,
        })
    }
}

// ==========================================
// 默认数据库路径
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 用户数据目录/library-circulation/library_circulation.db
/// - 环境变量 LIBRARY_CIRCULATION_DB_PATH 可显式覆盖（便于调试/测试/CI）
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("LIBRARY_CIRCULATION_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    // 先给一个默认回退值，拿到用户数据目录后再覆盖
    let mut path = PathBuf::from("./library_circulation.db");

    if let Some(data_dir) = dirs::data_dir() {
        path = data_dir.join("library-circulation");
        // 确保目录存在
        std::fs::create_dir_all(&path).ok();
        path = path.join("library_circulation.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    // 注意：AppState::new() 的测试需要真实的数据库文件
    // 这些测试应该在集成测试中进行
}
