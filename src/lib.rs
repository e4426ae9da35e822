// ==========================================
// 图书馆流通管理系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 流通事务引擎（借出/归还/续借、罚款台账、预约队列）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 状态机事务编排
pub mod engine;

// 配置层 - 借阅策略
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AccountStatus, CopyStatus, FineStatus, LoanStatus, PaymentMethod, ReservationStatus,
};

// 领域实体
pub use domain::{
    AuditAction, AuditLog, Book, BookCopy, Fine, Librarian, Loan, LoanDetail, Member,
    Notification, Payment, Reservation,
};

// 错误类型
pub use api::error::{ApiError, ApiResult};
pub use repository::error::{RepositoryError, RepositoryResult};

// 引擎
pub use engine::{CheckinOutcome, FineLedger, LoanEngine, PaymentOutcome, ReservationQueue};

// 应用状态
pub use app::{get_default_db_path, AppState};

/// 系统版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_not_empty() {
        assert!(!VERSION.is_empty());
    }
}
