// ==========================================
// 图书馆流通管理系统 - 数据仓储层
// ==========================================
// 职责: SQLite 数据访问、行映射、条件更新原语
// 红线: 不做业务逻辑；状态机的合法流转由引擎层编排
// 说明: *_tx 关联函数在调用方持有的连接/事务上执行，
//       供引擎在同一事务内跨仓储组合
// ==========================================

pub mod audit_log_repo;
pub mod book_repo;
pub mod error;
pub mod fine_repo;
pub mod loan_repo;
pub mod member_repo;
pub mod notification_repo;
pub mod reservation_repo;

// 重导出核心类型
pub use audit_log_repo::AuditLogRepository;
pub use book_repo::{BookCopyRepository, BookRepository};
pub use error::{RepositoryError, RepositoryResult};
pub use fine_repo::FineRepository;
pub use loan_repo::LoanRepository;
pub use member_repo::{LibrarianRepository, MemberRepository};
pub use notification_repo::NotificationRepository;
pub use reservation_repo::ReservationRepository;
