// ==========================================
// 图书馆流通管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、派生谓词
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod audit_log;
pub mod book;
pub mod fine;
pub mod loan;
pub mod member;
pub mod reservation;
pub mod types;

// 重导出核心类型
pub use audit_log::{AuditAction, AuditLog, Notification};
pub use book::{Book, BookCopy};
pub use fine::{Fine, Payment, FINE_REASON_OVERDUE};
pub use loan::{Loan, LoanDetail};
pub use member::{Librarian, Member};
pub use reservation::Reservation;
pub use types::{
    AccountStatus, CopyStatus, FineStatus, LoanStatus, PaymentMethod, ReservationStatus,
};
