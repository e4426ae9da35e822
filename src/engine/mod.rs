// ==========================================
// 图书馆流通管理系统 - 引擎层
// ==========================================
// 职责: 状态机操作的事务编排（借出/归还/续借、罚款结清、预约流转）
// 红线: 每个写操作是一个 BEGIN IMMEDIATE 事务，任一步失败全部回滚
// 红线: 审计/通知旁路在事务提交之后调用，尽力而为
// ==========================================

pub mod fine_ledger;
pub mod loan_engine;
pub mod reservation_queue;
pub mod sinks;

// 重导出核心类型
pub use fine_ledger::{FineLedger, PaymentOutcome};
pub use loan_engine::{CheckinOutcome, LoanEngine};
pub use reservation_queue::ReservationQueue;
pub use sinks::{
    AuditSink, NotificationSink, PaymentGateway, SqliteAuditSink, SqliteNotificationSink,
    StubPaymentGateway,
};
