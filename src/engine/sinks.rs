// ==========================================
// 图书馆流通管理系统 - 旁路接收器
// ==========================================
// 职责: 审计/通知/支付网关的外部协作者接口
// 红线: 审计与通知为尽力而为——在主事务提交之后调用，
//       失败只记录 warn 日志，不回滚、不报错给调用方
// ==========================================

use crate::domain::audit_log::{AuditAction, AuditLog, Notification};
use crate::domain::types::PaymentMethod;
use crate::repository::audit_log_repo::AuditLogRepository;
use crate::repository::error::RepositoryResult;
use crate::repository::notification_repo::NotificationRepository;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

// ==========================================
// AuditSink - 审计接收器
// ==========================================
pub trait AuditSink: Send + Sync {
    /// 记录一条审计事件（detail 为操作上下文 JSON）
    fn record(
        &self,
        actor_id: &str,
        action: AuditAction,
        entity_type: &str,
        entity_id: &str,
        detail: serde_json::Value,
    ) -> RepositoryResult<()>;
}

/// SQLite 落库的审计接收器
pub struct SqliteAuditSink {
    repo: AuditLogRepository,
}

impl SqliteAuditSink {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            repo: AuditLogRepository::new(conn),
        }
    }
}

impl AuditSink for SqliteAuditSink {
    fn record(
        &self,
        actor_id: &str,
        action: AuditAction,
        entity_type: &str,
        entity_id: &str,
        detail: serde_json::Value,
    ) -> RepositoryResult<()> {
        let log = AuditLog::new(actor_id, action, entity_type, entity_id, detail);
        self.repo.insert(&log)
    }
}

// ==========================================
// NotificationSink - 通知接收器
// ==========================================
// 说明: 只入队，投递由外部渠道负责
pub trait NotificationSink: Send + Sync {
    /// 入队一条待投递通知
    fn enqueue(&self, recipient: &str, kind: &str, content: &str) -> RepositoryResult<()>;
}

/// SQLite 落库的通知接收器
pub struct SqliteNotificationSink {
    repo: NotificationRepository,
}

impl SqliteNotificationSink {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            repo: NotificationRepository::new(conn),
        }
    }
}

impl NotificationSink for SqliteNotificationSink {
    fn enqueue(&self, recipient: &str, kind: &str, content: &str) -> RepositoryResult<()> {
        let notification = Notification::new(recipient, kind, content);
        self.repo.insert(&notification)
    }
}

// ==========================================
// PaymentGateway - 支付网关
// ==========================================
pub trait PaymentGateway: Send + Sync {
    /// 发起扣款，返回网关交易号
    fn charge(
        &self,
        member_id: &str,
        amount: i64,
        method: PaymentMethod,
    ) -> anyhow::Result<String>;
}

/// 桩支付网关: 恒成功，生成本地交易号
pub struct StubPaymentGateway;

impl PaymentGateway for StubPaymentGateway {
    fn charge(
        &self,
        _member_id: &str,
        _amount: i64,
        _method: PaymentMethod,
    ) -> anyhow::Result<String> {
        Ok(format!("TXN-{}", uuid::Uuid::new_v4().simple()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_gateway_yields_transaction_ref() {
        let gateway = StubPaymentGateway;
        let txn_ref = gateway.charge("M001", 25000, PaymentMethod::Cash).unwrap();
        assert!(txn_ref.starts_with("TXN-"));
    }
}
