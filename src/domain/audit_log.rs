// ==========================================
// 图书馆流通管理系统 - 审计/通知领域模型
// ==========================================
// 红线: 流通写操作必须发出审计事件
// 说明: 审计与通知均为旁路记录，失败不回滚主事务
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ==========================================
// AuditAction - 审计动作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    Checkout,        // 借出
    Checkin,         // 归还
    Renew,           // 续借
    PayFine,         // 支付罚款
    WaiveFine,       // 减免罚款
    CreateReservation, // 创建预约
    CancelReservation, // 取消预约
    UpdatePolicy,    // 修改借阅策略
}

impl AuditAction {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Checkout => "CHECKOUT",
            AuditAction::Checkin => "CHECKIN",
            AuditAction::Renew => "RENEW",
            AuditAction::PayFine => "PAY_FINE",
            AuditAction::WaiveFine => "WAIVE_FINE",
            AuditAction::CreateReservation => "CREATE_RESERVATION",
            AuditAction::CancelReservation => "CANCEL_RESERVATION",
            AuditAction::UpdatePolicy => "UPDATE_POLICY",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CHECKOUT" => Some(AuditAction::Checkout),
            "CHECKIN" => Some(AuditAction::Checkin),
            "RENEW" => Some(AuditAction::Renew),
            "PAY_FINE" => Some(AuditAction::PayFine),
            "WAIVE_FINE" => Some(AuditAction::WaiveFine),
            "CREATE_RESERVATION" => Some(AuditAction::CreateReservation),
            "CANCEL_RESERVATION" => Some(AuditAction::CancelReservation),
            "UPDATE_POLICY" => Some(AuditAction::UpdatePolicy),
            _ => None,
        }
    }
}

// ==========================================
// AuditLog - 审计日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub audit_id: String,          // 日志ID (UUID)
    pub actor_id: String,          // 操作人（馆员或借阅者）
    pub action: String,            // 动作类型 (存储为字符串)
    pub entity_type: String,       // 实体类型 (Loan/Fine/Reservation/Policy)
    pub entity_id: String,         // 实体ID
    pub detail: Value,             // 操作上下文 (JSON)
    pub created_at: DateTime<Utc>, // 记录时间
}

impl AuditLog {
    /// 创建新的审计日志
    pub fn new(
        actor_id: &str,
        action: AuditAction,
        entity_type: &str,
        entity_id: &str,
        detail: Value,
    ) -> Self {
        Self {
            audit_id: uuid::Uuid::new_v4().to_string(),
            actor_id: actor_id.to_string(),
            action: action.as_str().to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            detail,
            created_at: Utc::now(),
        }
    }
}

// ==========================================
// Notification - 通知
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: String,   // 通知ID (UUID)
    pub user_id: String,           // 接收人
    pub kind: String,              // 通知类型 (如 ReservationReady)
    pub channel: String,           // 投递渠道（投递本身不在核心范围内）
    pub content: String,           // 通知正文
    pub status: String,            // 投递状态 (Pending/...)
    pub created_at: DateTime<Utc>, // 入队时间
}

impl Notification {
    /// 创建待投递通知
    pub fn new(user_id: &str, kind: &str, content: &str) -> Self {
        Self {
            notification_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind: kind.to_string(),
            channel: "Email".to_string(),
            content: content.to_string(),
            status: "Pending".to_string(),
            created_at: Utc::now(),
        }
    }
}
