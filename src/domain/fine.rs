// ==========================================
// 图书馆流通管理系统 - 罚款领域模型
// ==========================================
// 红线: Fine.status 的流转只属于罚款台账
// 说明: 金额使用最小货币单位的整数，避免浮点舍入
// ==========================================

use crate::domain::types::{FineStatus, PaymentMethod};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 罚款事由（当前仅逾期一种）
pub const FINE_REASON_OVERDUE: &str = "Overdue";

// ==========================================
// Fine - 罚款
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fine {
    pub fine_id: String,                    // 罚款ID (UUID)
    pub loan_id: String,                    // 关联借阅
    pub member_id: String,                  // 责任借阅者
    pub amount: i64,                        // 金额（最小货币单位，非负）
    pub reason: String,                     // 事由
    pub status: FineStatus,                 // 罚款状态
    pub created_at: DateTime<Utc>,          // 创建时间
    pub paid_at: Option<DateTime<Utc>>,     // 支付时间
    pub waived_by: Option<String>,          // 减免操作馆员
    pub waived_at: Option<DateTime<Utc>>,   // 减免时间
    pub waive_reason: Option<String>,       // 减免原因
}

impl Fine {
    /// 创建逾期罚款（归还路径专用）
    ///
    /// # 参数
    /// - loan_id / member_id: 责任关联
    /// - overdue_days: 逾期天数（自然日向下取整）
    /// - rate_per_day: 每日费率（最小货币单位）
    pub fn overdue(loan_id: String, member_id: String, overdue_days: i64, rate_per_day: i64) -> Self {
        Self {
            fine_id: uuid::Uuid::new_v4().to_string(),
            loan_id,
            member_id,
            amount: overdue_days * rate_per_day,
            reason: FINE_REASON_OVERDUE.to_string(),
            status: FineStatus::Unpaid,
            created_at: Utc::now(),
            paid_at: None,
            waived_by: None,
            waived_at: None,
            waive_reason: None,
        }
    }
}

// ==========================================
// Payment - 支付流水
// ==========================================
// 说明: 外部支付网关为桩实现（恒成功），流水仍需落库以便对账
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: String,        // 支付ID (UUID)
    pub fine_id: String,           // 关联罚款
    pub member_id: String,         // 支付人
    pub amount: i64,               // 支付金额
    pub method: PaymentMethod,     // 支付方式
    pub transaction_ref: String,   // 网关交易号
    pub created_at: DateTime<Utc>, // 支付时间
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overdue_fine_amount() {
        let fine = Fine::overdue("L1".to_string(), "M1".to_string(), 5, 5000);
        assert_eq!(fine.amount, 25000);
        assert_eq!(fine.status, FineStatus::Unpaid);
        assert_eq!(fine.reason, FINE_REASON_OVERDUE);
    }
}
