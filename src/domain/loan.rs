// ==========================================
// 图书馆流通管理系统 - 借阅领域模型
// ==========================================
// 红线: Loan.status / BookCopy.status 的流转只属于借阅引擎
// 说明: Overdue 不是存储状态，而是 now > due_date 的派生谓词，
//       避免与真实时间同步维护第二个不变量
// ==========================================

use crate::domain::types::LoanStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Loan - 借阅记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: String,                     // 借阅ID (UUID)
    pub barcode: String,                     // 借出复本条码
    pub member_id: String,                   // 借阅者ID
    pub issue_date: DateTime<Utc>,           // 借出时间
    pub due_date: DateTime<Utc>,             // 应还时间
    pub return_date: Option<DateTime<Utc>>,  // 实际归还时间
    pub status: LoanStatus,                  // 借阅状态
    pub renewal_count: i32,                  // 已续借次数 (>=0, 受策略上限约束)
    pub issued_by: String,                   // 办理借出的馆员ID
    pub returned_to: Option<String>,         // 办理归还的馆员ID
}

impl Loan {
    /// 是否逾期（派生谓词，仅对 Active 借阅有意义）
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == LoanStatus::Active && now > self.due_date
    }

    /// 逾期天数（按自然日向下取整，不足一天不计）
    ///
    /// # 参数
    /// - at: 计算时点（归还路径传 return_date）
    ///
    /// # 返回
    /// - 非负天数；未逾期返回 0
    pub fn overdue_days(&self, at: DateTime<Utc>) -> i64 {
        (at - self.due_date).num_days().max(0)
    }
}

// ==========================================
// LoanDetail - 借阅详情（联 member / book 的读视图）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanDetail {
    pub loan: Loan,
    pub member_name: String, // 借阅者姓名
    pub isbn: String,        // 题名 ISBN
    pub title: String,       // 题名
    pub author: String,      // 作者
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_loan(due: DateTime<Utc>) -> Loan {
        Loan {
            loan_id: "L1".to_string(),
            barcode: "BC0001".to_string(),
            member_id: "M1".to_string(),
            issue_date: due - Duration::days(14),
            due_date: due,
            return_date: None,
            status: LoanStatus::Active,
            renewal_count: 0,
            issued_by: "S1".to_string(),
            returned_to: None,
        }
    }

    #[test]
    fn test_overdue_days_floor() {
        let due = Utc::now();
        let loan = sample_loan(due);

        // 刚好到期: 0 天
        assert_eq!(loan.overdue_days(due), 0);
        // 超过 23 小时仍不足一天: 0 天
        assert_eq!(loan.overdue_days(due + Duration::hours(23)), 0);
        // 超过 5 天零 1 小时: 5 天
        assert_eq!(
            loan.overdue_days(due + Duration::days(5) + Duration::hours(1)),
            5
        );
        // 提前归还: 0 天
        assert_eq!(loan.overdue_days(due - Duration::days(2)), 0);
    }

    #[test]
    fn test_overdue_predicate_only_for_active() {
        let due = Utc::now() - Duration::days(3);
        let mut loan = sample_loan(due);
        assert!(loan.is_overdue(Utc::now()));

        loan.status = LoanStatus::Returned;
        assert!(!loan.is_overdue(Utc::now()));
    }
}
