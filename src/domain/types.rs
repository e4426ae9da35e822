// ==========================================
// 图书馆流通管理系统 - 领域类型定义
// ==========================================
// 红线: 状态枚举与数据库存储字符串一一对应
// 序列化格式: PascalCase (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 复本状态 (Copy Status)
// ==========================================
// 红线: Available → Loaned 只能通过条件更新完成（防止双借）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyStatus {
    Available, // 在架可借
    Loaned,    // 借出
    Reserved,  // 预约保留（等待取书）
    Lost,      // 丢失
    Damaged,   // 破损
}

impl fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl CopyStatus {
    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            CopyStatus::Available => "Available",
            CopyStatus::Loaned => "Loaned",
            CopyStatus::Reserved => "Reserved",
            CopyStatus::Lost => "Lost",
            CopyStatus::Damaged => "Damaged",
        }
    }

    /// 从字符串解析状态
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "Available" => CopyStatus::Available,
            "Loaned" => CopyStatus::Loaned,
            "Reserved" => CopyStatus::Reserved,
            "Lost" => CopyStatus::Lost,
            "Damaged" => CopyStatus::Damaged,
            _ => CopyStatus::Damaged, // 未知状态视为不可借
        }
    }
}

// ==========================================
// 借阅状态 (Loan Status)
// ==========================================
// 说明: Overdue 是派生谓词 (now > due_date 且 Active)，不入库
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    Active,   // 借阅中
    Returned, // 已归还（终态）
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl LoanStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "Active",
            LoanStatus::Returned => "Returned",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "Active" => LoanStatus::Active,
            _ => LoanStatus::Returned,
        }
    }
}

// ==========================================
// 预约状态 (Reservation Status)
// ==========================================
// 红线: Pending → Fulfilled 只能通过条件更新完成（防止同一空位被双重兑现）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    Pending,   // 排队中
    Fulfilled, // 已兑现（复本保留中）
    Cancelled, // 已取消
    Expired,   // 保留期满未取书
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ReservationStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "Pending",
            ReservationStatus::Fulfilled => "Fulfilled",
            ReservationStatus::Cancelled => "Cancelled",
            ReservationStatus::Expired => "Expired",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "Pending" => ReservationStatus::Pending,
            "Fulfilled" => ReservationStatus::Fulfilled,
            "Cancelled" => ReservationStatus::Cancelled,
            _ => ReservationStatus::Expired,
        }
    }
}

// ==========================================
// 罚款状态 (Fine Status)
// ==========================================
// 红线: Unpaid → Paid 只能通过条件更新完成（防止重复支付）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FineStatus {
    Unpaid, // 未支付
    Paid,   // 已支付（终态）
    Waived, // 已减免（终态）
}

impl fmt::Display for FineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl FineStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            FineStatus::Unpaid => "Unpaid",
            FineStatus::Paid => "Paid",
            FineStatus::Waived => "Waived",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "Unpaid" => FineStatus::Unpaid,
            "Paid" => FineStatus::Paid,
            _ => FineStatus::Waived,
        }
    }
}

// ==========================================
// 账户状态 (Account Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    Active,    // 正常
    Suspended, // 冻结
    Closed,    // 注销
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl AccountStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "Active",
            AccountStatus::Suspended => "Suspended",
            AccountStatus::Closed => "Closed",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "Active" => AccountStatus::Active,
            "Suspended" => AccountStatus::Suspended,
            _ => AccountStatus::Closed,
        }
    }
}

// ==========================================
// 支付方式 (Payment Method)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,   // 现金（柜台）
    Card,   // 刷卡
    Online, // 在线支付
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl PaymentMethod {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::Online => "Online",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "Cash" => PaymentMethod::Cash,
            "Card" => PaymentMethod::Card,
            _ => PaymentMethod::Online,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_status_roundtrip() {
        for status in [
            CopyStatus::Available,
            CopyStatus::Loaned,
            CopyStatus::Reserved,
            CopyStatus::Lost,
            CopyStatus::Damaged,
        ] {
            assert_eq!(CopyStatus::from_db_str(status.to_db_str()), status);
        }
    }

    #[test]
    fn test_unknown_copy_status_is_not_lendable() {
        assert_eq!(CopyStatus::from_db_str("???"), CopyStatus::Damaged);
    }
}
