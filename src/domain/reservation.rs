// ==========================================
// 图书馆流通管理系统 - 预约领域模型
// ==========================================
// 红线: Reservation.status 的流转只属于预约队列
// 不变量: 同一题名下，兑现顺序遵循 Pending 条目的 reserve_date 先到先得
// ==========================================

use crate::domain::types::ReservationStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Reservation - 预约记录（题名级，不绑定具体复本）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub reserve_id: String,                  // 预约ID (UUID)
    pub member_id: String,                   // 预约者ID
    pub isbn: String,                        // 预约题名
    pub reserve_date: DateTime<Utc>,         // 预约时间（FIFO 排序键）
    pub status: ReservationStatus,           // 预约状态
    pub expiry_date: Option<DateTime<Utc>>,  // 保留期截止（仅 Fulfilled 后有值）
}

impl Reservation {
    /// 创建新的 Pending 预约
    pub fn new(member_id: String, isbn: String) -> Self {
        Self {
            reserve_id: uuid::Uuid::new_v4().to_string(),
            member_id,
            isbn,
            reserve_date: Utc::now(),
            status: ReservationStatus::Pending,
            expiry_date: None,
        }
    }
}
