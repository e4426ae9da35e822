// ==========================================
// 图书馆流通管理系统 - 书目/复本领域模型
// ==========================================
// 说明: Book 是题名级目录条目，BookCopy 是条码级物理复本
// 不变量: 任意时刻一个复本至多被一条 Active 借阅引用；
//         复本 status = Loaned 当且仅当该借阅存在
// ==========================================

use crate::domain::types::CopyStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Book - 书目（题名）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub isbn: String,                // ISBN (主键)
    pub title: String,               // 题名
    pub author: String,              // 作者
    pub publisher: Option<String>,   // 出版社
    pub published_year: Option<i32>, // 出版年份
}

// ==========================================
// BookCopy - 馆藏复本
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookCopy {
    pub barcode: String,                   // 条码 (主键)
    pub isbn: String,                      // 所属题名
    pub status: CopyStatus,                // 复本状态
    pub condition: String,                 // 品相描述
    pub acquired_at: Option<DateTime<Utc>>, // 入藏时间
}

impl BookCopy {
    /// 复本当前是否可借出
    pub fn is_lendable(&self) -> bool {
        self.status == CopyStatus::Available
    }
}
