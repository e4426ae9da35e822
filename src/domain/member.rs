// ==========================================
// 图书馆流通管理系统 - 用户领域模型
// ==========================================
// 说明: 借阅者(Member)与馆员(Librarian)共用 user_account 账户表；
//       馆员记录的存在即流通操作权限（角色判定交由主体解析）
// ==========================================

use crate::domain::types::AccountStatus;
use serde::{Deserialize, Serialize};

// ==========================================
// Member - 借阅者
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub member_id: String,             // 借阅者ID (= user_account.user_id)
    pub username: String,              // 登录名（柜台扫码/输入的标识）
    pub first_name: String,            // 名
    pub last_name: String,             // 姓
    pub account_status: AccountStatus, // 账户状态（非 Active 禁止借出）
    pub member_type: String,           // 借阅者类别 (Student/Faculty/...)
    pub borrowing_limit: i32,          // 在借上限
}

impl Member {
    /// 借阅者姓名（用于借阅详情展示）
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ==========================================
// Librarian - 馆员
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Librarian {
    pub librarian_id: String,       // 馆员ID (= user_account.user_id)
    pub username: String,           // 登录名
    pub employee_no: Option<String>, // 工号
}
