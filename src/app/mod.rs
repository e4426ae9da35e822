// ==========================================
// 图书馆流通管理系统 - 应用层
// ==========================================
// 职责: 组装仓储/引擎/API，提供共享应用状态
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
