// ==========================================
// 图书馆流通管理系统 - 配置层
// ==========================================
// 职责: 借阅策略的持久化读写
// ==========================================

pub mod policy_store;

pub use policy_store::{policy_keys, PolicyEntry, PolicyStore};
