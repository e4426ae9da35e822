// ==========================================
// 图书馆流通管理系统 - 借阅策略 API
// ==========================================
// 职责: 策略查询与更新（管理端）
// 红线: 策略修改只影响后续事务，不回溯已生效的借阅
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::config::policy_store::{PolicyEntry, PolicyStore};
use crate::domain::audit_log::AuditAction;
use crate::engine::sinks::AuditSink;
use crate::repository::member_repo::LibrarianRepository;
use tracing::{info, warn};

// ==========================================
// PolicyApi - 借阅策略 API
// ==========================================

/// 借阅策略API
///
/// 职责：
/// 1. 策略查询（全部、单个）
/// 2. 策略更新（馆员专用，带审计）
pub struct PolicyApi {
    store: Arc<PolicyStore>,
    librarian_repo: Arc<LibrarianRepository>,
    audit: Arc<dyn AuditSink>,
}

impl PolicyApi {
    /// 创建新的PolicyApi实例
    pub fn new(
        store: Arc<PolicyStore>,
        librarian_repo: Arc<LibrarianRepository>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            librarian_repo,
            audit,
        }
    }

    /// 查询单个策略值
    pub fn get(&self, key: &str) -> ApiResult<String> {
        Ok(self.store.get(key)?)
    }

    /// 查询所有策略条目
    pub fn list(&self) -> ApiResult<Vec<PolicyEntry>> {
        Ok(self.store.list()?)
    }

    /// 更新策略值（馆员专用）
    ///
    /// # 参数
    /// - key: 策略键（只更新已播种的键，未知键返回 NotFound）
    /// - value: 策略值（全部策略为整数值）
    /// - staff_id: 操作馆员ID
    pub fn set(&self, key: &str, value: &str, staff_id: &str) -> ApiResult<()> {
        self.librarian_repo
            .find_by_id(staff_id)?
            .ok_or_else(|| ApiError::Forbidden("仅馆员可修改借阅策略".to_string()))?;

        if value.trim().parse::<i64>().is_err() {
            return Err(ApiError::InvalidInput(format!(
                "策略值必须为整数: key={}, value={}",
                key, value
            )));
        }

        self.store.set(key, value)?;

        info!(key = %key, value = %value, staff_id = %staff_id, "借阅策略已更新");
        if let Err(e) = self.audit.record(
            staff_id,
            AuditAction::UpdatePolicy,
            "Policy",
            key,
            serde_json::json!({ "key": key, "value": value }),
        ) {
            warn!(key = %key, error = %e, "审计写入失败（不影响主操作）");
        }

        Ok(())
    }
}
