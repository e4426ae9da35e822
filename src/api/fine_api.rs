// ==========================================
// 图书馆流通管理系统 - 罚款 API
// ==========================================
// 职责: 罚款支付/减免的对外入口与罚款读路径
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::fine::{Fine, Payment};
use crate::domain::types::{FineStatus, PaymentMethod};
use crate::engine::fine_ledger::{FineLedger, PaymentOutcome};
use crate::repository::fine_repo::FineRepository;

// ==========================================
// FineApi - 罚款 API
// ==========================================

/// 罚款API
///
/// 职责：
/// 1. 支付/减免（委托罚款台账引擎）
/// 2. 罚款台账与未付总额查询
pub struct FineApi {
    ledger: Arc<FineLedger>,
    fine_repo: Arc<FineRepository>,
}

impl FineApi {
    /// 创建新的FineApi实例
    pub fn new(ledger: Arc<FineLedger>, fine_repo: Arc<FineRepository>) -> Self {
        Self { ledger, fine_repo }
    }

    /// 支付罚款
    ///
    /// # 参数
    /// - fine_id: 罚款ID
    /// - member_id: 支付人（必须是罚款责任人）
    /// - method: 支付方式
    ///
    /// # 返回
    /// - Ok(PaymentOutcome): 支付流水与结清后的罚款
    /// - Err(ApiError): NotFound / Forbidden / BadRequest / Conflict
    pub fn pay(
        &self,
        fine_id: &str,
        member_id: &str,
        method: PaymentMethod,
    ) -> ApiResult<PaymentOutcome> {
        if fine_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("fine_id 不能为空".to_string()));
        }
        self.ledger.pay(fine_id, member_id, method)
    }

    /// 减免罚款（馆员专用）
    pub fn waive(&self, fine_id: &str, staff_id: &str, reason: &str) -> ApiResult<Fine> {
        if reason.trim().is_empty() {
            return Err(ApiError::InvalidInput("减免原因不能为空".to_string()));
        }
        self.ledger.waive(fine_id, staff_id, reason)
    }

    /// 借阅者未付罚款总额
    pub fn total_unpaid(&self, member_id: &str) -> ApiResult<i64> {
        Ok(self.fine_repo.total_unpaid(member_id)?)
    }

    /// 查询借阅者的罚款台账（可按状态过滤）
    pub fn list_fines(
        &self,
        member_id: &str,
        status: Option<FineStatus>,
    ) -> ApiResult<Vec<Fine>> {
        let fines = self.fine_repo.list_for_member(member_id)?;
        Ok(match status {
            Some(status) => fines.into_iter().filter(|f| f.status == status).collect(),
            None => fines,
        })
    }

    /// 查询罚款的支付流水（对账用）
    pub fn list_payments(&self, fine_id: &str) -> ApiResult<Vec<Payment>> {
        Ok(self.fine_repo.list_payments_for_fine(fine_id)?)
    }
}
