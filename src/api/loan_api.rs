// ==========================================
// 图书馆流通管理系统 - 借阅 API
// ==========================================
// 职责: 借出/归还/续借的对外入口与借阅读路径
// 说明: 写操作全部委托借阅引擎；本层只做参数整形与读查询
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::loan::{Loan, LoanDetail};
use crate::domain::types::LoanStatus;
use crate::engine::loan_engine::{CheckinOutcome, LoanEngine};
use crate::repository::loan_repo::LoanRepository;

// ==========================================
// LoanApi - 借阅 API
// ==========================================

/// 借阅API
///
/// 职责：
/// 1. 借出/归还/续借（委托引擎）
/// 2. 在借/历史/全量台账查询
pub struct LoanApi {
    engine: Arc<LoanEngine>,
    loan_repo: Arc<LoanRepository>,
}

impl LoanApi {
    /// 创建新的LoanApi实例
    pub fn new(engine: Arc<LoanEngine>, loan_repo: Arc<LoanRepository>) -> Self {
        Self { engine, loan_repo }
    }

    /// 借出
    ///
    /// # 参数
    /// - member_username: 借阅者登录名
    /// - barcode: 复本条码
    /// - staff_id: 办理馆员ID
    ///
    /// # 返回
    /// - Ok(LoanDetail): 新建借阅（联借阅者/题名）
    /// - Err(ApiError): NotFound / BadRequest / Forbidden / Conflict
    pub fn checkout(
        &self,
        member_username: &str,
        barcode: &str,
        staff_id: &str,
    ) -> ApiResult<LoanDetail> {
        if member_username.trim().is_empty() || barcode.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "member_username 与 barcode 不能为空".to_string(),
            ));
        }
        self.engine.checkout(member_username, barcode, staff_id)
    }

    /// 归还
    pub fn checkin(&self, loan_id: &str, staff_id: &str) -> ApiResult<CheckinOutcome> {
        if loan_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("loan_id 不能为空".to_string()));
        }
        self.engine.checkin(loan_id, staff_id)
    }

    /// 续借
    pub fn renew(&self, loan_id: &str, member_id: &str) -> ApiResult<Loan> {
        if loan_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("loan_id 不能为空".to_string()));
        }
        self.engine.renew(loan_id, member_id)
    }

    /// 查询借阅者的在借记录
    pub fn list_active_loans(&self, member_id: &str) -> ApiResult<Vec<LoanDetail>> {
        Ok(self.loan_repo.list_active_for(member_id)?)
    }

    /// 查询借阅者的归还历史（最近归还在前）
    pub fn list_history(&self, member_id: &str) -> ApiResult<Vec<LoanDetail>> {
        Ok(self.loan_repo.list_history_for(member_id)?)
    }

    /// 查询全量借阅台账（可按状态过滤，管理端用）
    pub fn list_all_loans(&self, status: Option<LoanStatus>) -> ApiResult<Vec<LoanDetail>> {
        Ok(self.loan_repo.list_all(status)?)
    }
}
