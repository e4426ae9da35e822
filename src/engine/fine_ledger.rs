// ==========================================
// 图书馆流通管理系统 - 罚款台账引擎
// ==========================================
// 职责: 罚款结清（支付/减免）的事务编排
// 红线: Unpaid → Paid/Waived 走条件更新，支付流水与流转同事务落库
// 红线: 网关扣款在流转之前发起；流转失败则整个事务回滚
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::audit_log::AuditAction;
use crate::domain::fine::{Fine, Payment};
use crate::domain::types::{FineStatus, PaymentMethod};
use crate::engine::sinks::{AuditSink, PaymentGateway};
use crate::repository::error::RepositoryError;
use crate::repository::fine_repo::FineRepository;
use crate::repository::member_repo::LibrarianRepository;
use chrono::Utc;
use rusqlite::{Connection, TransactionBehavior};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// 支付结果（流水 + 结清后的罚款）
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    pub payment: Payment,
    pub fine: Fine,
}

// ==========================================
// FineLedger - 罚款台账引擎
// ==========================================
pub struct FineLedger {
    conn: Arc<Mutex<Connection>>,
    audit: Arc<dyn AuditSink>,
    gateway: Arc<dyn PaymentGateway>,
}

impl FineLedger {
    /// 创建新的罚款台账引擎
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        audit: Arc<dyn AuditSink>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            conn,
            audit,
            gateway,
        }
    }

    fn get_conn(&self) -> ApiResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::from(RepositoryError::LockError(e.to_string())))
    }

    /// 支付罚款
    ///
    /// # 参数
    /// - fine_id: 罚款ID
    /// - member_id: 支付人（必须是罚款责任人）
    /// - method: 支付方式
    pub fn pay(
        &self,
        fine_id: &str,
        member_id: &str,
        method: PaymentMethod,
    ) -> ApiResult<PaymentOutcome> {
        let outcome = {
            let mut conn = self.get_conn()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            // 1. 罚款与归属校验
            let fine = FineRepository::find_by_id_tx(&tx, fine_id)?
                .ok_or_else(|| ApiError::NotFound(format!("罚款(id={})不存在", fine_id)))?;
            if fine.member_id != member_id {
                return Err(ApiError::Forbidden("仅罚款责任人可支付".to_string()));
            }
            if fine.status != FineStatus::Unpaid {
                return Err(ApiError::BadRequest(format!(
                    "罚款(id={})已结清(status={})",
                    fine_id, fine.status
                )));
            }

            // 2. 网关扣款（桩实现恒成功）
            let txn_ref = self.gateway.charge(member_id, fine.amount, method)?;

            // 3. 条件流转 Unpaid → Paid（并发重复支付的唯一裁决点）
            let now = Utc::now();
            if !FineRepository::mark_paid_tx(&tx, fine_id, now)? {
                return Err(ApiError::Conflict(format!(
                    "罚款(id={})已被并发结清",
                    fine_id
                )));
            }

            // 4. 支付流水同事务落库
            let payment = Payment {
                payment_id: uuid::Uuid::new_v4().to_string(),
                fine_id: fine_id.to_string(),
                member_id: member_id.to_string(),
                amount: fine.amount,
                method,
                transaction_ref: txn_ref,
                created_at: now,
            };
            FineRepository::insert_payment_tx(&tx, &payment)?;

            let paid = FineRepository::find_by_id_tx(&tx, fine_id)?.ok_or_else(|| {
                ApiError::InternalError(format!("罚款(id={})结清后读取失败", fine_id))
            })?;

            tx.commit()?;
            PaymentOutcome {
                payment,
                fine: paid,
            }
        };

        info!(
            fine_id = %fine_id,
            amount = outcome.payment.amount,
            transaction_ref = %outcome.payment.transaction_ref,
            "罚款支付完成"
        );
        if let Err(e) = self.audit.record(
            member_id,
            AuditAction::PayFine,
            "Fine",
            fine_id,
            json!({
                "amount": outcome.payment.amount,
                "method": outcome.payment.method.to_string(),
                "transaction_ref": outcome.payment.transaction_ref,
            }),
        ) {
            warn!(fine_id = %fine_id, error = %e, "审计写入失败（不影响主操作）");
        }

        Ok(outcome)
    }

    /// 减免罚款（馆员专用，无归属校验）
    pub fn waive(&self, fine_id: &str, staff_id: &str, reason: &str) -> ApiResult<Fine> {
        let waived = {
            let mut conn = self.get_conn()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            // 1. 馆员主体校验
            LibrarianRepository::find_by_id_tx(&tx, staff_id)?
                .ok_or_else(|| ApiError::Forbidden("仅馆员可减免罚款".to_string()))?;

            // 2. 罚款校验
            let fine = FineRepository::find_by_id_tx(&tx, fine_id)?
                .ok_or_else(|| ApiError::NotFound(format!("罚款(id={})不存在", fine_id)))?;
            if fine.status != FineStatus::Unpaid {
                return Err(ApiError::BadRequest(format!(
                    "罚款(id={})已结清(status={})",
                    fine_id, fine.status
                )));
            }

            // 3. 条件流转 Unpaid → Waived
            let now = Utc::now();
            if !FineRepository::mark_waived_tx(&tx, fine_id, staff_id, now, reason)? {
                return Err(ApiError::Conflict(format!(
                    "罚款(id={})已被并发结清",
                    fine_id
                )));
            }

            let waived = FineRepository::find_by_id_tx(&tx, fine_id)?.ok_or_else(|| {
                ApiError::InternalError(format!("罚款(id={})减免后读取失败", fine_id))
            })?;

            tx.commit()?;
            waived
        };

        info!(fine_id = %fine_id, staff_id = %staff_id, "罚款减免完成");
        if let Err(e) = self.audit.record(
            staff_id,
            AuditAction::WaiveFine,
            "Fine",
            fine_id,
            json!({ "amount": waived.amount, "reason": reason }),
        ) {
            warn!(fine_id = %fine_id, error = %e, "审计写入失败（不影响主操作）");
        }

        Ok(waived)
    }
}
