// ==========================================
// 图书馆流通管理系统 - 借阅引擎
// ==========================================
// 职责: 借出/归还/续借三个状态机操作的事务编排
// 红线: 每个操作是一个 BEGIN IMMEDIATE 事务，任一步失败全部回滚
// 红线: 复本认领/预约兑现必须走条件更新原语，禁止先读后写
// 红线: 策略值在操作事务内即时读取，不做进程内缓存
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::policy_store::{policy_keys, PolicyStore};
use crate::domain::audit_log::AuditAction;
use crate::domain::fine::Fine;
use crate::domain::loan::{Loan, LoanDetail};
use crate::domain::reservation::Reservation;
use crate::domain::types::{AccountStatus, CopyStatus, LoanStatus};
use crate::engine::sinks::{AuditSink, NotificationSink};
use crate::repository::book_repo::{BookCopyRepository, BookRepository};
use crate::repository::error::RepositoryError;
use crate::repository::fine_repo::FineRepository;
use crate::repository::loan_repo::LoanRepository;
use crate::repository::member_repo::{LibrarianRepository, MemberRepository};
use crate::repository::reservation_repo::ReservationRepository;
use chrono::{Duration, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// 归还结果
///
/// - fine: 逾期时产生的罚款（未逾期为 None）
/// - reservation: 本次归还兑现的预约（队列为空时为 None）
#[derive(Debug, Clone)]
pub struct CheckinOutcome {
    pub loan: Loan,
    pub fine: Option<Fine>,
    pub reservation: Option<Reservation>,
}

// ==========================================
// LoanEngine - 借阅引擎
// ==========================================
pub struct LoanEngine {
    conn: Arc<Mutex<Connection>>,
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn NotificationSink>,
}

impl LoanEngine {
    /// 创建新的借阅引擎
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        audit: Arc<dyn AuditSink>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            conn,
            audit,
            notifier,
        }
    }

    fn get_conn(&self) -> ApiResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::from(RepositoryError::LockError(e.to_string())))
    }

    /// 借出
    ///
    /// 事务内顺序: 馆员校验 → 借阅者校验 → 上限校验 → 读策略 →
    /// 条件认领复本 → 写入借阅。提交后补记审计。
    ///
    /// # 参数
    /// - member_username: 借阅者登录名（柜台扫证场景）
    /// - barcode: 复本条码
    /// - staff_id: 办理馆员ID
    pub fn checkout(
        &self,
        member_username: &str,
        barcode: &str,
        staff_id: &str,
    ) -> ApiResult<LoanDetail> {
        let detail = {
            let mut conn = self.get_conn()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            // 1. 馆员主体校验
            LibrarianRepository::find_by_id_tx(&tx, staff_id)?
                .ok_or_else(|| ApiError::Forbidden("仅馆员可办理借出".to_string()))?;

            // 2. 借阅者校验
            let member = MemberRepository::find_by_username_tx(&tx, member_username)?
                .ok_or_else(|| {
                    ApiError::NotFound(format!("借阅者(username={})不存在", member_username))
                })?;
            if member.account_status != AccountStatus::Active {
                return Err(ApiError::BadRequest(format!(
                    "账户状态为{}，不可借出",
                    member.account_status
                )));
            }

            // 3. 借出上限校验
            let active = LoanRepository::count_active_tx(&tx, &member.member_id)?;
            if active >= i64::from(member.borrowing_limit) {
                return Err(ApiError::BadRequest(format!(
                    "已达借阅上限({})",
                    member.borrowing_limit
                )));
            }

            // 4. 事务快照内读取借阅周期
            let loan_period = PolicyStore::get_number_tx(&tx, policy_keys::LOAN_PERIOD_DAYS)?;

            // 5. 条件认领复本（并发借出的唯一裁决点）
            // 认领失败统一视为冲突，条码不存在与非 Available 同等对待；
            // 失败后回读仅用于丰富错误消息
            if !BookCopyRepository::claim_available_tx(&tx, barcode)? {
                let status = BookCopyRepository::find_by_barcode_tx(&tx, barcode)?
                    .map(|c| c.status.to_string())
                    .unwrap_or_else(|| "不存在".to_string());
                return Err(ApiError::Conflict(format!(
                    "复本(barcode={})当前不可借({})",
                    barcode, status
                )));
            }

            // 6. 写入借阅记录
            let now = Utc::now();
            let loan = Loan {
                loan_id: uuid::Uuid::new_v4().to_string(),
                barcode: barcode.to_string(),
                member_id: member.member_id.clone(),
                issue_date: now,
                due_date: now + Duration::days(loan_period),
                return_date: None,
                status: LoanStatus::Active,
                renewal_count: 0,
                issued_by: staff_id.to_string(),
                returned_to: None,
            };
            LoanRepository::insert_tx(&tx, &loan)?;

            let detail = LoanRepository::find_detail_tx(&tx, &loan.loan_id)?;
            tx.commit()?;
            detail
        };

        info!(
            loan_id = %detail.loan.loan_id,
            barcode = %detail.loan.barcode,
            member_id = %detail.loan.member_id,
            "借出完成"
        );
        self.record_audit(
            staff_id,
            AuditAction::Checkout,
            "Loan",
            &detail.loan.loan_id,
            json!({
                "barcode": detail.loan.barcode,
                "member_id": detail.loan.member_id,
                "due_date": detail.loan.due_date,
            }),
        );

        Ok(detail)
    }

    /// 归还
    ///
    /// 事务内顺序: 馆员校验 → 借阅流转 Returned → 逾期罚款 →
    /// 兑现最早预约（有则复本转 Reserved，否则转 Available）。
    /// 提交后补记审计，兑现成功另发取书通知。
    pub fn checkin(&self, loan_id: &str, staff_id: &str) -> ApiResult<CheckinOutcome> {
        let (outcome, notify) = {
            let mut conn = self.get_conn()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            // 1. 馆员主体校验
            LibrarianRepository::find_by_id_tx(&tx, staff_id)?
                .ok_or_else(|| ApiError::Forbidden("仅馆员可办理归还".to_string()))?;

            // 2. 借阅校验
            let loan = LoanRepository::find_by_id_tx(&tx, loan_id)?
                .ok_or_else(|| ApiError::NotFound(format!("借阅(id={})不存在", loan_id)))?;
            if loan.status != LoanStatus::Active {
                return Err(ApiError::BadRequest(format!(
                    "借阅(id={})已归还",
                    loan_id
                )));
            }

            // 3. 借阅流转 Returned
            let now = Utc::now();
            if !LoanRepository::mark_returned_tx(&tx, loan_id, now, staff_id)? {
                return Err(ApiError::Conflict(format!(
                    "借阅(id={})状态已变更",
                    loan_id
                )));
            }

            // 4. 逾期罚款（自然日向下取整，不足一天不计）
            let overdue_days = loan.overdue_days(now);
            let fine = if overdue_days > 0 {
                let rate = PolicyStore::get_number_tx(&tx, policy_keys::FINE_RATE_PER_DAY)?;
                let fine = Fine::overdue(
                    loan.loan_id.clone(),
                    loan.member_id.clone(),
                    overdue_days,
                    rate,
                );
                FineRepository::insert_tx(&tx, &fine)?;
                Some(fine)
            } else {
                None
            };

            // 5. 兑现题名下最早的 Pending 预约
            let copy = BookCopyRepository::find_by_barcode_tx(&tx, &loan.barcode)?
                .ok_or_else(|| {
                    ApiError::InternalError(format!("复本(barcode={})记录缺失", loan.barcode))
                })?;
            let hold_days = PolicyStore::get_number_tx(&tx, policy_keys::RESERVATION_HOLD_DAYS)?;
            let expiry = now + Duration::days(hold_days);
            let reservation = ReservationRepository::fulfill_earliest_tx(&tx, &copy.isbn, expiry)?;

            let notify = match &reservation {
                Some(reservation) => {
                    BookCopyRepository::set_status_tx(&tx, &loan.barcode, CopyStatus::Reserved)?;
                    let book = BookRepository::find_by_isbn_tx(&tx, &copy.isbn)?;
                    let title = book.map(|b| b.title).unwrap_or_else(|| copy.isbn.clone());
                    Some((
                        reservation.member_id.clone(),
                        format!(
                            "您预约的《{}》已到馆，请在 {} 前取书",
                            title,
                            expiry.format("%Y-%m-%d")
                        ),
                    ))
                }
                None => {
                    BookCopyRepository::set_status_tx(&tx, &loan.barcode, CopyStatus::Available)?;
                    None
                }
            };

            let returned = LoanRepository::find_by_id_tx(&tx, loan_id)?.ok_or_else(|| {
                ApiError::InternalError(format!("借阅(id={})归还后读取失败", loan_id))
            })?;

            tx.commit()?;
            (
                CheckinOutcome {
                    loan: returned,
                    fine,
                    reservation,
                },
                notify,
            )
        };

        info!(
            loan_id = %loan_id,
            fined = outcome.fine.is_some(),
            fulfilled = outcome.reservation.is_some(),
            "归还完成"
        );
        self.record_audit(
            staff_id,
            AuditAction::Checkin,
            "Loan",
            loan_id,
            json!({
                "barcode": outcome.loan.barcode,
                "fine_amount": outcome.fine.as_ref().map(|f| f.amount),
                "fulfilled_reserve_id": outcome.reservation.as_ref().map(|r| &r.reserve_id),
            }),
        );
        if let Some((recipient, content)) = notify {
            if let Err(e) = self.notifier.enqueue(&recipient, "ReservationReady", &content) {
                warn!(recipient = %recipient, error = %e, "取书通知入队失败（不影响归还）");
            }
        }

        Ok(outcome)
    }

    /// 续借
    ///
    /// 事务内顺序: 借阅与归属校验 → 次数上限 → 题名无 Pending 预约 →
    /// 未付罚款不超阈值 → 应还时间自原 due_date 顺延。
    pub fn renew(&self, loan_id: &str, member_id: &str) -> ApiResult<Loan> {
        let renewed = {
            let mut conn = self.get_conn()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            // 1. 借阅与归属校验
            let loan = LoanRepository::find_by_id_tx(&tx, loan_id)?
                .ok_or_else(|| ApiError::NotFound(format!("借阅(id={})不存在", loan_id)))?;
            if loan.status != LoanStatus::Active {
                return Err(ApiError::BadRequest(format!(
                    "借阅(id={})已归还，不可续借",
                    loan_id
                )));
            }
            if loan.member_id != member_id {
                return Err(ApiError::Forbidden("仅借阅者本人可续借".to_string()));
            }

            // 2. 续借次数上限
            let max_renewals = PolicyStore::get_number_tx(&tx, policy_keys::MAX_RENEWALS)?;
            if i64::from(loan.renewal_count) >= max_renewals {
                return Err(ApiError::BadRequest(format!(
                    "已达最大续借次数({})",
                    max_renewals
                )));
            }

            // 3. 题名下存在排队预约则不可续借
            let copy = BookCopyRepository::find_by_barcode_tx(&tx, &loan.barcode)?
                .ok_or_else(|| {
                    ApiError::InternalError(format!("复本(barcode={})记录缺失", loan.barcode))
                })?;
            if ReservationRepository::has_pending_tx(&tx, &copy.isbn)? {
                return Err(ApiError::BadRequest(
                    "该题名已有读者排队预约，不可续借".to_string(),
                ));
            }

            // 4. 未付罚款阈值（严格大于才拦截）
            let threshold = PolicyStore::get_number_tx(&tx, policy_keys::FINE_BLOCK_THRESHOLD)?;
            let unpaid = FineRepository::total_unpaid_tx(&tx, member_id)?;
            if unpaid > threshold {
                return Err(ApiError::BadRequest(format!(
                    "未付罚款({})超过阈值({})，请先结清",
                    unpaid, threshold
                )));
            }

            // 5. 自原应还时间顺延
            let loan_period = PolicyStore::get_number_tx(&tx, policy_keys::LOAN_PERIOD_DAYS)?;
            let new_due = loan.due_date + Duration::days(loan_period);
            if !LoanRepository::apply_renewal_tx(&tx, loan_id, new_due)? {
                return Err(ApiError::Conflict(format!(
                    "借阅(id={})状态已变更",
                    loan_id
                )));
            }

            let renewed = LoanRepository::find_by_id_tx(&tx, loan_id)?.ok_or_else(|| {
                ApiError::InternalError(format!("借阅(id={})续借后读取失败", loan_id))
            })?;

            tx.commit()?;
            renewed
        };

        info!(
            loan_id = %loan_id,
            renewal_count = renewed.renewal_count,
            due_date = %renewed.due_date,
            "续借完成"
        );
        self.record_audit(
            member_id,
            AuditAction::Renew,
            "Loan",
            loan_id,
            json!({
                "renewal_count": renewed.renewal_count,
                "due_date": renewed.due_date,
            }),
        );

        Ok(renewed)
    }

    /// 提交后补记审计（尽力而为）
    fn record_audit(
        &self,
        actor_id: &str,
        action: AuditAction,
        entity_type: &str,
        entity_id: &str,
        detail: serde_json::Value,
    ) {
        if let Err(e) = self.audit.record(actor_id, action, entity_type, entity_id, detail) {
            warn!(
                actor_id = %actor_id,
                action = %action.as_str(),
                entity_id = %entity_id,
                error = %e,
                "审计写入失败（不影响主操作）"
            );
        }
    }
}
