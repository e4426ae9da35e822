// ==========================================
// 图书馆流通管理系统 - 预约队列引擎
// ==========================================
// 职责: 预约创建/取消的事务编排
// 红线: 兑现只发生在归还路径（借阅引擎调用 fulfill_earliest_tx），
//       本引擎不触碰任何复本状态
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::audit_log::AuditAction;
use crate::domain::reservation::Reservation;
use crate::domain::types::ReservationStatus;
use crate::engine::sinks::AuditSink;
use crate::repository::book_repo::BookRepository;
use crate::repository::error::RepositoryError;
use crate::repository::member_repo::MemberRepository;
use crate::repository::reservation_repo::ReservationRepository;
use rusqlite::{Connection, TransactionBehavior};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

// ==========================================
// ReservationQueue - 预约队列引擎
// ==========================================
pub struct ReservationQueue {
    conn: Arc<Mutex<Connection>>,
    audit: Arc<dyn AuditSink>,
}

impl ReservationQueue {
    /// 创建新的预约队列引擎
    pub fn new(conn: Arc<Mutex<Connection>>, audit: Arc<dyn AuditSink>) -> Self {
        Self { conn, audit }
    }

    fn get_conn(&self) -> ApiResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::from(RepositoryError::LockError(e.to_string())))
    }

    /// 创建预约（题名级，按 reserve_date 先到先得）
    pub fn create(&self, member_id: &str, isbn: &str) -> ApiResult<Reservation> {
        let reservation = {
            let mut conn = self.get_conn()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            // 1. 借阅者与题名校验
            MemberRepository::find_by_id_tx(&tx, member_id)?
                .ok_or_else(|| ApiError::NotFound(format!("借阅者(id={})不存在", member_id)))?;
            BookRepository::find_by_isbn_tx(&tx, isbn)?
                .ok_or_else(|| ApiError::NotFound(format!("题名(isbn={})不存在", isbn)))?;

            // 2. 入队 Pending
            let reservation = Reservation::new(member_id.to_string(), isbn.to_string());
            ReservationRepository::insert_tx(&tx, &reservation)?;

            tx.commit()?;
            reservation
        };

        info!(
            reserve_id = %reservation.reserve_id,
            isbn = %isbn,
            member_id = %member_id,
            "预约创建完成"
        );
        if let Err(e) = self.audit.record(
            member_id,
            AuditAction::CreateReservation,
            "Reservation",
            &reservation.reserve_id,
            json!({ "isbn": isbn }),
        ) {
            warn!(reserve_id = %reservation.reserve_id, error = %e, "审计写入失败（不影响主操作）");
        }

        Ok(reservation)
    }

    /// 取消预约（仅 Pending，仅本人）
    pub fn cancel(&self, reserve_id: &str, member_id: &str) -> ApiResult<Reservation> {
        let cancelled = {
            let mut conn = self.get_conn()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            // 1. 预约与归属校验
            let reservation = ReservationRepository::find_by_id_tx(&tx, reserve_id)?
                .ok_or_else(|| ApiError::NotFound(format!("预约(id={})不存在", reserve_id)))?;
            if reservation.member_id != member_id {
                return Err(ApiError::Forbidden("仅预约者本人可取消".to_string()));
            }
            if reservation.status != ReservationStatus::Pending {
                return Err(ApiError::BadRequest(format!(
                    "预约(id={})当前不可取消(status={})",
                    reserve_id, reservation.status
                )));
            }

            // 2. 条件流转 Pending → Cancelled
            if !ReservationRepository::mark_cancelled_tx(&tx, reserve_id)? {
                return Err(ApiError::Conflict(format!(
                    "预约(id={})已被并发流转",
                    reserve_id
                )));
            }

            let cancelled =
                ReservationRepository::find_by_id_tx(&tx, reserve_id)?.ok_or_else(|| {
                    ApiError::InternalError(format!("预约(id={})取消后读取失败", reserve_id))
                })?;

            tx.commit()?;
            cancelled
        };

        info!(reserve_id = %reserve_id, member_id = %member_id, "预约取消完成");
        if let Err(e) = self.audit.record(
            member_id,
            AuditAction::CancelReservation,
            "Reservation",
            reserve_id,
            json!({ "isbn": cancelled.isbn }),
        ) {
            warn!(reserve_id = %reserve_id, error = %e, "审计写入失败（不影响主操作）");
        }

        Ok(cancelled)
    }
}
