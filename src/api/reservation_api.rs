// ==========================================
// 图书馆流通管理系统 - 预约 API
// ==========================================
// 职责: 预约创建/取消的对外入口与队列读路径
// 不变量: list_pending 的顺序就是兑现顺序（reserve_date 先到先得）
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::reservation::Reservation;
use crate::engine::reservation_queue::ReservationQueue;
use crate::repository::reservation_repo::ReservationRepository;

// ==========================================
// ReservationApi - 预约 API
// ==========================================

/// 预约API
///
/// 职责：
/// 1. 创建/取消预约（委托预约队列引擎）
/// 2. 题名队列与个人预约查询
pub struct ReservationApi {
    queue: Arc<ReservationQueue>,
    reservation_repo: Arc<ReservationRepository>,
}

impl ReservationApi {
    /// 创建新的ReservationApi实例
    pub fn new(queue: Arc<ReservationQueue>, reservation_repo: Arc<ReservationRepository>) -> Self {
        Self {
            queue,
            reservation_repo,
        }
    }

    /// 创建预约
    ///
    /// # 参数
    /// - member_id: 预约者ID
    /// - isbn: 题名 ISBN（预约针对题名，不绑定具体复本）
    pub fn create(&self, member_id: &str, isbn: &str) -> ApiResult<Reservation> {
        if isbn.trim().is_empty() {
            return Err(ApiError::InvalidInput("isbn 不能为空".to_string()));
        }
        self.queue.create(member_id, isbn)
    }

    /// 取消预约（仅本人、仅 Pending）
    pub fn cancel(&self, reserve_id: &str, member_id: &str) -> ApiResult<Reservation> {
        if reserve_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("reserve_id 不能为空".to_string()));
        }
        self.queue.cancel(reserve_id, member_id)
    }

    /// 查询题名下的排队队列（兑现顺序）
    pub fn list_pending(&self, isbn: &str) -> ApiResult<Vec<Reservation>> {
        Ok(self.reservation_repo.list_pending(isbn)?)
    }

    /// 查询借阅者的全部预约
    pub fn list_for_member(&self, member_id: &str) -> ApiResult<Vec<Reservation>> {
        Ok(self.reservation_repo.list_for_member(member_id)?)
    }
}
