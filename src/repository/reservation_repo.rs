// ==========================================
// 图书馆流通管理系统 - 预约仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// 红线: Pending → Fulfilled 必须走 fulfill_earliest_tx
//       （条件更新认领，不允许先读后写）
// ==========================================

use crate::domain::reservation::Reservation;
use crate::domain::types::ReservationStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// ReservationRepository - 预约仓储
// ==========================================
pub struct ReservationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReservationRepository {
    /// 创建新的预约仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入预约记录（事务内版本）
    pub fn insert_tx(conn: &Connection, reservation: &Reservation) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO reservation (
                reserve_id, member_id, isbn, reserve_date, status, expiry_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                reservation.reserve_id,
                reservation.member_id,
                reservation.isbn,
                reservation.reserve_date,
                reservation.status.to_db_str(),
                reservation.expiry_date,
            ],
        )?;
        Ok(())
    }

    /// 按 ID 查询预约（事务内版本）
    pub fn find_by_id_tx(
        conn: &Connection,
        reserve_id: &str,
    ) -> RepositoryResult<Option<Reservation>> {
        let result = conn
            .query_row(
                r#"
                SELECT reserve_id, member_id, isbn, reserve_date, status, expiry_date
                FROM reservation
                WHERE reserve_id = ?1
                "#,
                params![reserve_id],
                Self::map_row_to_reservation,
            )
            .optional()?;
        Ok(result)
    }

    /// 按 ID 查询预约
    pub fn find_by_id(&self, reserve_id: &str) -> RepositoryResult<Option<Reservation>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, reserve_id)
    }

    /// 题名下是否存在 Pending 预约（事务内版本，续借拦截用）
    pub fn has_pending_tx(conn: &Connection, isbn: &str) -> RepositoryResult<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM reservation WHERE isbn = ?1 AND status = 'Pending'",
            params![isbn],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// 兑现题名下最早的 Pending 预约（事务内版本，归还路径专用）
    ///
    /// 并发控制点: 先选出 reserve_date 最早的 Pending 条目，再以
    /// 条件更新认领；认领失败（他方已兑现/已取消）则重选重试。
    ///
    /// # 返回
    /// - Ok(Some(reservation)): 兑现成功，返回兑现后的预约
    /// - Ok(None): 题名下无 Pending 预约
    pub fn fulfill_earliest_tx(
        conn: &Connection,
        isbn: &str,
        expiry_date: DateTime<Utc>,
    ) -> RepositoryResult<Option<Reservation>> {
        loop {
            let candidate: Option<String> = conn
                .query_row(
                    r#"
                    SELECT reserve_id FROM reservation
                    WHERE isbn = ?1 AND status = 'Pending'
                    ORDER BY reserve_date ASC, reserve_id ASC
                    LIMIT 1
                    "#,
                    params![isbn],
                    |row| row.get(0),
                )
                .optional()?;

            let reserve_id = match candidate {
                Some(id) => id,
                None => return Ok(None),
            };

            let rows = conn.execute(
                r#"
                UPDATE reservation
                SET status = 'Fulfilled', expiry_date = ?2
                WHERE reserve_id = ?1 AND status = 'Pending'
                "#,
                params![reserve_id, expiry_date],
            )?;

            if rows == 1 {
                let fulfilled = Self::find_by_id_tx(conn, &reserve_id)?;
                return fulfilled.map(Some).ok_or_else(|| RepositoryError::NotFound {
                    entity: "Reservation".to_string(),
                    id: reserve_id,
                });
            }
            // 认领失败: 候选已被他方流转，重选
        }
    }

    /// 取消预约: Pending → Cancelled（事务内版本）
    ///
    /// 条件更新，影响 0 行说明预约已非 Pending。
    pub fn mark_cancelled_tx(conn: &Connection, reserve_id: &str) -> RepositoryResult<bool> {
        let rows = conn.execute(
            "UPDATE reservation SET status = 'Cancelled' WHERE reserve_id = ?1 AND status = 'Pending'",
            params![reserve_id],
        )?;
        Ok(rows == 1)
    }

    /// 查询题名下的 Pending 队列（reserve_date 升序，队列展示用）
    pub fn list_pending(&self, isbn: &str) -> RepositoryResult<Vec<Reservation>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT reserve_id, member_id, isbn, reserve_date, status, expiry_date
            FROM reservation
            WHERE isbn = ?1 AND status = 'Pending'
            ORDER BY reserve_date ASC, reserve_id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![isbn], Self::map_row_to_reservation)?;
        Ok(rows.collect::<SqliteResult<Vec<_>>>()?)
    }

    /// 查询借阅者的全部预约（reserve_date 倒序）
    pub fn list_for_member(&self, member_id: &str) -> RepositoryResult<Vec<Reservation>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT reserve_id, member_id, isbn, reserve_date, status, expiry_date
            FROM reservation
            WHERE member_id = ?1
            ORDER BY reserve_date DESC
            "#,
        )?;
        let rows = stmt.query_map(params![member_id], Self::map_row_to_reservation)?;
        Ok(rows.collect::<SqliteResult<Vec<_>>>()?)
    }

    /// 辅助方法：将数据库行映射为 Reservation
    fn map_row_to_reservation(row: &rusqlite::Row) -> SqliteResult<Reservation> {
        Ok(Reservation {
            reserve_id: row.get(0)?,
            member_id: row.get(1)?,
            isbn: row.get(2)?,
            reserve_date: row.get(3)?,
            status: ReservationStatus::from_db_str(&row.get::<_, String>(4)?),
            expiry_date: row.get(5)?,
        })
    }
}
