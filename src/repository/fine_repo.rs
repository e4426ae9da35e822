// ==========================================
// 图书馆流通管理系统 - 罚款/支付仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// 红线: Unpaid → Paid / Unpaid → Waived 必须走条件更新，
//       两个并发结清争抢同一罚款时至多一方成功
// ==========================================

use crate::domain::fine::{Fine, Payment};
use crate::domain::types::{FineStatus, PaymentMethod};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// FineRepository - 罚款仓储
// ==========================================
pub struct FineRepository {
    conn: Arc<Mutex<Connection>>,
}

impl FineRepository {
    /// 创建新的罚款仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入罚款记录（事务内版本，归还路径专用）
    pub fn insert_tx(conn: &Connection, fine: &Fine) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO fine (
                fine_id, loan_id, member_id, amount, reason, status,
                created_at, paid_at, waived_by, waived_at, waive_reason
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                fine.fine_id,
                fine.loan_id,
                fine.member_id,
                fine.amount,
                fine.reason,
                fine.status.to_db_str(),
                fine.created_at,
                fine.paid_at,
                fine.waived_by,
                fine.waived_at,
                fine.waive_reason,
            ],
        )?;
        Ok(())
    }

    /// 按 ID 查询罚款（事务内版本）
    pub fn find_by_id_tx(conn: &Connection, fine_id: &str) -> RepositoryResult<Option<Fine>> {
        let result = conn
            .query_row(
                r#"
                SELECT fine_id, loan_id, member_id, amount, reason, status,
                       created_at, paid_at, waived_by, waived_at, waive_reason
                FROM fine
                WHERE fine_id = ?1
                "#,
                params![fine_id],
                Self::map_row_to_fine,
            )
            .optional()?;
        Ok(result)
    }

    /// 按 ID 查询罚款
    pub fn find_by_id(&self, fine_id: &str) -> RepositoryResult<Option<Fine>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, fine_id)
    }

    /// 借阅者未付罚款总额（事务内版本，借出拦截阈值用）
    pub fn total_unpaid_tx(conn: &Connection, member_id: &str) -> RepositoryResult<i64> {
        let total: i64 = conn.query_row(
            r#"
            SELECT COALESCE(SUM(amount), 0) FROM fine
            WHERE member_id = ?1 AND status = 'Unpaid'
            "#,
            params![member_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// 借阅者未付罚款总额
    pub fn total_unpaid(&self, member_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::total_unpaid_tx(&conn, member_id)
    }

    /// 结清流转: Unpaid → Paid（事务内版本）
    ///
    /// 并发控制点: 条件更新保证并发重复支付至多一方影响到行。
    pub fn mark_paid_tx(
        conn: &Connection,
        fine_id: &str,
        paid_at: DateTime<Utc>,
    ) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            UPDATE fine
            SET status = 'Paid', paid_at = ?2
            WHERE fine_id = ?1 AND status = 'Unpaid'
            "#,
            params![fine_id, paid_at],
        )?;
        Ok(rows == 1)
    }

    /// 减免流转: Unpaid → Waived（事务内版本）
    pub fn mark_waived_tx(
        conn: &Connection,
        fine_id: &str,
        waived_by: &str,
        waived_at: DateTime<Utc>,
        waive_reason: &str,
    ) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            UPDATE fine
            SET status = 'Waived', waived_by = ?2, waived_at = ?3, waive_reason = ?4
            WHERE fine_id = ?1 AND status = 'Unpaid'
            "#,
            params![fine_id, waived_by, waived_at, waive_reason],
        )?;
        Ok(rows == 1)
    }

    /// 插入支付流水（事务内版本，与罚款结清同事务落库）
    pub fn insert_payment_tx(conn: &Connection, payment: &Payment) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO payment (
                payment_id, fine_id, member_id, amount, method, transaction_ref, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                payment.payment_id,
                payment.fine_id,
                payment.member_id,
                payment.amount,
                payment.method.to_db_str(),
                payment.transaction_ref,
                payment.created_at,
            ],
        )?;
        Ok(())
    }

    /// 查询借阅者的罚款台账（created_at 倒序）
    pub fn list_for_member(&self, member_id: &str) -> RepositoryResult<Vec<Fine>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT fine_id, loan_id, member_id, amount, reason, status,
                   created_at, paid_at, waived_by, waived_at, waive_reason
            FROM fine
            WHERE member_id = ?1
            ORDER BY created_at DESC
            "#,
        )?;
        let rows = stmt.query_map(params![member_id], Self::map_row_to_fine)?;
        Ok(rows.collect::<SqliteResult<Vec<_>>>()?)
    }

    /// 查询罚款的支付流水（对账用）
    pub fn list_payments_for_fine(&self, fine_id: &str) -> RepositoryResult<Vec<Payment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT payment_id, fine_id, member_id, amount, method, transaction_ref, created_at
            FROM payment
            WHERE fine_id = ?1
            ORDER BY created_at ASC
            "#,
        )?;
        let rows = stmt.query_map(params![fine_id], |row| {
            Ok(Payment {
                payment_id: row.get(0)?,
                fine_id: row.get(1)?,
                member_id: row.get(2)?,
                amount: row.get(3)?,
                method: PaymentMethod::from_db_str(&row.get::<_, String>(4)?),
                transaction_ref: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<SqliteResult<Vec<_>>>()?)
    }

    /// 辅助方法：将数据库行映射为 Fine
    fn map_row_to_fine(row: &rusqlite::Row) -> SqliteResult<Fine> {
        Ok(Fine {
            fine_id: row.get(0)?,
            loan_id: row.get(1)?,
            member_id: row.get(2)?,
            amount: row.get(3)?,
            reason: row.get(4)?,
            status: FineStatus::from_db_str(&row.get::<_, String>(5)?),
            created_at: row.get(6)?,
            paid_at: row.get(7)?,
            waived_by: row.get(8)?,
            waived_at: row.get(9)?,
            waive_reason: row.get(10)?,
        })
    }
}
