// ==========================================
// 图书馆流通管理系统 - 借阅仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// 说明: 借阅状态流转的业务顺序由借阅引擎编排，
//       仓储只提供参数化读写与条件更新原语
// ==========================================

use crate::domain::loan::{Loan, LoanDetail};
use crate::domain::types::LoanStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// LoanRepository - 借阅仓储
// ==========================================
pub struct LoanRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LoanRepository {
    /// 创建新的借阅仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入借阅记录（事务内版本）
    pub fn insert_tx(conn: &Connection, loan: &Loan) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO loan (
                loan_id, barcode, member_id, issue_date, due_date,
                return_date, status, renewal_count, issued_by, returned_to
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                loan.loan_id,
                loan.barcode,
                loan.member_id,
                loan.issue_date,
                loan.due_date,
                loan.return_date,
                loan.status.to_db_str(),
                loan.renewal_count,
                loan.issued_by,
                loan.returned_to,
            ],
        )?;
        Ok(())
    }

    /// 按 ID 查询借阅（事务内版本）
    pub fn find_by_id_tx(conn: &Connection, loan_id: &str) -> RepositoryResult<Option<Loan>> {
        let result = conn
            .query_row(
                r#"
                SELECT loan_id, barcode, member_id, issue_date, due_date,
                       return_date, status, renewal_count, issued_by, returned_to
                FROM loan
                WHERE loan_id = ?1
                "#,
                params![loan_id],
                Self::map_row_to_loan,
            )
            .optional()?;
        Ok(result)
    }

    /// 按 ID 查询借阅
    pub fn find_by_id(&self, loan_id: &str) -> RepositoryResult<Option<Loan>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, loan_id)
    }

    /// 统计借阅者当前 Active 借阅数（事务内版本，借出上限校验用）
    pub fn count_active_tx(conn: &Connection, member_id: &str) -> RepositoryResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM loan WHERE member_id = ?1 AND status = 'Active'",
            params![member_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 归还流转: Active → Returned（事务内版本）
    ///
    /// 条件更新，影响 0 行说明借阅不存在或已非 Active。
    pub fn mark_returned_tx(
        conn: &Connection,
        loan_id: &str,
        return_date: DateTime<Utc>,
        returned_to: &str,
    ) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            UPDATE loan
            SET status = 'Returned', return_date = ?2, returned_to = ?3
            WHERE loan_id = ?1 AND status = 'Active'
            "#,
            params![loan_id, return_date, returned_to],
        )?;
        Ok(rows == 1)
    }

    /// 续借流转: 顺延应还时间并累加续借次数（事务内版本）
    pub fn apply_renewal_tx(
        conn: &Connection,
        loan_id: &str,
        new_due_date: DateTime<Utc>,
    ) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            UPDATE loan
            SET due_date = ?2, renewal_count = renewal_count + 1
            WHERE loan_id = ?1 AND status = 'Active'
            "#,
            params![loan_id, new_due_date],
        )?;
        Ok(rows == 1)
    }

    /// 查询借阅详情（联 member / book，事务内版本）
    pub fn find_detail_tx(conn: &Connection, loan_id: &str) -> RepositoryResult<LoanDetail> {
        let result = conn
            .query_row(
                r#"
                SELECT l.loan_id, l.barcode, l.member_id, l.issue_date, l.due_date,
                       l.return_date, l.status, l.renewal_count, l.issued_by, l.returned_to,
                       u.first_name || ' ' || u.last_name,
                       b.isbn, b.title, b.author
                FROM loan l
                JOIN user_account u ON l.member_id = u.user_id
                JOIN book_copy c ON l.barcode = c.barcode
                JOIN book b ON c.isbn = b.isbn
                WHERE l.loan_id = ?1
                "#,
                params![loan_id],
                Self::map_row_to_detail,
            )
            .optional()?;

        result.ok_or_else(|| RepositoryError::NotFound {
            entity: "Loan".to_string(),
            id: loan_id.to_string(),
        })
    }

    /// 查询借阅者的在借记录（issue_date 倒序）
    pub fn list_active_for(&self, member_id: &str) -> RepositoryResult<Vec<LoanDetail>> {
        self.list_for_member(member_id, LoanStatus::Active, "l.issue_date DESC")
    }

    /// 查询借阅者的历史记录（return_date 倒序）
    pub fn list_history_for(&self, member_id: &str) -> RepositoryResult<Vec<LoanDetail>> {
        self.list_for_member(member_id, LoanStatus::Returned, "l.return_date DESC")
    }

    fn list_for_member(
        &self,
        member_id: &str,
        status: LoanStatus,
        order_by: &str,
    ) -> RepositoryResult<Vec<LoanDetail>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT l.loan_id, l.barcode, l.member_id, l.issue_date, l.due_date,
                   l.return_date, l.status, l.renewal_count, l.issued_by, l.returned_to,
                   u.first_name || ' ' || u.last_name,
                   b.isbn, b.title, b.author
            FROM loan l
            JOIN user_account u ON l.member_id = u.user_id
            JOIN book_copy c ON l.barcode = c.barcode
            JOIN book b ON c.isbn = b.isbn
            WHERE l.member_id = ?1 AND l.status = ?2
            ORDER BY {}
            "#,
            order_by
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![member_id, status.to_db_str()],
            Self::map_row_to_detail,
        )?;
        Ok(rows.collect::<SqliteResult<Vec<_>>>()?)
    }

    /// 查询全部借阅（可按状态过滤，流通台账展示用）
    pub fn list_all(&self, status: Option<LoanStatus>) -> RepositoryResult<Vec<LoanDetail>> {
        let conn = self.get_conn()?;
        let base = r#"
            SELECT l.loan_id, l.barcode, l.member_id, l.issue_date, l.due_date,
                   l.return_date, l.status, l.renewal_count, l.issued_by, l.returned_to,
                   u.first_name || ' ' || u.last_name,
                   b.isbn, b.title, b.author
            FROM loan l
            JOIN user_account u ON l.member_id = u.user_id
            JOIN book_copy c ON l.barcode = c.barcode
            JOIN book b ON c.isbn = b.isbn
        "#;

        let details = if let Some(status) = status {
            let sql = format!("{} WHERE l.status = ?1 ORDER BY l.issue_date DESC", base);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![status.to_db_str()], Self::map_row_to_detail)?;
            rows.collect::<SqliteResult<Vec<_>>>()?
        } else {
            let sql = format!("{} ORDER BY l.issue_date DESC", base);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], Self::map_row_to_detail)?;
            rows.collect::<SqliteResult<Vec<_>>>()?
        };

        Ok(details)
    }

    /// 辅助方法：将数据库行映射为 Loan
    fn map_row_to_loan(row: &rusqlite::Row) -> SqliteResult<Loan> {
        Ok(Loan {
            loan_id: row.get(0)?,
            barcode: row.get(1)?,
            member_id: row.get(2)?,
            issue_date: row.get(3)?,
            due_date: row.get(4)?,
            return_date: row.get(5)?,
            status: LoanStatus::from_db_str(&row.get::<_, String>(6)?),
            renewal_count: row.get(7)?,
            issued_by: row.get(8)?,
            returned_to: row.get(9)?,
        })
    }

    /// 辅助方法：将数据库行映射为 LoanDetail
    fn map_row_to_detail(row: &rusqlite::Row) -> SqliteResult<LoanDetail> {
        Ok(LoanDetail {
            loan: Self::map_row_to_loan(row)?,
            member_name: row.get(10)?,
            isbn: row.get(11)?,
            title: row.get(12)?,
            author: row.get(13)?,
        })
    }
}
