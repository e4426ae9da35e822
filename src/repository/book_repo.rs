// ==========================================
// 图书馆流通管理系统 - 书目/复本仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// 红线: 复本的 Available → Loaned 必须走 claim_available_tx
//       （单条条件更新，不允许先读后写）
// ==========================================

use crate::domain::book::{Book, BookCopy};
use crate::domain::types::CopyStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// BookRepository - 书目仓储
// ==========================================
pub struct BookRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BookRepository {
    /// 创建新的书目仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按 ISBN 查询书目（事务内版本）
    pub fn find_by_isbn_tx(conn: &Connection, isbn: &str) -> RepositoryResult<Option<Book>> {
        let result = conn
            .query_row(
                "SELECT isbn, title, author, publisher, published_year FROM book WHERE isbn = ?1",
                params![isbn],
                |row| {
                    Ok(Book {
                        isbn: row.get(0)?,
                        title: row.get(1)?,
                        author: row.get(2)?,
                        publisher: row.get(3)?,
                        published_year: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(result)
    }

    /// 按 ISBN 查询书目
    pub fn find_by_isbn(&self, isbn: &str) -> RepositoryResult<Option<Book>> {
        let conn = self.get_conn()?;
        Self::find_by_isbn_tx(&conn, isbn)
    }
}

// ==========================================
// BookCopyRepository - 馆藏复本仓储
// ==========================================
pub struct BookCopyRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BookCopyRepository {
    /// 创建新的复本仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按条码查询复本（事务内版本）
    pub fn find_by_barcode_tx(
        conn: &Connection,
        barcode: &str,
    ) -> RepositoryResult<Option<BookCopy>> {
        let result = conn
            .query_row(
                r#"
                SELECT barcode, isbn, status, condition, acquired_at
                FROM book_copy
                WHERE barcode = ?1
                "#,
                params![barcode],
                Self::map_row_to_copy,
            )
            .optional()?;
        Ok(result)
    }

    /// 按条码查询复本
    pub fn find_by_barcode(&self, barcode: &str) -> RepositoryResult<Option<BookCopy>> {
        let conn = self.get_conn()?;
        Self::find_by_barcode_tx(&conn, barcode)
    }

    /// 原子认领复本: Available → Loaned（事务内版本）
    ///
    /// 并发控制点: 两个并发借出争抢同一复本时，条件更新保证至多一方
    /// 影响到行；影响 0 行即认领失败（复本不存在或不可借）。
    ///
    /// # 返回
    /// - Ok(true): 认领成功
    /// - Ok(false): 复本不存在或当前不是 Available
    pub fn claim_available_tx(conn: &Connection, barcode: &str) -> RepositoryResult<bool> {
        let rows = conn.execute(
            "UPDATE book_copy SET status = 'Loaned' WHERE barcode = ?1 AND status = 'Available'",
            params![barcode],
        )?;
        Ok(rows == 1)
    }

    /// 设置复本状态（事务内版本，归还路径专用）
    pub fn set_status_tx(
        conn: &Connection,
        barcode: &str,
        status: CopyStatus,
    ) -> RepositoryResult<()> {
        let rows = conn.execute(
            "UPDATE book_copy SET status = ?2 WHERE barcode = ?1",
            params![barcode, status.to_db_str()],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "BookCopy".to_string(),
                id: barcode.to_string(),
            });
        }
        Ok(())
    }

    /// 查询题名下所有复本（管理端展示用）
    pub fn list_by_isbn(&self, isbn: &str) -> RepositoryResult<Vec<BookCopy>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT barcode, isbn, status, condition, acquired_at
            FROM book_copy
            WHERE isbn = ?1
            ORDER BY barcode
            "#,
        )?;
        let rows = stmt.query_map(params![isbn], Self::map_row_to_copy)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// 辅助方法：将数据库行映射为 BookCopy
    fn map_row_to_copy(row: &rusqlite::Row) -> rusqlite::Result<BookCopy> {
        Ok(BookCopy {
            barcode: row.get(0)?,
            isbn: row.get(1)?,
            status: CopyStatus::from_db_str(&row.get::<_, String>(2)?),
            condition: row.get(3)?,
            acquired_at: row.get(4)?,
        })
    }
}
