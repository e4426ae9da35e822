// ==========================================
// 图书馆流通管理系统 - 用户仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// 说明: *_tx 关联函数在调用方已持有的连接/事务上执行，
//       供借阅引擎在同一事务快照内复用
// ==========================================

use crate::domain::member::{Librarian, Member};
use crate::domain::types::AccountStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// MemberRepository - 借阅者仓储
// ==========================================
pub struct MemberRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MemberRepository {
    /// 创建新的借阅者仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按登录名查询借阅者（事务内版本）
    pub fn find_by_username_tx(
        conn: &Connection,
        username: &str,
    ) -> RepositoryResult<Option<Member>> {
        let result = conn
            .query_row(
                r#"
                SELECT m.member_id, u.username, u.first_name, u.last_name,
                       u.status, m.member_type, m.borrowing_limit
                FROM member m
                JOIN user_account u ON m.member_id = u.user_id
                WHERE u.username = ?1
                "#,
                params![username],
                Self::map_row_to_member,
            )
            .optional()?;
        Ok(result)
    }

    /// 按 ID 查询借阅者（事务内版本）
    pub fn find_by_id_tx(conn: &Connection, member_id: &str) -> RepositoryResult<Option<Member>> {
        let result = conn
            .query_row(
                r#"
                SELECT m.member_id, u.username, u.first_name, u.last_name,
                       u.status, m.member_type, m.borrowing_limit
                FROM member m
                JOIN user_account u ON m.member_id = u.user_id
                WHERE m.member_id = ?1
                "#,
                params![member_id],
                Self::map_row_to_member,
            )
            .optional()?;
        Ok(result)
    }

    /// 按登录名查询借阅者
    pub fn find_by_username(&self, username: &str) -> RepositoryResult<Option<Member>> {
        let conn = self.get_conn()?;
        Self::find_by_username_tx(&conn, username)
    }

    /// 按 ID 查询借阅者
    pub fn find_by_id(&self, member_id: &str) -> RepositoryResult<Option<Member>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, member_id)
    }

    /// 辅助方法：将数据库行映射为 Member
    fn map_row_to_member(row: &rusqlite::Row) -> rusqlite::Result<Member> {
        Ok(Member {
            member_id: row.get(0)?,
            username: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            account_status: AccountStatus::from_db_str(&row.get::<_, String>(4)?),
            member_type: row.get(5)?,
            borrowing_limit: row.get(6)?,
        })
    }
}

// ==========================================
// LibrarianRepository - 馆员仓储
// ==========================================
// 说明: 主体解析的数据侧——馆员记录存在即具备流通操作权限
pub struct LibrarianRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LibrarianRepository {
    /// 创建新的馆员仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按 ID 查询馆员（事务内版本）
    pub fn find_by_id_tx(
        conn: &Connection,
        librarian_id: &str,
    ) -> RepositoryResult<Option<Librarian>> {
        let result = conn
            .query_row(
                r#"
                SELECT l.librarian_id, u.username, l.employee_no
                FROM librarian l
                JOIN user_account u ON l.librarian_id = u.user_id
                WHERE l.librarian_id = ?1
                "#,
                params![librarian_id],
                |row| {
                    Ok(Librarian {
                        librarian_id: row.get(0)?,
                        username: row.get(1)?,
                        employee_no: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(result)
    }

    /// 按 ID 查询馆员
    pub fn find_by_id(&self, librarian_id: &str) -> RepositoryResult<Option<Librarian>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, librarian_id)
    }
}
