// ==========================================
// 图书馆流通管理系统 - 通知仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// 说明: 通知只入队落库，投递由外部渠道负责
// ==========================================

use crate::domain::audit_log::Notification;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// NotificationRepository - 通知仓储
// ==========================================
pub struct NotificationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl NotificationRepository {
    /// 创建新的通知仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 入队通知
    pub fn insert(&self, notification: &Notification) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO notification (
                notification_id, user_id, kind, channel, content, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                notification.notification_id,
                notification.user_id,
                notification.kind,
                notification.channel,
                notification.content,
                notification.status,
                notification.created_at,
            ],
        )?;
        Ok(())
    }

    /// 查询用户的通知（created_at 倒序）
    pub fn list_for_user(&self, user_id: &str) -> RepositoryResult<Vec<Notification>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT notification_id, user_id, kind, channel, content, status, created_at
            FROM notification
            WHERE user_id = ?1
            ORDER BY created_at DESC
            "#,
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(Notification {
                notification_id: row.get(0)?,
                user_id: row.get(1)?,
                kind: row.get(2)?,
                channel: row.get(3)?,
                content: row.get(4)?,
                status: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<SqliteResult<Vec<_>>>()?)
    }
}
