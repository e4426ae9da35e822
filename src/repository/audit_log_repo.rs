// ==========================================
// 图书馆流通管理系统 - 审计日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// 说明: 审计写入在主事务提交之后发生，失败不回滚主事务
// ==========================================

use crate::domain::audit_log::AuditLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// AuditLogRepository - 审计日志仓储
// ==========================================
pub struct AuditLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AuditLogRepository {
    /// 创建新的审计日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入审计日志
    pub fn insert(&self, log: &AuditLog) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO audit_log (
                audit_id, actor_id, action, entity_type, entity_id, detail, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                log.audit_id,
                log.actor_id,
                log.action,
                log.entity_type,
                log.entity_id,
                log.detail.to_string(),
                log.created_at,
            ],
        )?;
        Ok(())
    }

    /// 查询最近 N 条审计日志（created_at 倒序，管理端展示用）
    pub fn list_recent(&self, limit: i64) -> RepositoryResult<Vec<AuditLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT audit_id, actor_id, action, entity_type, entity_id, detail, created_at
            FROM audit_log
            ORDER BY created_at DESC
            LIMIT ?1
            "#,
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            let detail: String = row.get(5)?;
            Ok(AuditLog {
                audit_id: row.get(0)?,
                actor_id: row.get(1)?,
                action: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                detail: serde_json::from_str(&detail).unwrap_or(serde_json::Value::Null),
                created_at: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<SqliteResult<Vec<_>>>()?)
    }
}
