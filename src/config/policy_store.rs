// ==========================================
// 图书馆流通管理系统 - 借阅策略存储
// ==========================================
// 职责: system_config 表的键值读写
// 红线: 引擎在事务内即时读取策略，不做进程内缓存
//       （修改策略只影响后续操作，不回溯已生效的借阅）
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// 策略键名
// ==========================================
pub mod policy_keys {
    /// 借阅周期（天）
    pub const LOAN_PERIOD_DAYS: &str = "loan_period_days";
    /// 单笔借阅最大续借次数
    pub const MAX_RENEWALS: &str = "max_renewals";
    /// 逾期罚款日费率（最小货币单位）
    pub const FINE_RATE_PER_DAY: &str = "fine_rate_per_day";
    /// 未付罚款续借拦截阈值（最小货币单位，严格大于才拦截）
    pub const FINE_BLOCK_THRESHOLD: &str = "fine_block_threshold";
    /// 预约兑现后的保留天数
    pub const RESERVATION_HOLD_DAYS: &str = "reservation_hold_days";
}

/// 策略条目（管理端列表展示用）
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PolicyEntry {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

// ==========================================
// PolicyStore - 借阅策略存储
// ==========================================
pub struct PolicyStore {
    conn: Arc<Mutex<Connection>>,
}

impl PolicyStore {
    /// 创建新的策略存储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取策略值（事务内版本）
    ///
    /// # 返回
    /// - Err(NotFound): 键不存在（默认值由建库播种保证存在）
    pub fn get_tx(conn: &Connection, key: &str) -> RepositoryResult<String> {
        let value: Option<String> = conn
            .query_row(
                "SELECT config_value FROM system_config WHERE config_key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        value.ok_or_else(|| RepositoryError::NotFound {
            entity: "PolicyKey".to_string(),
            id: key.to_string(),
        })
    }

    /// 读取数值型策略（事务内版本）
    ///
    /// # 返回
    /// - Err(InvalidFormat): 值无法解析为整数
    pub fn get_number_tx(conn: &Connection, key: &str) -> RepositoryResult<i64> {
        let raw = Self::get_tx(conn, key)?;
        raw.trim()
            .parse::<i64>()
            .map_err(|_| RepositoryError::InvalidFormat {
                key: key.to_string(),
                value: raw,
            })
    }

    /// 读取策略值
    pub fn get(&self, key: &str) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        Self::get_tx(&conn, key)
    }

    /// 读取数值型策略
    pub fn get_number(&self, key: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::get_number_tx(&conn, key)
    }

    /// 更新策略值（管理端专用）
    ///
    /// 说明: 只更新已播种的键，不创建新键；未知键返回 NotFound。
    pub fn set(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE system_config SET config_value = ?2, updated_at = ?3 WHERE config_key = ?1",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "PolicyKey".to_string(),
                id: key.to_string(),
            });
        }
        Ok(())
    }

    /// 列出全部策略条目（键名升序）
    pub fn list(&self) -> RepositoryResult<Vec<PolicyEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT config_key, config_value, updated_at
            FROM system_config
            ORDER BY config_key ASC
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PolicyEntry {
                key: row.get(0)?,
                value: row.get(1)?,
                updated_at: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<SqliteResult<Vec<_>>>()?)
    }
}
