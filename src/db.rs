// ==========================================
// 图书馆流通管理系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免“部分模块外键开启/部分不开启”
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 统一建表入口，库文件首次打开即可使用
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化数据库 schema（幂等）
///
/// 说明：
/// - 所有建表语句使用 IF NOT EXISTS，重复调用无副作用
/// - 借阅策略的默认值使用 INSERT OR IGNORE 播种，不覆盖管理员已有修改
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- 用户账户（借阅者与馆员共用）
        CREATE TABLE IF NOT EXISTS user_account (
            user_id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Active',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- 借阅者档案
        CREATE TABLE IF NOT EXISTS member (
            member_id TEXT PRIMARY KEY REFERENCES user_account(user_id),
            member_type TEXT NOT NULL DEFAULT 'Student',
            borrowing_limit INTEGER NOT NULL DEFAULT 5
        );

        -- 馆员档案（存在即具备流通操作权限）
        CREATE TABLE IF NOT EXISTS librarian (
            librarian_id TEXT PRIMARY KEY REFERENCES user_account(user_id),
            employee_no TEXT
        );

        -- 书目（题名级）
        CREATE TABLE IF NOT EXISTS book (
            isbn TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            publisher TEXT,
            published_year INTEGER
        );

        -- 馆藏复本（条码级）
        CREATE TABLE IF NOT EXISTS book_copy (
            barcode TEXT PRIMARY KEY,
            isbn TEXT NOT NULL REFERENCES book(isbn),
            status TEXT NOT NULL DEFAULT 'Available',
            condition TEXT NOT NULL DEFAULT 'Good',
            acquired_at TEXT
        );

        -- 借阅记录
        CREATE TABLE IF NOT EXISTS loan (
            loan_id TEXT PRIMARY KEY,
            barcode TEXT NOT NULL REFERENCES book_copy(barcode),
            member_id TEXT NOT NULL REFERENCES member(member_id),
            issue_date TEXT NOT NULL,
            due_date TEXT NOT NULL,
            return_date TEXT,
            status TEXT NOT NULL DEFAULT 'Active',
            renewal_count INTEGER NOT NULL DEFAULT 0,
            issued_by TEXT NOT NULL REFERENCES librarian(librarian_id),
            returned_to TEXT REFERENCES librarian(librarian_id)
        );
        CREATE INDEX IF NOT EXISTS idx_loan_member_status ON loan(member_id, status);
        CREATE INDEX IF NOT EXISTS idx_loan_barcode_status ON loan(barcode, status);

        -- 预约（题名级 FIFO 队列）
        CREATE TABLE IF NOT EXISTS reservation (
            reserve_id TEXT PRIMARY KEY,
            member_id TEXT NOT NULL REFERENCES member(member_id),
            isbn TEXT NOT NULL REFERENCES book(isbn),
            reserve_date TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Pending',
            expiry_date TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_reservation_isbn_status
            ON reservation(isbn, status, reserve_date);

        -- 罚款
        CREATE TABLE IF NOT EXISTS fine (
            fine_id TEXT PRIMARY KEY,
            loan_id TEXT NOT NULL REFERENCES loan(loan_id),
            member_id TEXT NOT NULL REFERENCES member(member_id),
            amount INTEGER NOT NULL CHECK (amount >= 0),
            reason TEXT NOT NULL DEFAULT 'Overdue',
            status TEXT NOT NULL DEFAULT 'Unpaid',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            paid_at TEXT,
            waived_by TEXT REFERENCES librarian(librarian_id),
            waived_at TEXT,
            waive_reason TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_fine_member_status ON fine(member_id, status);

        -- 支付流水（外部网关为桩实现，恒成功）
        CREATE TABLE IF NOT EXISTS payment (
            payment_id TEXT PRIMARY KEY,
            fine_id TEXT NOT NULL REFERENCES fine(fine_id),
            member_id TEXT NOT NULL REFERENCES member(member_id),
            amount INTEGER NOT NULL,
            method TEXT NOT NULL,
            transaction_ref TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Success',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- 借阅策略（key-value，事务内即时读取，不缓存）
        CREATE TABLE IF NOT EXISTS system_config (
            config_key TEXT PRIMARY KEY,
            config_value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- 审计日志（旁路，尽力而为）
        CREATE TABLE IF NOT EXISTS audit_log (
            audit_id TEXT PRIMARY KEY,
            actor_id TEXT NOT NULL,
            action TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            detail TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- 通知队列（旁路，尽力而为）
        CREATE TABLE IF NOT EXISTS notification (
            notification_id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            channel TEXT NOT NULL DEFAULT 'Email',
            content TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Pending',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )?;

    // 播种默认借阅策略（已存在的键不覆盖）
    conn.execute_batch(
        r#"
        INSERT OR IGNORE INTO system_config (config_key, config_value) VALUES
            ('loan_period_days', '14'),
            ('max_renewals', '2'),
            ('fine_rate_per_day', '5000'),
            ('fine_block_threshold', '50000'),
            ('reservation_hold_days', '3');
        "#,
    )?;

    Ok(())
}
