// ==========================================
// 图书馆流通管理系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository错误为用户友好的错误消息
// 红线: 所有错误信息必须包含显式原因，不得静默吞错
//       （唯一例外: 审计/通知旁路为尽力而为）
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("请求不合法: {0}")]
    BadRequest(String),

    #[error("无权操作: {0}")]
    Forbidden(String),

    #[error("并发冲突: {0}")]
    Conflict(String),

    #[error("无效输入: {0}")]
    InvalidInput(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将Repository层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BadRequest(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BadRequest(format!("外键约束违反: {}", msg))
            }

            // 数据质量/业务规则错误
            RepositoryError::InvalidFormat { key, value } => {
                ApiError::InternalError(format!("策略值格式错误 (key={}): {}", key, value))
            }
            RepositoryError::BusinessRuleViolation(msg) => ApiError::BadRequest(msg),

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// 引擎层直接操作事务的 begin/commit，经由仓储层错误归类后再转换
impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::from(RepositoryError::from(err))
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
