// ==========================================
// 中小企业 ERP - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository/领域错误为用户友好的错误消息
// ==========================================

use crate::domain::error::DomainError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

pub use crate::domain::error::ValidationViolation;

/// API层错误类型
/// 所有错误信息必须包含显式原因
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    /// 字段校验失败（带详细原因）
    #[error("数据校验失败: {reason}")]
    ValidationFailed {
        reason: String,
        violations: Vec<ValidationViolation>,
    },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 由违规列表构造校验错误（列表为空时返回 None）
    pub fn from_violations(violations: Vec<ValidationViolation>) -> Option<Self> {
        if violations.is_empty() {
            return None;
        }
        let reason = violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.reason))
            .collect::<Vec<_>>()
            .join("; ");
        Some(ApiError::ValidationFailed { reason, violations })
    }

    /// 违规详情（非校验错误返回空）
    pub fn violations(&self) -> &[ValidationViolation] {
        match self {
            ApiError::ValidationFailed { violations, .. } => violations,
            _ => &[],
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将Repository层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 DomainError 转换
// ==========================================
impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            DomainError::OutOfRange { field, message } => ApiError::ValidationFailed {
                reason: format!("{}: {}", field, message),
                violations: vec![ValidationViolation::new(&field, message)],
            },
            DomainError::InvalidEmail(email) => ApiError::ValidationFailed {
                reason: format!("无效的邮箱地址: {}", email),
                violations: vec![ValidationViolation::new("email", "邮箱格式无效")],
            },
            DomainError::CurrencyMismatch { .. }
            | DomainError::EmptyCurrency
            | DomainError::DivisionByZero => ApiError::InvalidInput(err.to_string()),
            DomainError::InsufficientStock { .. }
            | DomainError::NotAProduct(_)
            | DomainError::RuleViolation(_) => ApiError::BusinessRuleViolation(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

/// 配置读取错误统一映射为内部错误
pub(crate) fn config_error(err: Box<dyn std::error::Error>) -> ApiError {
    ApiError::InternalError(format!("配置读取失败: {}", err))
}
