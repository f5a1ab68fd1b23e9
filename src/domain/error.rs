// ==========================================
// 中小企业 ERP - 领域层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 领域规则错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("币种不一致: {left} 与 {right}")]
    CurrencyMismatch { left: String, right: String },

    #[error("币种不能为空")]
    EmptyCurrency,

    #[error("除数不能为零")]
    DivisionByZero,

    #[error("无效的邮箱地址: {0}")]
    InvalidEmail(String),

    #[error("数值超出范围 (field={field}): {message}")]
    OutOfRange { field: String, message: String },

    #[error("库存不足: 需要 {required}, 现有 {available}")]
    InsufficientStock { required: String, available: String },

    #[error("服务类商品不支持库存操作: {0}")]
    NotAProduct(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("业务规则违反: {0}")]
    RuleViolation(String),
}

impl DomainError {
    pub fn out_of_range(field: &str, message: impl Into<String>) -> Self {
        DomainError::OutOfRange {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

// ==========================================
// 校验违规详情
// ==========================================

/// 字段级校验违规
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidationViolation {
    /// 字段名（与实体字段一致）
    pub field: String,
    /// 违规原因
    pub reason: String,
}

impl ValidationViolation {
    pub fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// 收集校验违规的小工具
#[derive(Debug, Default)]
pub struct Violations(Vec<ValidationViolation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, reason: impl Into<String>) {
        self.0.push(ValidationViolation::new(field, reason));
    }

    /// 必填文本
    pub fn require(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, format!("{}不能为空", field));
        }
    }

    /// 文本最大长度（按字符计）
    pub fn max_len(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.push(field, format!("{}长度不能超过{}", field, max));
        }
    }

    /// 可选邮箱格式
    pub fn email(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            if !v.trim().is_empty() && !crate::domain::email::is_valid_email(v) {
                self.push(field, format!("{}格式无效: {}", field, v));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<ValidationViolation> {
        self.0
    }
}
