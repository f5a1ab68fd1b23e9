// ==========================================
// 中小企业 ERP - 邮箱地址值对象
// ==========================================

use crate::domain::error::{DomainError, DomainResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$").expect("valid email regex")
});

/// 校验邮箱格式（大小写不敏感，前后空白忽略）
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_REGEX.is_match(&value.trim().to_lowercase())
}

/// 规范化后的邮箱地址（小写、去空白）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(value: &str) -> DomainResult<Self> {
        let normalized = value.trim().to_lowercase();
        if normalized.is_empty() || !EMAIL_REGEX.is_match(&normalized) {
            return Err(DomainError::InvalidEmail(value.to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// '@' 之后的域名部分
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map(|(_, d)| d).unwrap_or("")
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        EmailAddress::parse(&value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
