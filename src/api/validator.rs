// ==========================================
// 中小企业 ERP - API 输入校验
// ==========================================
// 职责: 操作人/主键/金额等入参检查，实体校验结果转换为 ApiError
// ==========================================

use rust_decimal::Decimal;

use crate::api::error::{ApiError, ApiResult, ValidationViolation};
use crate::domain::money::is_valid_percentage;

/// 搜索词最大长度
pub const MAX_SEARCH_TERM_LEN: usize = 100;

/// 实体校验结果：有违规则返回 ValidationFailed
pub fn ensure_valid(violations: Vec<ValidationViolation>) -> ApiResult<()> {
    match ApiError::from_violations(violations) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// 操作人不能为空
pub fn require_operator(operator: &str) -> ApiResult<()> {
    if operator.trim().is_empty() {
        return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
    }
    Ok(())
}

/// 主键必须为正
pub fn require_id(field: &str, id: i64) -> ApiResult<()> {
    if id <= 0 {
        return Err(ApiError::InvalidInput(format!("{}无效: {}", field, id)));
    }
    Ok(())
}

/// 金额/数量必须大于 0
pub fn require_positive(field: &str, value: Decimal) -> ApiResult<()> {
    if value <= Decimal::ZERO {
        return Err(ApiError::ValidationFailed {
            reason: format!("{}必须大于 0", field),
            violations: vec![ValidationViolation::new(field, "必须大于 0")],
        });
    }
    Ok(())
}

/// 百分比必须在 0..=100
pub fn require_percentage(field: &str, value: Decimal) -> ApiResult<()> {
    if !is_valid_percentage(value) {
        return Err(ApiError::ValidationFailed {
            reason: format!("{}必须在 0 到 100 之间", field),
            violations: vec![ValidationViolation::new(field, "必须在 0 到 100 之间")],
        });
    }
    Ok(())
}

/// 规整搜索词（去空白，限制长度）
pub fn normalize_search_term(term: &str) -> ApiResult<String> {
    let term = term.trim();
    if term.is_empty() {
        return Err(ApiError::InvalidInput("搜索词不能为空".to_string()));
    }
    if term.chars().count() > MAX_SEARCH_TERM_LEN {
        return Err(ApiError::InvalidInput(format!(
            "搜索词不能超过{}个字符",
            MAX_SEARCH_TERM_LEN
        )));
    }
    Ok(term.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ensure_valid() {
        assert!(ensure_valid(vec![]).is_ok());
        let err = ensure_valid(vec![ValidationViolation::new("name", "name不能为空")]).unwrap_err();
        assert_eq!(err.violations()[0].field, "name");
    }

    #[test]
    fn test_simple_checks() {
        assert!(require_operator(" ").is_err());
        assert!(require_operator("admin").is_ok());
        assert!(require_id("customer_id", 0).is_err());
        assert!(require_positive("amount", dec!(0)).is_err());
        assert!(require_positive("amount", dec!(0.01)).is_ok());
        assert!(require_percentage("discount", dec!(100)).is_ok());
        assert!(require_percentage("discount", dec!(100.5)).is_err());
    }

    #[test]
    fn test_search_term() {
        assert_eq!(normalize_search_term("  Huber ").unwrap(), "Huber");
        assert!(normalize_search_term("   ").is_err());
        assert!(normalize_search_term(&"x".repeat(101)).is_err());
    }
}
