// ==========================================
// 中小企业 ERP - 编号规则
// ==========================================
// 客户编号: KD + 6 位流水号 (KD000001)
// 发票编号: {前缀}-{年份}-{至少 4 位流水号} (RG-2025-0001)
// 红线: 编号只增不减，已删除记录仍占用编号
// ==========================================

use serde::{Deserialize, Serialize};

/// 客户编号前缀
pub const CUSTOMER_NUMBER_PREFIX: &str = "KD";

// ==========================================
// 客户编号
// ==========================================

pub fn format_customer_number(n: u32) -> String {
    format!("{}{:06}", CUSTOMER_NUMBER_PREFIX, n)
}

/// 解析客户编号中的流水号（格式不符返回 None）
pub fn parse_customer_number(s: &str) -> Option<u32> {
    let digits = s.trim().strip_prefix(CUSTOMER_NUMBER_PREFIX)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// 下一个客户编号
pub fn next_customer_number(existing_max: Option<u32>) -> String {
    format_customer_number(existing_max.unwrap_or(0).saturating_add(1))
}

// ==========================================
// 发票编号
// ==========================================

/// 发票编号规则（由 InvoiceSettings 提供）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceNumberPolicy {
    pub prefix: String,
    pub start_number: u32,
    pub yearly_reset: bool,
}

impl Default for InvoiceNumberPolicy {
    fn default() -> Self {
        Self {
            prefix: "RG".to_string(),
            start_number: 1,
            yearly_reset: true,
        }
    }
}

/// 年份前缀，如 "RG-2025-"
pub fn invoice_year_prefix(prefix: &str, year: i32) -> String {
    format!("{}-{}-", prefix, year)
}

/// 格式化发票编号（流水号至少 4 位）
pub fn format_invoice_number(prefix: &str, year: i32, n: u32) -> String {
    format!("{}{:04}", invoice_year_prefix(prefix, year), n)
}

/// 解析发票编号 -> (年份, 流水号)
pub fn parse_invoice_sequence(prefix: &str, number: &str) -> Option<(i32, u32)> {
    let rest = number.trim().strip_prefix(prefix)?.strip_prefix('-')?;
    let (year, seq) = rest.split_once('-')?;
    if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if seq.is_empty() || !seq.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((year.parse().ok()?, seq.parse().ok()?))
}

/// 计算下一个发票编号
///
/// - 按年重置: 延续同一年份的最大流水号，没有则从 start_number 开始
/// - 不重置: 延续所有年份中的最大流水号
///
/// `existing` 为同前缀的全部已用编号（含已删除），无法解析的编号忽略。
pub fn next_invoice_number<S: AsRef<str>>(
    policy: &InvoiceNumberPolicy,
    year: i32,
    existing: &[S],
) -> String {
    let last = existing
        .iter()
        .filter_map(|n| parse_invoice_sequence(&policy.prefix, n.as_ref()))
        .filter(|(y, _)| !policy.yearly_reset || *y == year)
        .map(|(_, seq)| seq)
        .max();

    let start = policy.start_number.max(1);
    let next = match last {
        Some(seq) => seq.saturating_add(1).max(start),
        None => start,
    };
    format_invoice_number(&policy.prefix, year, next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_numbers() {
        assert_eq!(format_customer_number(1), "KD000001");
        assert_eq!(parse_customer_number("KD000042"), Some(42));
        assert_eq!(parse_customer_number("KD"), None);
        assert_eq!(parse_customer_number("XX000001"), None);
        assert_eq!(parse_customer_number("KD12a"), None);
        assert_eq!(next_customer_number(None), "KD000001");
        assert_eq!(next_customer_number(Some(41)), "KD000042");
        // 超过 6 位时自然扩展
        assert_eq!(next_customer_number(Some(999_999)), "KD1000000");
    }

    #[test]
    fn test_format_and_parse_invoice_number() {
        assert_eq!(invoice_year_prefix("RG", 2025), "RG-2025-");
        assert_eq!(format_invoice_number("RG", 2025, 7), "RG-2025-0007");
        assert_eq!(format_invoice_number("RG", 2025, 12345), "RG-2025-12345");
        assert_eq!(parse_invoice_sequence("RG", "RG-2025-0007"), Some((2025, 7)));
        assert_eq!(parse_invoice_sequence("RG", "RG-2025-12345"), Some((2025, 12345)));
        assert_eq!(parse_invoice_sequence("RG", "AR-2025-0007"), None);
        assert_eq!(parse_invoice_sequence("RG", "RG-25-0007"), None);
        assert_eq!(parse_invoice_sequence("RG", "RG-2025-"), None);
    }

    #[test]
    fn test_next_with_yearly_reset() {
        let policy = InvoiceNumberPolicy::default();
        let empty: [&str; 0] = [];
        assert_eq!(next_invoice_number(&policy, 2025, &empty), "RG-2025-0001");

        let existing = ["RG-2024-0090", "RG-2025-0002", "RG-2025-0010", "garbage"];
        assert_eq!(next_invoice_number(&policy, 2025, &existing), "RG-2025-0011");
        assert_eq!(next_invoice_number(&policy, 2026, &existing), "RG-2026-0001");
    }

    #[test]
    fn test_next_without_yearly_reset() {
        let policy = InvoiceNumberPolicy {
            yearly_reset: false,
            ..InvoiceNumberPolicy::default()
        };
        let existing = ["RG-2024-0090", "RG-2025-0002"];
        assert_eq!(next_invoice_number(&policy, 2026, &existing), "RG-2026-0091");
    }

    #[test]
    fn test_start_number() {
        let policy = InvoiceNumberPolicy {
            start_number: 100,
            ..InvoiceNumberPolicy::default()
        };
        let empty: [&str; 0] = [];
        assert_eq!(next_invoice_number(&policy, 2025, &empty), "RG-2025-0100");
        assert_eq!(next_invoice_number(&policy, 2025, &["RG-2025-0005"]), "RG-2025-0100");
        assert_eq!(next_invoice_number(&policy, 2025, &["RG-2025-0150"]), "RG-2025-0151");
    }
}
