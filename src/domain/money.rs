// ==========================================
// 中小企业 ERP - 金额值对象
// ==========================================
// 红线: 金额一律使用十进制定点运算，禁止浮点
// 舍入: 保留两位小数，中间值远离零 (kaufmännisch)
// ==========================================

use crate::domain::error::{DomainError, DomainResult};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 百分比换算基数
pub const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// 数量上限（明细数量、库存）
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// 单价上限（售价、进价、明细单价）
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// 金额舍入到两位小数
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// 按百分比计算: value × pct / 100
pub fn percent_of(value: Decimal, pct: Decimal) -> Decimal {
    value * pct / HUNDRED
}

/// 百分比是否位于 0..=100
pub fn is_valid_percentage(pct: Decimal) -> bool {
    pct >= Decimal::ZERO && pct <= HUNDRED
}

// ==========================================
// Money - 带币种的金额
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: String,
}

impl Money {
    /// 创建金额（自动舍入到两位小数，币种大写）
    pub fn new(amount: Decimal, currency: &str) -> DomainResult<Self> {
        let currency = currency.trim();
        if currency.is_empty() {
            return Err(DomainError::EmptyCurrency);
        }
        Ok(Self {
            amount: round_money(amount),
            currency: currency.to_uppercase(),
        })
    }

    /// 欧元金额
    pub fn euro(amount: Decimal) -> Self {
        Self {
            amount: round_money(amount),
            currency: "EUR".to_string(),
        }
    }

    pub fn zero(currency: &str) -> DomainResult<Self> {
        Self::new(Decimal::ZERO, currency)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Self {
            amount: self.amount.abs(),
            currency: self.currency.clone(),
        }
    }

    pub fn negate(&self) -> Self {
        Self {
            amount: -self.amount,
            currency: self.currency.clone(),
        }
    }

    fn ensure_same_currency(&self, other: &Money) -> DomainResult<()> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            });
        }
        Ok(())
    }

    pub fn checked_add(&self, other: &Money) -> DomainResult<Money> {
        self.ensure_same_currency(other)?;
        Money::new(self.amount + other.amount, &self.currency)
    }

    pub fn checked_sub(&self, other: &Money) -> DomainResult<Money> {
        self.ensure_same_currency(other)?;
        Money::new(self.amount - other.amount, &self.currency)
    }

    pub fn mul(&self, factor: Decimal) -> Money {
        Self {
            amount: round_money(self.amount * factor),
            currency: self.currency.clone(),
        }
    }

    pub fn div(&self, divisor: Decimal) -> DomainResult<Money> {
        if divisor.is_zero() {
            return Err(DomainError::DivisionByZero);
        }
        Money::new(self.amount / divisor, &self.currency)
    }

    /// 同币种比较
    pub fn checked_cmp(&self, other: &Money) -> DomainResult<std::cmp::Ordering> {
        self.ensure_same_currency(other)?;
        Ok(self.amount.cmp(&other.amount))
    }

    /// 仅金额（点作小数分隔符），如 "1234.56"
    pub fn to_amount_string(&self) -> String {
        format!("{:.2}", self.amount)
    }

    /// 德语区格式金额，如 "1.234,56"
    pub fn to_localized_string(&self) -> String {
        format_amount_de(self.amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", format_amount_de(self.amount), self.currency)
    }
}

/// 德语区数字格式: 千分位 '.'，小数 ','
pub fn format_amount_de(amount: Decimal) -> String {
    let rounded = round_money(amount);
    let raw = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = raw.split_once('.').unwrap_or((raw.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}{},{}", sign, grouped, frac_part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_midpoint_away_from_zero() {
        assert_eq!(round_money(dec!(2.345)), dec!(2.35));
        assert_eq!(round_money(dec!(2.344)), dec!(2.34));
        assert_eq!(round_money(dec!(-2.345)), dec!(-2.35));
    }

    #[test]
    fn test_new_rounds_and_uppercases() {
        let m = Money::new(dec!(10.005), "eur").unwrap();
        assert_eq!(m.amount(), dec!(10.01));
        assert_eq!(m.currency(), "EUR");
    }

    #[test]
    fn test_empty_currency_rejected() {
        assert_eq!(Money::new(dec!(1), "  "), Err(DomainError::EmptyCurrency));
    }

    #[test]
    fn test_add_requires_same_currency() {
        let a = Money::euro(dec!(10));
        let b = Money::new(dec!(5), "CHF").unwrap();
        assert!(matches!(
            a.checked_add(&b),
            Err(DomainError::CurrencyMismatch { .. })
        ));

        let c = Money::euro(dec!(2.50));
        assert_eq!(a.checked_add(&c).unwrap().amount(), dec!(12.50));
        assert_eq!(a.checked_sub(&c).unwrap().amount(), dec!(7.50));
    }

    #[test]
    fn test_div_by_zero() {
        assert_eq!(
            Money::euro(dec!(1)).div(Decimal::ZERO),
            Err(DomainError::DivisionByZero)
        );
        assert_eq!(Money::euro(dec!(10)).div(dec!(3)).unwrap().amount(), dec!(3.33));
    }

    #[test]
    fn test_display_german_format() {
        assert_eq!(Money::euro(dec!(1234.5)).to_string(), "1.234,50 EUR");
        assert_eq!(Money::euro(dec!(0)).to_string(), "0,00 EUR");
        assert_eq!(Money::euro(dec!(-1234567.891)).to_string(), "-1.234.567,89 EUR");
        assert_eq!(Money::euro(dec!(999)).to_amount_string(), "999.00");
    }

    #[test]
    fn test_percent_helpers() {
        assert_eq!(percent_of(dec!(200), dec!(20)), dec!(40));
        assert!(is_valid_percentage(dec!(0)));
        assert!(is_valid_percentage(dec!(100)));
        assert!(!is_valid_percentage(dec!(100.01)));
        assert!(!is_valid_percentage(dec!(-1)));
    }
}
