// ==========================================
// 中小企业 ERP - 类型化配置
// ==========================================
// 职责: 发票编号与默认条款、应用级开关
// 来源: config_kv（ConfigManager）或测试中的固定值
// ==========================================

use crate::domain::item::DEFAULT_VAT_RATE;
use crate::domain::numbering::InvoiceNumberPolicy;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::Write;

/// 默认日期格式 (31.12.2025)
pub const DEFAULT_DATE_FORMAT: &str = "%d.%m.%Y";

/// 格式串能否格式化纯日期（时间字段或非法说明符会失败）
pub fn is_valid_date_format(format: &str) -> bool {
    let Some(sample) = NaiveDate::from_ymd_opt(2000, 12, 31) else {
        return false;
    };
    let mut out = String::new();
    !format.trim().is_empty() && write!(out, "{}", sample.format(format)).is_ok()
}

// ==========================================
// InvoiceSettings - 发票配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceSettings {
    pub number_prefix: String,
    pub start_number: u32,
    pub yearly_reset: bool,
    pub default_payment_term_days: i32,
    pub default_vat_rate: Decimal,
    pub currency: String,
    pub currency_symbol: String,
}

impl Default for InvoiceSettings {
    fn default() -> Self {
        Self {
            number_prefix: "RG".to_string(),
            start_number: 1,
            yearly_reset: true,
            default_payment_term_days: 14,
            default_vat_rate: DEFAULT_VAT_RATE,
            currency: "EUR".to_string(),
            currency_symbol: "€".to_string(),
        }
    }
}

impl InvoiceSettings {
    /// 编号规则
    pub fn number_policy(&self) -> InvoiceNumberPolicy {
        InvoiceNumberPolicy {
            prefix: self.number_prefix.clone(),
            start_number: self.start_number,
            yearly_reset: self.yearly_reset,
        }
    }
}

// ==========================================
// ApplicationSettings - 应用配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSettings {
    pub default_language: String,
    pub date_format: String, // chrono 格式串
    pub enable_audit_logs: bool,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            default_language: "de-DE".to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            enable_audit_logs: true,
        }
    }
}

impl ApplicationSettings {
    /// 按配置格式输出日期，格式不可用时退回默认格式
    pub fn format_date(&self, date: NaiveDate) -> String {
        let mut out = String::new();
        match write!(out, "{}", date.format(&self.date_format)) {
            Ok(()) => out,
            Err(_) => date.format(DEFAULT_DATE_FORMAT).to_string(),
        }
    }
}

// ==========================================
// SettingsReader Trait
// ==========================================
// 实现者: ConfigManager（config_kv），FixedSettings（测试/演示）
pub trait SettingsReader: Send + Sync {
    fn invoice_settings(&self) -> Result<InvoiceSettings, Box<dyn Error>>;

    fn application_settings(&self) -> Result<ApplicationSettings, Box<dyn Error>>;
}

/// 固定配置
#[derive(Debug, Clone, Default)]
pub struct FixedSettings {
    pub invoice: InvoiceSettings,
    pub application: ApplicationSettings,
}

impl SettingsReader for FixedSettings {
    fn invoice_settings(&self) -> Result<InvoiceSettings, Box<dyn Error>> {
        Ok(self.invoice.clone())
    }

    fn application_settings(&self) -> Result<ApplicationSettings, Box<dyn Error>> {
        Ok(self.application.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let s = InvoiceSettings::default();
        assert_eq!(s.default_vat_rate, dec!(20));
        assert_eq!(s.number_policy(), InvoiceNumberPolicy::default());
        assert!(ApplicationSettings::default().enable_audit_logs);
    }

    #[test]
    fn test_date_format_check() {
        assert!(is_valid_date_format("%d.%m.%Y"));
        assert!(is_valid_date_format("%Y-%m-%d"));
        assert!(!is_valid_date_format("%H:%M"));
        assert!(!is_valid_date_format(" "));

        let date = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let mut settings = ApplicationSettings::default();
        assert_eq!(settings.format_date(date), "15.03.2025");
        settings.date_format = "%H:%M".to_string();
        assert_eq!(settings.format_date(date), "15.03.2025");
    }
}
