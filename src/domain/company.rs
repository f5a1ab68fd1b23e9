// ==========================================
// 中小企业 ERP - 本公司信息
// ==========================================
// 单行记录: 发票抬头、银行账户、默认条款
// ==========================================

use crate::domain::audit::AuditInfo;
use crate::domain::customer::{DEFAULT_COUNTRY, DEFAULT_PAYMENT_TERM_DAYS};
use crate::domain::error::{ValidationViolation, Violations};
use crate::domain::item::DEFAULT_VAT_RATE;
use crate::domain::money::is_valid_percentage;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static HEX_COLOR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid color regex"));

/// 银行账户
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BankAccount {
    pub bank_name: Option<String>,
    pub iban: Option<String>,
    pub bic: Option<String>,
    pub account_holder: Option<String>,
}

impl BankAccount {
    pub fn is_empty(&self) -> bool {
        [&self.bank_name, &self.iban, &self.bic, &self.account_holder]
            .iter()
            .all(|v| v.as_deref().map(|s| s.trim().is_empty()).unwrap_or(true))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub legal_form: Option<String>,
    pub managing_director: Option<String>,
    pub street: String,
    pub zip_code: String,
    pub city: String,
    pub country: String,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub email: String,
    pub website: Option<String>,
    pub vat_id: Option<String>,
    pub tax_number: Option<String>,
    pub commercial_register: Option<String>,
    pub court: Option<String>,
    pub bank: BankAccount,
    pub second_bank: Option<BankAccount>,
    pub logo_path: Option<String>,
    pub company_color: Option<String>,
    pub secondary_color: Option<String>,
    pub default_payment_term_days: i32,
    pub default_vat_rate: Decimal,
    pub currency: String,
    pub additional_info: Option<String>,
    pub is_small_business: bool, // 小企业免税（Kleinunternehmer）
    pub small_business_text: Option<String>,
    pub audit: AuditInfo,
}

impl Company {
    pub fn new(name: &str, street: &str, zip_code: &str, city: &str, email: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            legal_form: None,
            managing_director: None,
            street: street.to_string(),
            zip_code: zip_code.to_string(),
            city: city.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
            phone: None,
            fax: None,
            email: email.to_string(),
            website: None,
            vat_id: None,
            tax_number: None,
            commercial_register: None,
            court: None,
            bank: BankAccount::default(),
            second_bank: None,
            logo_path: None,
            company_color: None,
            secondary_color: None,
            default_payment_term_days: DEFAULT_PAYMENT_TERM_DAYS,
            default_vat_rate: DEFAULT_VAT_RATE,
            currency: "EUR".to_string(),
            additional_info: None,
            is_small_business: false,
            small_business_text: None,
            audit: AuditInfo::default(),
        }
    }

    pub fn full_address(&self) -> String {
        format!("{}, {} {}, {}", self.street, self.zip_code, self.city, self.country)
    }

    /// 名称 + 法律形式，如 "Mustermann Consulting GmbH"
    pub fn full_name(&self) -> String {
        match self.legal_form.as_deref().map(str::trim) {
            Some(form) if !form.is_empty() && !self.name.ends_with(form) => {
                format!("{} {}", self.name, form)
            }
            _ => self.name.clone(),
        }
    }

    pub fn validate(&self) -> Vec<ValidationViolation> {
        let mut v = Violations::new();
        v.require("name", &self.name);
        v.max_len("name", &self.name, 200);
        v.require("street", &self.street);
        v.require("zip_code", &self.zip_code);
        v.require("city", &self.city);
        v.require("country", &self.country);
        v.require("email", &self.email);
        v.email("email", Some(&self.email));
        v.require("currency", &self.currency);

        for (field, color) in [
            ("company_color", &self.company_color),
            ("secondary_color", &self.secondary_color),
        ] {
            if let Some(c) = color.as_deref().filter(|c| !c.is_empty()) {
                if !HEX_COLOR_REGEX.is_match(c) {
                    v.push(field, format!("颜色必须为 #RRGGBB 格式: {}", c));
                }
            }
        }

        if !(0..=365).contains(&self.default_payment_term_days) {
            v.push("default_payment_term_days", "付款期限必须在 0 到 365 天之间");
        }
        if !is_valid_percentage(self.default_vat_rate) {
            v.push("default_vat_rate", "税率必须在 0 到 100 之间");
        }
        if self.is_small_business
            && self
                .small_business_text
                .as_deref()
                .map(|t| t.trim().is_empty())
                .unwrap_or(true)
        {
            v.push("small_business_text", "小企业免税需要填写说明文字");
        }
        v.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Company {
        let mut c = Company::new(
            "Mustermann Consulting",
            "Musterstraße 123",
            "1010",
            "Wien",
            "office@mustermann-consulting.at",
        );
        c.legal_form = Some("GmbH".to_string());
        c
    }

    #[test]
    fn test_names_and_address() {
        let c = sample();
        assert_eq!(c.full_name(), "Mustermann Consulting GmbH");
        assert_eq!(c.full_address(), "Musterstraße 123, 1010 Wien, Österreich");

        let mut already = sample();
        already.name = "Mustermann Consulting GmbH".to_string();
        assert_eq!(already.full_name(), "Mustermann Consulting GmbH");
    }

    #[test]
    fn test_validate() {
        assert!(sample().validate().is_empty());

        let mut c = sample();
        c.company_color = Some("blue".to_string());
        c.secondary_color = Some("#00ff00".to_string());
        c.default_vat_rate = dec!(-5);
        c.is_small_business = true;
        c.email = "nope".to_string();
        let fields: Vec<String> = c.validate().into_iter().map(|v| v.field).collect();
        assert_eq!(
            fields,
            vec!["email", "company_color", "default_vat_rate", "small_business_text"]
        );
    }

    #[test]
    fn test_bank_account_empty() {
        assert!(BankAccount::default().is_empty());
        let bank = BankAccount {
            iban: Some("AT61 1904 3002 3457 3201".to_string()),
            ..BankAccount::default()
        };
        assert!(!bank.is_empty());
    }
}
