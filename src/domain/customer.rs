// ==========================================
// 中小企业 ERP - 客户实体
// ==========================================
// 职责: 客户主数据 + 付款条件相关计算
// 红线: 客户编号一经分配不可复用
// ==========================================

use crate::domain::audit::AuditInfo;
use crate::domain::error::{ValidationViolation, Violations};
use crate::domain::money::{percent_of, round_money, HUNDRED};
use crate::domain::types::CustomerStatus;
use crate::domain::invoice::add_days;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 默认账单国家
pub const DEFAULT_COUNTRY: &str = "Österreich";

/// 默认付款期限（天）
pub const DEFAULT_PAYMENT_TERM_DAYS: i32 = 14;

/// 期限类字段上限（天）
pub const MAX_TERM_DAYS: i32 = 365;

// ==========================================
// Customer - 客户
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,                 // 主键（未持久化时为 0）
    pub customer_number: String, // 客户编号 KD000001

    // ===== 名称与联系人 =====
    pub company_name: Option<String>,
    pub contact_first_name: String,
    pub contact_last_name: String,
    pub email: Option<String>,
    pub alternative_email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub fax: Option<String>,
    pub website: Option<String>,

    // ===== 账单地址 =====
    pub billing_street: String,
    pub billing_zip_code: String,
    pub billing_city: String,
    pub billing_country: String,

    // ===== 收货地址（可选）=====
    pub shipping_street: Option<String>,
    pub shipping_zip_code: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_country: Option<String>,

    // ===== 税务 =====
    pub vat_id: Option<String>,
    pub tax_number: Option<String>,

    // ===== 付款条件 =====
    pub payment_term_days: i32,
    pub discount_percentage: Option<Decimal>, // 现金折扣 (Skonto) %
    pub discount_days: Option<i32>,           // 现金折扣有效天数
    pub credit_limit: Option<Decimal>,

    pub status: CustomerStatus,
    pub last_contact_date: Option<NaiveDateTime>,
    pub notes: Option<String>,

    pub audit: AuditInfo,
}

impl Customer {
    /// 以最少必填字段构造新客户（编号由 API 层分配）
    pub fn new(
        contact_first_name: &str,
        contact_last_name: &str,
        billing_street: &str,
        billing_zip_code: &str,
        billing_city: &str,
    ) -> Self {
        Self {
            id: 0,
            customer_number: String::new(),
            company_name: None,
            contact_first_name: contact_first_name.to_string(),
            contact_last_name: contact_last_name.to_string(),
            email: None,
            alternative_email: None,
            phone: None,
            mobile: None,
            fax: None,
            website: None,
            billing_street: billing_street.to_string(),
            billing_zip_code: billing_zip_code.to_string(),
            billing_city: billing_city.to_string(),
            billing_country: DEFAULT_COUNTRY.to_string(),
            shipping_street: None,
            shipping_zip_code: None,
            shipping_city: None,
            shipping_country: None,
            vat_id: None,
            tax_number: None,
            payment_term_days: DEFAULT_PAYMENT_TERM_DAYS,
            discount_percentage: None,
            discount_days: None,
            credit_limit: None,
            status: CustomerStatus::Active,
            last_contact_date: None,
            notes: None,
            audit: AuditInfo::default(),
        }
    }

    /// 联系人全名
    pub fn contact_full_name(&self) -> String {
        format!("{} {}", self.contact_first_name, self.contact_last_name)
            .trim()
            .to_string()
    }

    /// 显示名称: 有公司名用公司名，否则用联系人
    pub fn display_name(&self) -> String {
        match self.company_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.contact_full_name(),
        }
    }

    /// 账单地址单行格式
    pub fn billing_address(&self) -> String {
        format!(
            "{}, {} {}, {}",
            self.billing_street, self.billing_zip_code, self.billing_city, self.billing_country
        )
    }

    /// 收货地址单行格式（未设置收货街道时为 None）
    pub fn shipping_address(&self) -> Option<String> {
        let street = self.shipping_street.as_deref().map(str::trim)?;
        if street.is_empty() {
            return None;
        }
        Some(format!(
            "{}, {} {}, {}",
            street,
            self.shipping_zip_code.as_deref().unwrap_or(""),
            self.shipping_city.as_deref().unwrap_or(""),
            self.shipping_country.as_deref().unwrap_or(&self.billing_country)
        ))
    }

    /// 实际收货地址: 收货地址优先，否则账单地址
    pub fn effective_shipping_address(&self) -> String {
        self.shipping_address()
            .unwrap_or_else(|| self.billing_address())
    }

    /// 到期日 = 发票日期 + 付款期限（溢出时取发票日期）
    pub fn calculate_due_date(&self, invoice_date: NaiveDate) -> NaiveDate {
        add_days(invoice_date, self.payment_term_days).unwrap_or(invoice_date)
    }

    /// 现金折扣金额（无折扣为 0）
    pub fn calculate_discount_amount(&self, amount: Decimal) -> Decimal {
        match self.discount_percentage {
            Some(pct) if pct > Decimal::ZERO => round_money(percent_of(amount, pct)),
            _ => Decimal::ZERO,
        }
    }

    /// 现金折扣在 today 是否仍有效
    pub fn is_discount_valid(&self, invoice_date: NaiveDate, today: NaiveDate) -> bool {
        match (self.discount_percentage, self.discount_days) {
            (Some(pct), Some(days)) if pct > Decimal::ZERO => {
                add_days(invoice_date, days).is_some_and(|last| today <= last)
            }
            _ => false,
        }
    }

    /// 是否至少有一种联系方式
    pub fn has_contact_channel(&self) -> bool {
        [&self.email, &self.phone, &self.mobile]
            .iter()
            .any(|v| v.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false))
    }

    /// 字段校验
    pub fn validate(&self) -> Vec<ValidationViolation> {
        let mut v = Violations::new();

        v.require("contact_first_name", &self.contact_first_name);
        v.require("contact_last_name", &self.contact_last_name);
        v.max_len("contact_first_name", &self.contact_first_name, 100);
        v.max_len("contact_last_name", &self.contact_last_name, 100);
        if let Some(name) = &self.company_name {
            v.max_len("company_name", name, 200);
        }

        v.require("billing_street", &self.billing_street);
        v.require("billing_zip_code", &self.billing_zip_code);
        v.require("billing_city", &self.billing_city);
        v.require("billing_country", &self.billing_country);

        v.email("email", self.email.as_deref());
        v.email("alternative_email", self.alternative_email.as_deref());
        if !self.has_contact_channel() {
            v.push("email", "邮箱、电话、手机至少填写一项");
        }

        if !(0..=MAX_TERM_DAYS).contains(&self.payment_term_days) {
            v.push("payment_term_days", "付款期限必须在 0 到 365 天之间");
        }
        if let Some(pct) = self.discount_percentage {
            if pct < Decimal::ZERO || pct > HUNDRED {
                v.push("discount_percentage", "现金折扣必须在 0 到 100 之间");
            }
        }
        if let Some(days) = self.discount_days {
            if !(0..=MAX_TERM_DAYS).contains(&days) {
                v.push("discount_days", "现金折扣天数必须在 0 到 365 之间");
            }
        }
        if let Some(limit) = self.credit_limit {
            if limit < Decimal::ZERO {
                v.push("credit_limit", "信用额度不能为负");
            }
        }

        v.into_vec()
    }
}
