// ==========================================
// 中小企业 ERP - 领域类型定义
// ==========================================
// 职责: 状态/单位/模板类型等枚举
// 约定: 数据库中以 SCREAMING_SNAKE_CASE 字符串存储
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 客户状态 (Customer Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    #[default]
    Active,   // 活跃客户
    Inactive, // 非活跃
    Blocked,  // 已冻结
    Prospect, // 潜在客户
}

impl CustomerStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            CustomerStatus::Active => "ACTIVE",
            CustomerStatus::Inactive => "INACTIVE",
            CustomerStatus::Blocked => "BLOCKED",
            CustomerStatus::Prospect => "PROSPECT",
        }
    }

    /// 从字符串解析状态（未知值回落为 Active）
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "INACTIVE" => CustomerStatus::Inactive,
            "BLOCKED" => CustomerStatus::Blocked,
            "PROSPECT" => CustomerStatus::Prospect,
            _ => CustomerStatus::Active,
        }
    }

    /// 本地化显示名称
    pub fn label(&self, locale: &str) -> String {
        let key = format!("customer_status.{}", self.to_db_str().to_lowercase());
        crate::i18n::t_locale(&key, locale)
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 发票状态 (Invoice Status)
// ==========================================
// 流转: DRAFT -> SENT -> PARTIALLY_PAID -> PAID
//       SENT/PARTIALLY_PAID -> OVERDUE (逾期刷新)
//       非 PAID 状态 -> CANCELLED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    #[default]
    Draft,         // 草稿（未发送）
    Sent,          // 已发送
    PartiallyPaid, // 部分付款
    Paid,          // 已结清
    Overdue,       // 逾期
    Cancelled,     // 已作废
}

impl InvoiceStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "DRAFT",
            InvoiceStatus::Sent => "SENT",
            InvoiceStatus::PartiallyPaid => "PARTIALLY_PAID",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Overdue => "OVERDUE",
            InvoiceStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "SENT" => InvoiceStatus::Sent,
            "PARTIALLY_PAID" => InvoiceStatus::PartiallyPaid,
            "PAID" => InvoiceStatus::Paid,
            "OVERDUE" => InvoiceStatus::Overdue,
            "CANCELLED" => InvoiceStatus::Cancelled,
            _ => InvoiceStatus::Draft,
        }
    }

    /// 是否仍有应收（已发送且未结清/未作废）
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Sent | InvoiceStatus::PartiallyPaid | InvoiceStatus::Overdue
        )
    }

    pub fn label(&self, locale: &str) -> String {
        let key = format!("invoice_status.{}", self.to_db_str().to_lowercase());
        crate::i18n::t_locale(&key, locale)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 邮件模板类型 (Email Template Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmailTemplateType {
    Invoice,         // 发票发送
    PaymentReminder, // 付款提醒
    Dunning,         // 催款
    Quote,           // 报价
    General,         // 一般往来
}

impl EmailTemplateType {
    pub const ALL: [EmailTemplateType; 5] = [
        EmailTemplateType::Invoice,
        EmailTemplateType::PaymentReminder,
        EmailTemplateType::Dunning,
        EmailTemplateType::Quote,
        EmailTemplateType::General,
    ];

    pub fn to_db_str(&self) -> &'static str {
        match self {
            EmailTemplateType::Invoice => "INVOICE",
            EmailTemplateType::PaymentReminder => "PAYMENT_REMINDER",
            EmailTemplateType::Dunning => "DUNNING",
            EmailTemplateType::Quote => "QUOTE",
            EmailTemplateType::General => "GENERAL",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "INVOICE" => EmailTemplateType::Invoice,
            "PAYMENT_REMINDER" => EmailTemplateType::PaymentReminder,
            "DUNNING" => EmailTemplateType::Dunning,
            "QUOTE" => EmailTemplateType::Quote,
            _ => EmailTemplateType::General,
        }
    }

    pub fn label(&self, locale: &str) -> String {
        let key = format!("template_type.{}", self.to_db_str().to_lowercase());
        crate::i18n::t_locale(&key, locale)
    }
}

impl fmt::Display for EmailTemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 计量单位 (Unit)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Unit {
    #[default]
    Piece,       // 件
    Kilogram,    // 千克
    Meter,       // 米
    SquareMeter, // 平方米
    CubicMeter,  // 立方米
    Liter,       // 升
    Hour,        // 小时（服务）
    Day,         // 天（服务）
    Flat,        // 包干（服务）
}

impl Unit {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Unit::Piece => "PIECE",
            Unit::Kilogram => "KILOGRAM",
            Unit::Meter => "METER",
            Unit::SquareMeter => "SQUARE_METER",
            Unit::CubicMeter => "CUBIC_METER",
            Unit::Liter => "LITER",
            Unit::Hour => "HOUR",
            Unit::Day => "DAY",
            Unit::Flat => "FLAT",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "KILOGRAM" => Unit::Kilogram,
            "METER" => Unit::Meter,
            "SQUARE_METER" => Unit::SquareMeter,
            "CUBIC_METER" => Unit::CubicMeter,
            "LITER" => Unit::Liter,
            "HOUR" => Unit::Hour,
            "DAY" => Unit::Day,
            "FLAT" => Unit::Flat,
            _ => Unit::Piece,
        }
    }

    /// 发票上打印的单位缩写
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Piece => "Stk",
            Unit::Kilogram => "kg",
            Unit::Meter => "m",
            Unit::SquareMeter => "m²",
            Unit::CubicMeter => "m³",
            Unit::Liter => "l",
            Unit::Hour => "Std",
            Unit::Day => "Tag",
            Unit::Flat => "pauschal",
        }
    }

    pub fn label(&self, locale: &str) -> String {
        let key = format!("unit.{}", self.to_db_str().to_lowercase());
        crate::i18n::t_locale(&key, locale)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 商品类别 (Item Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    Product, // 实物商品（有库存）
    Service, // 服务（无库存）
}

impl ItemKind {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ItemKind::Product => "PRODUCT",
            ItemKind::Service => "SERVICE",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "SERVICE" => ItemKind::Service,
            _ => ItemKind::Product,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 库存状态 (Stock Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    OutOfStock,  // 无货
    Low,         // 低于最低库存
    Overstocked, // 超过最高库存
    Normal,      // 正常
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockStatus::OutOfStock => write!(f, "OUT_OF_STOCK"),
            StockStatus::Low => write!(f, "LOW"),
            StockStatus::Overstocked => write!(f, "OVERSTOCKED"),
            StockStatus::Normal => write!(f, "NORMAL"),
        }
    }
}
