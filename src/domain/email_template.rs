// ==========================================
// 中小企业 ERP - 邮件模板
// ==========================================
// 占位符语法: {{Key}}
// 未提供值的占位符原样保留，并在渲染结果中列出
// ==========================================

use crate::domain::audit::AuditInfo;
use crate::domain::error::{ValidationViolation, Violations};
use crate::domain::types::EmailTemplateType;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z][A-Za-z0-9_]*)\s*\}\}").expect("valid placeholder regex"));

/// 默认模板语言
pub const DEFAULT_TEMPLATE_LANGUAGE: &str = "de-DE";

/// 各模板类型的默认占位符
pub fn default_placeholders(template_type: EmailTemplateType) -> &'static [&'static str] {
    match template_type {
        EmailTemplateType::Invoice => &[
            "CustomerName",
            "InvoiceNumber",
            "InvoiceDate",
            "DueDate",
            "TotalAmount",
            "CompanyName",
        ],
        EmailTemplateType::PaymentReminder | EmailTemplateType::Dunning => &[
            "CustomerName",
            "InvoiceNumber",
            "DueDate",
            "DaysOverdue",
            "OutstandingAmount",
            "CompanyName",
        ],
        EmailTemplateType::Quote => &[
            "CustomerName",
            "QuoteNumber",
            "QuoteDate",
            "ValidUntil",
            "TotalAmount",
            "CompanyName",
        ],
        EmailTemplateType::General => &["CustomerName", "CompanyName", "Date"],
    }
}

/// 占位符列表的展示字符串，如 "{{CustomerName}}, {{CompanyName}}"
pub fn placeholder_list(template_type: EmailTemplateType) -> String {
    default_placeholders(template_type)
        .iter()
        .map(|p| format!("{{{{{}}}}}", p))
        .collect::<Vec<_>>()
        .join(", ")
}

/// 邮件优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmailPriority {
    Low,
    #[default]
    Normal,
    High,
}

impl EmailPriority {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            EmailPriority::Low => "LOW",
            EmailPriority::Normal => "NORMAL",
            EmailPriority::High => "HIGH",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "LOW" => EmailPriority::Low,
            "HIGH" => EmailPriority::High,
            _ => EmailPriority::Normal,
        }
    }
}

/// 渲染结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
    pub is_html: bool,
    pub bcc_email: Option<String>,
    pub reply_to_email: Option<String>,
    /// 未能替换的占位符（按首次出现顺序，去重）
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: i64,
    pub name: String,
    pub template_type: EmailTemplateType,
    pub subject: String,
    pub body: String,
    pub is_html: bool,
    pub is_default: bool,
    pub is_active: bool,
    pub language: String,
    pub description: Option<String>,
    pub available_placeholders: Option<String>,
    pub attach_pdf_automatically: bool,
    pub bcc_email: Option<String>,
    pub reply_to_email: Option<String>,
    pub priority: EmailPriority,
    pub audit: AuditInfo,
}

impl EmailTemplate {
    pub fn new(name: &str, template_type: EmailTemplateType, subject: &str, body: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            template_type,
            subject: subject.to_string(),
            body: body.to_string(),
            is_html: true,
            is_default: false,
            is_active: true,
            language: DEFAULT_TEMPLATE_LANGUAGE.to_string(),
            description: None,
            available_placeholders: Some(placeholder_list(template_type)),
            attach_pdf_automatically: true,
            bcc_email: None,
            reply_to_email: None,
            priority: EmailPriority::Normal,
            audit: AuditInfo::default(),
        }
    }

    /// 替换主题与正文中的占位符
    pub fn render(&self, values: &HashMap<String, String>) -> RenderedEmail {
        let mut missing: Vec<String> = Vec::new();
        let subject = substitute(&self.subject, values, &mut missing);
        let body = substitute(&self.body, values, &mut missing);
        RenderedEmail {
            subject,
            body,
            is_html: self.is_html,
            bcc_email: self.bcc_email.clone(),
            reply_to_email: self.reply_to_email.clone(),
            missing,
        }
    }

    /// 模板中实际使用的占位符
    pub fn used_placeholders(&self) -> Vec<String> {
        let mut used = Vec::new();
        for text in [&self.subject, &self.body] {
            for caps in PLACEHOLDER_REGEX.captures_iter(text) {
                let key = caps[1].to_string();
                if !used.contains(&key) {
                    used.push(key);
                }
            }
        }
        used
    }

    pub fn validate(&self) -> Vec<ValidationViolation> {
        let mut v = Violations::new();
        v.require("name", &self.name);
        v.max_len("name", &self.name, 100);
        v.require("subject", &self.subject);
        v.max_len("subject", &self.subject, 200);
        v.require("body", &self.body);
        v.require("language", &self.language);
        v.email("bcc_email", self.bcc_email.as_deref());
        v.email("reply_to_email", self.reply_to_email.as_deref());
        v.into_vec()
    }
}

fn substitute(text: &str, values: &HashMap<String, String>, missing: &mut Vec<String>) -> String {
    PLACEHOLDER_REGEX
        .replace_all(text, |caps: &Captures| {
            let key = &caps[1];
            match values.get(key) {
                Some(value) => value.clone(),
                None => {
                    if !missing.iter().any(|m| m == key) {
                        missing.push(key.to_string());
                    }
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_replaces_known_tokens() {
        let t = EmailTemplate::new(
            "Rechnung",
            EmailTemplateType::Invoice,
            "Rechnung {{InvoiceNumber}}",
            "Sehr geehrte/r {{CustomerName}},\nBetrag: {{ TotalAmount }}\n{{CompanyName}}",
        );
        let r = t.render(&values(&[
            ("InvoiceNumber", "RG-2025-0001"),
            ("CustomerName", "Max Mustermann"),
            ("TotalAmount", "120,00 EUR"),
            ("CompanyName", "Mustermann Consulting GmbH"),
        ]));
        assert_eq!(r.subject, "Rechnung RG-2025-0001");
        assert!(r.body.contains("Max Mustermann"));
        assert!(r.body.contains("Betrag: 120,00 EUR"));
        assert!(r.missing.is_empty());
    }

    #[test]
    fn test_render_reports_missing_once() {
        let t = EmailTemplate::new(
            "Mahnung",
            EmailTemplateType::Dunning,
            "{{InvoiceNumber}} überfällig",
            "{{InvoiceNumber}} seit {{DaysOverdue}} Tagen",
        );
        let r = t.render(&values(&[("DaysOverdue", "12")]));
        assert_eq!(r.subject, "{{InvoiceNumber}} überfällig");
        assert_eq!(r.body, "{{InvoiceNumber}} seit 12 Tagen");
        assert_eq!(r.missing, vec!["InvoiceNumber".to_string()]);
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(
            placeholder_list(EmailTemplateType::General),
            "{{CustomerName}}, {{CompanyName}}, {{Date}}"
        );
        let t = EmailTemplate::new("x", EmailTemplateType::General, "{{A}} {{B}}", "{{A}} {C}");
        assert_eq!(t.used_placeholders(), vec!["A".to_string(), "B".to_string()]);
        assert!(default_placeholders(EmailTemplateType::Quote).contains(&"ValidUntil"));
    }

    #[test]
    fn test_validate() {
        let mut t = EmailTemplate::new("x", EmailTemplateType::General, "s", "b");
        assert!(t.validate().is_empty());
        t.subject = String::new();
        t.bcc_email = Some("kaputt".to_string());
        let fields: Vec<String> = t.validate().into_iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["subject", "bcc_email"]);
    }
}
