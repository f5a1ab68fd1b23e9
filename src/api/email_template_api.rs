// ==========================================
// 中小企业 ERP - 邮件模板 API
// ==========================================
// 职责: 模板维护、默认模板切换、发票邮件渲染（不负责发送）
// 红线: 每种类型最多一个默认模板
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::api::action_recorder::ActionRecorder;
use crate::api::error::{config_error, ApiError, ApiResult};
use crate::api::validator::{ensure_valid, require_id, require_operator};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::audit::AuditInfo;
use crate::domain::email_template::{default_placeholders, placeholder_list, EmailTemplate, RenderedEmail};
use crate::domain::invoice::Invoice;
use crate::domain::money::format_amount_de;
use crate::domain::types::EmailTemplateType;
use crate::repository::company_repo::CompanyRepository;
use crate::repository::customer_repo::CustomerRepository;
use crate::repository::email_template_repo::EmailTemplateRepository;
use crate::repository::invoice_repo::InvoiceRepository;

// ==========================================
// EmailTemplateApi - 邮件模板 API
// ==========================================
pub struct EmailTemplateApi {
    template_repo: Arc<EmailTemplateRepository>,
    invoice_repo: Arc<InvoiceRepository>,
    customer_repo: Arc<CustomerRepository>,
    company_repo: Arc<CompanyRepository>,
    recorder: Arc<ActionRecorder>,
}

impl EmailTemplateApi {
    pub fn new(
        template_repo: Arc<EmailTemplateRepository>,
        invoice_repo: Arc<InvoiceRepository>,
        customer_repo: Arc<CustomerRepository>,
        company_repo: Arc<CompanyRepository>,
        recorder: Arc<ActionRecorder>,
    ) -> Self {
        Self {
            template_repo,
            invoice_repo,
            customer_repo,
            company_repo,
            recorder,
        }
    }

    /// 新建模板（未指定占位符说明时按类型补全）
    pub fn create_template(&self, mut template: EmailTemplate, operator: &str) -> ApiResult<EmailTemplate> {
        require_operator(operator)?;
        ensure_valid(template.validate())?;
        if template.is_default {
            ensure_can_be_default(&template)?;
        }

        if template.available_placeholders.is_none() {
            template.available_placeholders = Some(placeholder_list(template.template_type));
        }
        template.id = 0;
        template.audit = AuditInfo::now(Some(operator));
        template.id = self.template_repo.insert(&template)?;

        info!(
            template_id = template.id,
            template_type = template.template_type.to_db_str(),
            is_default = template.is_default,
            "邮件模板已创建"
        );
        self.recorder.record(
            ActionLog::new(ActionType::CreateTemplate, Some(template.id.to_string()), operator)
                .with_payload(serde_json::json!({
                    "name": template.name,
                    "template_type": template.template_type.to_db_str(),
                    "is_default": template.is_default,
                }))
                .with_detail(format!("新建邮件模板 {}", template.name)),
        )?;
        Ok(template)
    }

    /// 修改模板内容（默认标记通过 set_default 切换）
    pub fn update_template(&self, mut template: EmailTemplate, operator: &str) -> ApiResult<EmailTemplate> {
        require_operator(operator)?;
        require_id("template_id", template.id)?;
        ensure_valid(template.validate())?;

        let existing = self.get_template(template.id)?;
        template.is_default = existing.is_default;
        if template.is_default {
            ensure_can_be_default(&template)?;
        }
        template.audit = existing.audit;
        template.audit.mark_updated(Some(operator), Utc::now().naive_utc());
        self.template_repo.update(&template)?;

        let unknown: Vec<String> = template
            .used_placeholders()
            .into_iter()
            .filter(|p| !default_placeholders(template.template_type).contains(&p.as_str()))
            .collect();
        if !unknown.is_empty() {
            warn!(template_id = template.id, unknown = ?unknown, "模板使用了非标准占位符");
        }

        info!(template_id = template.id, "邮件模板已更新");
        self.recorder.record(
            ActionLog::new(ActionType::UpdateTemplate, Some(template.id.to_string()), operator)
                .with_detail(format!("修改邮件模板 {}", template.name)),
        )?;
        Ok(template)
    }

    pub fn get_template(&self, id: i64) -> ApiResult<EmailTemplate> {
        self.template_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("邮件模板(id={})不存在", id)))
    }

    pub fn list_templates(&self) -> ApiResult<Vec<EmailTemplate>> {
        Ok(self.template_repo.list_all()?)
    }

    /// 某类型的模板（默认模板在前）
    pub fn list_by_type(&self, template_type: EmailTemplateType) -> ApiResult<Vec<EmailTemplate>> {
        let templates = self.template_repo.list_by_type(template_type)?;
        debug!(template_type = template_type.to_db_str(), count = templates.len(), "查询邮件模板");
        Ok(templates)
    }

    pub fn get_default_template(&self, template_type: EmailTemplateType) -> ApiResult<EmailTemplate> {
        self.template_repo
            .find_default(template_type)?
            .ok_or_else(|| ApiError::NotFound(format!("{}类型没有默认邮件模板", template_type)))
    }

    /// 设为同类型的默认模板
    pub fn set_default(&self, id: i64, operator: &str) -> ApiResult<EmailTemplate> {
        require_operator(operator)?;
        let template = self.get_template(id)?;
        ensure_can_be_default(&template)?;

        self.template_repo
            .set_default(id, Some(operator), &Utc::now().naive_utc())?;

        info!(template_id = id, template_type = template.template_type.to_db_str(), "默认邮件模板已切换");
        self.recorder.record(
            ActionLog::new(ActionType::SetDefaultTemplate, Some(id.to_string()), operator)
                .with_payload(serde_json::json!({
                    "template_type": template.template_type.to_db_str(),
                }))
                .with_detail(format!("设为默认模板 {}", template.name)),
        )?;
        self.get_template(id)
    }

    /// 软删除模板
    pub fn delete_template(&self, id: i64, operator: &str) -> ApiResult<()> {
        require_operator(operator)?;
        let template = self.get_template(id)?;
        self.template_repo
            .soft_delete(id, Some(operator), &Utc::now().naive_utc())?;

        if template.is_default {
            warn!(template_id = id, template_type = template.template_type.to_db_str(), "已删除默认模板，该类型暂无默认模板");
        }
        info!(template_id = id, "邮件模板已删除");
        self.recorder.record(
            ActionLog::new(ActionType::DeleteTemplate, Some(id.to_string()), operator)
                .with_detail(format!("删除邮件模板 {}", template.name)),
        )?;
        Ok(())
    }

    // ==========================================
    // 渲染
    // ==========================================

    /// 用某类型的默认模板渲染发票邮件
    ///
    /// 未提供值的占位符保留原样，并在 `missing` 中列出
    pub fn render_invoice_email(
        &self,
        invoice_id: i64,
        template_type: EmailTemplateType,
        today: NaiveDate,
    ) -> ApiResult<RenderedEmail> {
        let template = self.get_default_template(template_type)?;
        let invoice = self
            .invoice_repo
            .find_by_id(invoice_id)?
            .ok_or_else(|| ApiError::NotFound(format!("发票(id={})不存在", invoice_id)))?;

        let values = self.invoice_values(&invoice, today)?;
        let rendered = template.render(&values);
        if !rendered.missing.is_empty() {
            warn!(
                template_id = template.id,
                invoice_number = %invoice.invoice_number,
                missing = ?rendered.missing,
                "邮件模板存在未填充的占位符"
            );
        }
        Ok(rendered)
    }

    fn invoice_values(&self, invoice: &Invoice, today: NaiveDate) -> ApiResult<HashMap<String, String>> {
        let settings = self.recorder.settings();
        let invoice_settings = settings.invoice_settings().map_err(config_error)?;
        let app_settings = settings.application_settings().map_err(config_error)?;
        let amount = |value: Decimal| format!("{} {}", format_amount_de(value), invoice_settings.currency_symbol);

        let mut values = HashMap::new();
        values.insert("InvoiceNumber".to_string(), invoice.invoice_number.clone());
        values.insert("InvoiceDate".to_string(), app_settings.format_date(invoice.invoice_date));
        values.insert("DueDate".to_string(), app_settings.format_date(invoice.due_date));
        values.insert("TotalAmount".to_string(), amount(invoice.total_amount));
        values.insert("OutstandingAmount".to_string(), amount(invoice.outstanding_amount()));
        values.insert("DaysOverdue".to_string(), invoice.days_overdue(today).to_string());
        values.insert("Date".to_string(), app_settings.format_date(today));

        if let Some(customer) = self.customer_repo.find_by_id(invoice.customer_id, true)? {
            values.insert("CustomerName".to_string(), customer.display_name());
        }
        if let Some(company) = self.company_repo.get()? {
            values.insert("CompanyName".to_string(), company.full_name());
        }
        Ok(values)
    }
}

/// 默认模板必须处于启用状态
fn ensure_can_be_default(template: &EmailTemplate) -> ApiResult<()> {
    if template.is_active {
        return Ok(());
    }
    Err(ApiError::BusinessRuleViolation(format!(
        "邮件模板{}已停用，不能作为默认模板",
        template.name
    )))
}
