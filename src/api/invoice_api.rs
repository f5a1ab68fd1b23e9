// ==========================================
// 中小企业 ERP - 发票 API
// ==========================================
// 职责: 开票（分配编号）、明细维护、发送、收款、作废、逾期刷新
// 红线: 金额由领域层汇总，API 不做金额运算
// 红线: 仅草稿可改明细或删除；编号不复用（含已删除发票）
// ==========================================

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::action_recorder::ActionRecorder;
use crate::api::error::{config_error, ApiError, ApiResult};
use crate::api::validator::{ensure_valid, require_id, require_operator, require_percentage, require_positive};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::audit::AuditInfo;
use crate::domain::invoice::{Invoice, InvoiceLine};
use crate::domain::numbering::{invoice_year_prefix, next_invoice_number};
use crate::domain::types::{CustomerStatus, InvoiceStatus, Unit};
use crate::i18n::t_with_args;
use crate::perf::PerfGuard;
use crate::repository::customer_repo::CustomerRepository;
use crate::repository::error::RepositoryError;
use crate::repository::invoice_repo::InvoiceRepository;
use crate::repository::item_repo::ItemRepository;

/// 编号冲突时的最大重试次数
const NUMBER_RETRY_LIMIT: usize = 3;

// ==========================================
// 请求类型
// ==========================================

/// 开票请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvoiceRequest {
    pub customer_id: i64,
    pub invoice_date: NaiveDate,
    pub service_date: Option<NaiveDate>,
    /// 覆盖客户的付款期限
    pub payment_term_days: Option<i32>,
    pub subject: Option<String>,
    pub introduction_text: Option<String>,
    pub conclusion_text: Option<String>,
    pub internal_notes: Option<String>,
    pub customer_reference: Option<String>,
    pub project_number: Option<String>,
}

impl CreateInvoiceRequest {
    pub fn new(customer_id: i64, invoice_date: NaiveDate) -> Self {
        Self {
            customer_id,
            invoice_date,
            service_date: None,
            payment_term_days: None,
            subject: None,
            introduction_text: None,
            conclusion_text: None,
            internal_notes: None,
            customer_reference: None,
            project_number: None,
        }
    }
}

/// 新增明细：目录条目或自由行
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NewLine {
    Catalog {
        item_id: i64,
        quantity: Decimal,
        discount_percentage: Option<Decimal>,
        additional_info: Option<String>,
    },
    Free {
        description: String,
        quantity: Decimal,
        unit: Unit,
        unit_price: Decimal,
        /// 为空时使用默认税率
        vat_rate: Option<Decimal>,
        discount_percentage: Option<Decimal>,
        additional_info: Option<String>,
    },
}

/// 明细修改（None 表示不变）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineUpdate {
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub vat_rate: Option<Decimal>,
    /// Some(None) 表示取消折扣
    pub discount_percentage: Option<Option<Decimal>>,
    pub additional_info: Option<String>,
}

// ==========================================
// InvoiceApi - 发票 API
// ==========================================
pub struct InvoiceApi {
    invoice_repo: Arc<InvoiceRepository>,
    customer_repo: Arc<CustomerRepository>,
    item_repo: Arc<ItemRepository>,
    recorder: Arc<ActionRecorder>,
}

impl InvoiceApi {
    pub fn new(
        invoice_repo: Arc<InvoiceRepository>,
        customer_repo: Arc<CustomerRepository>,
        item_repo: Arc<ItemRepository>,
        recorder: Arc<ActionRecorder>,
    ) -> Self {
        Self {
            invoice_repo,
            customer_repo,
            item_repo,
            recorder,
        }
    }

    // ==========================================
    // 编号
    // ==========================================

    fn allocate_number(&self, invoice_date: NaiveDate) -> ApiResult<String> {
        let settings = self
            .recorder
            .settings()
            .invoice_settings()
            .map_err(config_error)?;
        let policy = settings.number_policy();

        let scope = if policy.yearly_reset {
            invoice_year_prefix(&policy.prefix, invoice_date.year())
        } else {
            format!("{}-", policy.prefix)
        };
        let existing = self.invoice_repo.invoice_numbers_with_prefix(&scope)?;
        Ok(next_invoice_number(&policy, invoice_date.year(), &existing))
    }

    /// 预览下一个发票编号（不占用）
    pub fn preview_next_invoice_number(&self, invoice_date: NaiveDate) -> ApiResult<String> {
        self.allocate_number(invoice_date)
    }

    // ==========================================
    // 开票
    // ==========================================

    /// 新建草稿发票
    ///
    /// - 付款期限: 请求覆盖 > 客户条款 > 默认配置（客户条款为 0 时）
    /// - 现金折扣 (Skonto) 复制自客户
    pub fn create_invoice(&self, request: CreateInvoiceRequest, operator: &str) -> ApiResult<Invoice> {
        let _perf = PerfGuard::new("invoice_api.create_invoice");
        require_operator(operator)?;
        require_id("customer_id", request.customer_id)?;

        let customer = self
            .customer_repo
            .find_by_id(request.customer_id, false)?
            .ok_or_else(|| ApiError::NotFound(format!("客户(id={})不存在", request.customer_id)))?;
        if customer.status == CustomerStatus::Blocked {
            return Err(ApiError::BusinessRuleViolation(format!(
                "客户{}已冻结，不能开票",
                customer.customer_number
            )));
        }

        let settings = self
            .recorder
            .settings()
            .invoice_settings()
            .map_err(config_error)?;
        let term_days = match request.payment_term_days {
            Some(days) => days,
            None if customer.payment_term_days > 0 => customer.payment_term_days,
            None => settings.default_payment_term_days,
        };

        let mut invoice = Invoice::new(customer.id, request.invoice_date, term_days);
        invoice.service_date = request.service_date;
        invoice.discount_percentage = customer.discount_percentage;
        invoice.discount_days = customer.discount_days;
        invoice.subject = request.subject;
        invoice.introduction_text = request.introduction_text;
        invoice.conclusion_text = request.conclusion_text;
        invoice.internal_notes = request.internal_notes;
        invoice.customer_reference = request.customer_reference;
        invoice.project_number = request.project_number;
        invoice.audit = AuditInfo::now(Some(operator));
        ensure_valid(invoice.validate())?;

        let mut attempt = 0;
        let id = loop {
            attempt += 1;
            invoice.invoice_number = self.allocate_number(invoice.invoice_date)?;
            match self.invoice_repo.insert(&invoice) {
                Ok(id) => break id,
                Err(RepositoryError::UniqueConstraintViolation(msg)) if attempt < NUMBER_RETRY_LIMIT => {
                    warn!(invoice_number = %invoice.invoice_number, error = %msg, "发票编号冲突，重试");
                }
                Err(e) => return Err(e.into()),
            }
        };
        invoice.id = id;

        info!(
            invoice_id = id,
            invoice_number = %invoice.invoice_number,
            customer_id = customer.id,
            due_date = %invoice.due_date,
            "发票已创建"
        );
        self.recorder.record(
            ActionLog::new(ActionType::CreateInvoice, Some(id.to_string()), operator)
                .with_payload(serde_json::json!({
                    "invoice_number": invoice.invoice_number,
                    "customer_number": customer.customer_number,
                    "invoice_date": invoice.invoice_date.to_string(),
                    "due_date": invoice.due_date.to_string(),
                }))
                .with_detail(format!("新建发票 {}", invoice.invoice_number)),
        )?;
        Ok(invoice)
    }

    // ==========================================
    // 明细维护（仅草稿）
    // ==========================================

    fn load_draft(&self, invoice_id: i64) -> ApiResult<Invoice> {
        let invoice = self.get_invoice(invoice_id)?;
        if !invoice.is_editable() {
            return Err(ApiError::BusinessRuleViolation(t_with_args(
                "invoice.not_editable",
                &[("number", &invoice.invoice_number)],
            )));
        }
        Ok(invoice)
    }

    /// 保存并重新加载（明细主键在保存后重建）
    fn save_and_reload(&self, mut invoice: Invoice, operator: &str) -> ApiResult<Invoice> {
        invoice.audit.mark_updated(Some(operator), Utc::now().naive_utc());
        self.invoice_repo.save(&invoice)?;
        self.get_invoice(invoice.id)
    }

    /// 新增明细，返回更新后的发票
    pub fn add_line(&self, invoice_id: i64, new_line: NewLine, operator: &str) -> ApiResult<Invoice> {
        require_operator(operator)?;
        let mut invoice = self.load_draft(invoice_id)?;
        let now = Utc::now().naive_utc();

        let mut line = match new_line {
            NewLine::Catalog {
                item_id,
                quantity,
                discount_percentage,
                additional_info,
            } => {
                let item = self
                    .item_repo
                    .find_by_id(item_id)?
                    .ok_or_else(|| ApiError::NotFound(format!("条目(id={})不存在", item_id)))?;
                if !item.is_active {
                    return Err(ApiError::BusinessRuleViolation(format!(
                        "条目{}已停用，不能开票",
                        item.item_number
                    )));
                }
                let mut line = InvoiceLine::from_item(&item, quantity);
                line.discount_percentage = discount_percentage;
                line.additional_info = additional_info;
                line
            }
            NewLine::Free {
                description,
                quantity,
                unit,
                unit_price,
                vat_rate,
                discount_percentage,
                additional_info,
            } => {
                let vat_rate = match vat_rate {
                    Some(rate) => rate,
                    None => {
                        self.recorder
                            .settings()
                            .invoice_settings()
                            .map_err(config_error)?
                            .default_vat_rate
                    }
                };
                let mut line = InvoiceLine::new(description.trim(), quantity, unit_price, vat_rate);
                line.unit = unit;
                line.discount_percentage = discount_percentage;
                line.additional_info = additional_info;
                line
            }
        };
        line.audit = AuditInfo::new(Some(operator), now);

        let position = invoice.add_line(line)?;
        let invoice = self.save_and_reload(invoice, operator)?;

        info!(invoice_id, position, net_amount = %invoice.net_amount, "发票明细已新增");
        self.recorder.record(
            ActionLog::new(ActionType::UpdateInvoice, Some(invoice_id.to_string()), operator)
                .with_payload(serde_json::json!({ "op": "ADD_LINE", "position": position }))
                .with_detail(format!("发票 {} 新增第{}行", invoice.invoice_number, position)),
        )?;
        Ok(invoice)
    }

    /// 修改明细
    pub fn update_line(
        &self,
        invoice_id: i64,
        position: i32,
        update: LineUpdate,
        operator: &str,
    ) -> ApiResult<Invoice> {
        require_operator(operator)?;
        if let Some(Some(pct)) = update.discount_percentage {
            require_percentage("discount_percentage", pct)?;
        }
        let mut invoice = self.load_draft(invoice_id)?;
        let now = Utc::now().naive_utc();

        invoice.update_line(position, |line| {
            if let Some(description) = update.description {
                line.description = description.trim().to_string();
            }
            if let Some(quantity) = update.quantity {
                line.quantity = quantity;
            }
            if let Some(unit_price) = update.unit_price {
                line.unit_price = unit_price;
            }
            if let Some(vat_rate) = update.vat_rate {
                line.vat_rate = vat_rate;
            }
            if let Some(discount) = update.discount_percentage {
                line.discount_percentage = discount;
            }
            if let Some(info) = update.additional_info {
                line.additional_info = Some(info);
            }
            line.audit.mark_updated(Some(operator), now);
        })?;
        let invoice = self.save_and_reload(invoice, operator)?;

        info!(invoice_id, position, net_amount = %invoice.net_amount, "发票明细已修改");
        self.recorder.record(
            ActionLog::new(ActionType::UpdateInvoice, Some(invoice_id.to_string()), operator)
                .with_payload(serde_json::json!({ "op": "UPDATE_LINE", "position": position }))
                .with_detail(format!("发票 {} 修改第{}行", invoice.invoice_number, position)),
        )?;
        Ok(invoice)
    }

    /// 删除明细（软删除，行号不复用）
    pub fn remove_line(&self, invoice_id: i64, position: i32, operator: &str) -> ApiResult<Invoice> {
        require_operator(operator)?;
        let mut invoice = self.load_draft(invoice_id)?;
        invoice.remove_line(position, Some(operator))?;
        let invoice = self.save_and_reload(invoice, operator)?;

        info!(invoice_id, position, "发票明细已删除");
        self.recorder.record(
            ActionLog::new(ActionType::UpdateInvoice, Some(invoice_id.to_string()), operator)
                .with_payload(serde_json::json!({ "op": "REMOVE_LINE", "position": position }))
                .with_detail(format!("发票 {} 删除第{}行", invoice.invoice_number, position)),
        )?;
        Ok(invoice)
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn get_invoice(&self, id: i64) -> ApiResult<Invoice> {
        self.invoice_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("发票(id={})不存在", id)))
    }

    pub fn get_invoice_by_number(&self, invoice_number: &str) -> ApiResult<Invoice> {
        self.invoice_repo
            .find_by_number(invoice_number.trim())?
            .ok_or_else(|| ApiError::NotFound(format!("发票({})不存在", invoice_number)))
    }

    /// 客户的发票（新到旧）
    pub fn list_by_customer(&self, customer_id: i64) -> ApiResult<Vec<Invoice>> {
        let invoices = self.invoice_repo.find_by_customer(customer_id)?;
        debug!(customer_id, count = invoices.len(), "查询客户发票");
        Ok(invoices)
    }

    pub fn list_by_status(&self, status: InvoiceStatus) -> ApiResult<Vec<Invoice>> {
        Ok(self.invoice_repo.list_by_status(status)?)
    }

    /// 截至 today 已逾期的未结发票
    pub fn list_overdue(&self, today: NaiveDate) -> ApiResult<Vec<Invoice>> {
        let invoices = self.invoice_repo.list_overdue(today)?;
        debug!(today = %today, count = invoices.len(), "查询逾期发票");
        Ok(invoices)
    }

    pub fn sum_outstanding(&self) -> ApiResult<Decimal> {
        Ok(self.invoice_repo.sum_outstanding()?)
    }

    // ==========================================
    // 状态流转
    // ==========================================

    fn persist_header(&self, invoice: &mut Invoice, operator: &str) -> ApiResult<()> {
        invoice.audit.mark_updated(Some(operator), Utc::now().naive_utc());
        self.invoice_repo.update_header(invoice)?;
        Ok(())
    }

    /// 发送（草稿 -> 已发送）
    pub fn mark_sent(&self, id: i64, sent_date: NaiveDate, operator: &str) -> ApiResult<Invoice> {
        require_operator(operator)?;
        let mut invoice = self.get_invoice(id)?;
        invoice.mark_sent(sent_date)?;
        self.persist_header(&mut invoice, operator)?;

        info!(invoice_id = id, invoice_number = %invoice.invoice_number, total = %invoice.total_amount, "发票已发送");
        self.recorder.record(
            ActionLog::new(ActionType::SendInvoice, Some(id.to_string()), operator)
                .with_payload(serde_json::json!({
                    "sent_date": sent_date.to_string(),
                    "total_amount": invoice.total_amount.to_string(),
                }))
                .with_detail(format!("发送发票 {}", invoice.invoice_number)),
        )?;
        Ok(invoice)
    }

    /// 登记收款
    pub fn register_payment(
        &self,
        id: i64,
        amount: Decimal,
        payment_date: NaiveDate,
        operator: &str,
    ) -> ApiResult<Invoice> {
        let _perf = PerfGuard::new("invoice_api.register_payment");
        require_operator(operator)?;
        require_positive("amount", amount)?;

        let mut invoice = self.get_invoice(id)?;
        let status = invoice.register_payment(amount, payment_date)?;
        self.persist_header(&mut invoice, operator)?;

        info!(
            invoice_id = id,
            amount = %amount,
            outstanding = %invoice.outstanding_amount(),
            status = status.to_db_str(),
            "收款已登记"
        );
        self.recorder.record(
            ActionLog::new(ActionType::RegisterPayment, Some(id.to_string()), operator)
                .with_payload(serde_json::json!({
                    "amount": amount.to_string(),
                    "payment_date": payment_date.to_string(),
                    "status": status.to_db_str(),
                }))
                .with_detail(format!("发票 {} 收款 {}", invoice.invoice_number, amount)),
        )?;
        Ok(invoice)
    }

    /// 作废（已结清或已作废不可再作废）
    pub fn cancel_invoice(&self, id: i64, operator: &str) -> ApiResult<Invoice> {
        require_operator(operator)?;
        let mut invoice = self.get_invoice(id)?;
        invoice.cancel()?;
        self.persist_header(&mut invoice, operator)?;

        info!(invoice_id = id, invoice_number = %invoice.invoice_number, "发票已作废");
        self.recorder.record(
            ActionLog::new(ActionType::CancelInvoice, Some(id.to_string()), operator)
                .with_detail(format!("作废发票 {}", invoice.invoice_number)),
        )?;
        Ok(invoice)
    }

    /// 将已逾期的已发送/部分付款发票标记为 OVERDUE，返回变更数量
    pub fn refresh_overdue_statuses(&self, today: NaiveDate, operator: &str) -> ApiResult<usize> {
        let _perf = PerfGuard::new("invoice_api.refresh_overdue_statuses");
        require_operator(operator)?;

        let mut changed = Vec::new();
        for mut invoice in self.invoice_repo.list_overdue(today)? {
            if invoice.refresh_overdue(today) {
                self.persist_header(&mut invoice, operator)?;
                changed.push(invoice.invoice_number.clone());
            }
        }

        info!(today = %today, changed = changed.len(), "逾期状态已刷新");
        if !changed.is_empty() {
            self.recorder.record(
                ActionLog::new(ActionType::RefreshOverdue, None, operator)
                    .with_payload(serde_json::json!({
                        "today": today.to_string(),
                        "invoice_numbers": changed,
                    }))
                    .with_detail(format!("{} 张发票标记为逾期", changed.len())),
            )?;
        }
        Ok(changed.len())
    }

    /// 删除草稿发票（软删除，编号仍被占用）
    pub fn delete_invoice(&self, id: i64, operator: &str) -> ApiResult<()> {
        require_operator(operator)?;
        let invoice = self.get_invoice(id)?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(ApiError::BusinessRuleViolation(format!(
                "只有草稿发票可以删除: {} ({})",
                invoice.invoice_number, invoice.status
            )));
        }

        self.invoice_repo
            .soft_delete(id, Some(operator), &Utc::now().naive_utc())?;

        info!(invoice_id = id, invoice_number = %invoice.invoice_number, "发票已删除");
        self.recorder.record(
            ActionLog::new(ActionType::DeleteInvoice, Some(id.to_string()), operator)
                .with_detail(format!("删除发票 {}", invoice.invoice_number)),
        )?;
        Ok(())
    }
}
