// ==========================================
// 中小企业 ERP - 概览 API
// ==========================================
// 职责: 首页汇总（客户/商品/低库存/应收/逾期）与操作日志查询
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::ActionLog;
use crate::domain::money::{format_amount_de, round_money};
use crate::i18n::t_with_args;
use crate::perf::PerfGuard;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::customer_repo::CustomerRepository;
use crate::repository::invoice_repo::InvoiceRepository;
use crate::repository::item_repo::ItemRepository;

/// 概览汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub as_of: NaiveDate,
    pub customer_count: i64,
    pub active_item_count: i64,
    pub low_stock_count: usize,
    /// 未结发票的未付金额合计
    pub open_receivables: Decimal,
    pub overdue_count: usize,
    pub overdue_amount: Decimal,
}

impl DashboardSummary {
    /// 按当前语言输出一行摘要
    pub fn summary_line(&self) -> String {
        t_with_args(
            "dashboard.summary",
            &[
                ("customers", &self.customer_count.to_string()),
                ("items", &self.active_item_count.to_string()),
                ("low_stock", &self.low_stock_count.to_string()),
                ("receivables", &format_amount_de(self.open_receivables)),
                ("overdue_count", &self.overdue_count.to_string()),
                ("overdue_amount", &format_amount_de(self.overdue_amount)),
            ],
        )
    }
}

// ==========================================
// DashboardApi - 概览 API
// ==========================================
pub struct DashboardApi {
    customer_repo: Arc<CustomerRepository>,
    item_repo: Arc<ItemRepository>,
    invoice_repo: Arc<InvoiceRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl DashboardApi {
    pub fn new(
        customer_repo: Arc<CustomerRepository>,
        item_repo: Arc<ItemRepository>,
        invoice_repo: Arc<InvoiceRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            customer_repo,
            item_repo,
            invoice_repo,
            action_log_repo,
        }
    }

    /// 截至 today 的汇总
    pub fn summary(&self, today: NaiveDate) -> ApiResult<DashboardSummary> {
        let _perf = PerfGuard::new("dashboard_api.summary");

        let overdue = self.invoice_repo.list_overdue(today)?;
        let overdue_amount = round_money(overdue.iter().map(|inv| inv.outstanding_amount()).sum());

        let summary = DashboardSummary {
            as_of: today,
            customer_count: self.customer_repo.count_active()?,
            active_item_count: self.item_repo.count_active()?,
            low_stock_count: self.item_repo.list_low_stock()?.len(),
            open_receivables: self.invoice_repo.sum_outstanding()?,
            overdue_count: overdue.len(),
            overdue_amount,
        };
        debug!(?summary, "概览已汇总");
        Ok(summary)
    }

    /// 最近操作（1..=1000 条）
    pub fn get_recent_actions(&self, limit: i32) -> ApiResult<Vec<ActionLog>> {
        if limit <= 0 || limit > 1000 {
            return Err(ApiError::InvalidInput("limit必须在1-1000之间".to_string()));
        }
        Ok(self.action_log_repo.list_recent(limit)?)
    }

    /// 某实体的操作历史（新到旧）
    pub fn list_entity_history(&self, entity_type: &str, entity_id: &str) -> ApiResult<Vec<ActionLog>> {
        if entity_type.trim().is_empty() || entity_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("实体类型和主键不能为空".to_string()));
        }
        Ok(self
            .action_log_repo
            .find_by_entity(entity_type.trim(), entity_id.trim())?)
    }
}
