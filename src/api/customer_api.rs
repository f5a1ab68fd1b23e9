// ==========================================
// 中小企业 ERP - 客户管理 API
// ==========================================
// 职责: 客户建档（分配编号）、修改、查询、软删除/恢复
// 红线: 客户编号不复用（含已删除客户）
// 红线: 有未结发票的客户不可删除
// ==========================================

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::api::action_recorder::ActionRecorder;
use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{ensure_valid, normalize_search_term, require_id, require_operator};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::audit::AuditInfo;
use crate::domain::customer::Customer;
use crate::domain::numbering::next_customer_number;
use crate::i18n::t_with_args;
use crate::perf::PerfGuard;
use crate::repository::customer_repo::CustomerRepository;
use crate::repository::error::RepositoryError;
use crate::repository::invoice_repo::InvoiceRepository;

/// 编号冲突时的最大重试次数
const NUMBER_RETRY_LIMIT: usize = 3;

// ==========================================
// CustomerApi - 客户管理 API
// ==========================================
pub struct CustomerApi {
    customer_repo: Arc<CustomerRepository>,
    invoice_repo: Arc<InvoiceRepository>,
    recorder: Arc<ActionRecorder>,
}

impl CustomerApi {
    pub fn new(
        customer_repo: Arc<CustomerRepository>,
        invoice_repo: Arc<InvoiceRepository>,
        recorder: Arc<ActionRecorder>,
    ) -> Self {
        Self {
            customer_repo,
            invoice_repo,
            recorder,
        }
    }

    /// 新建客户
    ///
    /// # 参数
    /// - customer: 客户草稿（id / 编号 / 审计字段由本方法填充）
    /// - operator: 操作人
    ///
    /// # 返回
    /// - Ok(Customer): 已持久化的客户（含编号 KD000001 格式）
    pub fn create_customer(&self, mut customer: Customer, operator: &str) -> ApiResult<Customer> {
        let _perf = PerfGuard::new("customer_api.create_customer");
        require_operator(operator)?;
        ensure_valid(customer.validate())?;

        customer.id = 0;
        customer.audit = AuditInfo::now(Some(operator));

        let mut attempt = 0;
        let id = loop {
            attempt += 1;
            let max = self.customer_repo.max_customer_sequence()?;
            customer.customer_number = next_customer_number(max);
            match self.customer_repo.insert(&customer) {
                Ok(id) => break id,
                Err(RepositoryError::UniqueConstraintViolation(msg)) if attempt < NUMBER_RETRY_LIMIT => {
                    warn!(customer_number = %customer.customer_number, error = %msg, "客户编号冲突，重试");
                }
                Err(e) => return Err(e.into()),
            }
        };
        customer.id = id;

        info!(customer_id = id, customer_number = %customer.customer_number, "客户已创建");
        self.recorder.record(
            ActionLog::new(ActionType::CreateCustomer, Some(id.to_string()), operator)
                .with_payload(serde_json::json!({
                    "customer_number": customer.customer_number,
                    "display_name": customer.display_name(),
                }))
                .with_detail(format!("新建客户 {}", customer.customer_number)),
        )?;

        Ok(customer)
    }

    /// 修改客户（编号与创建信息保持不变）
    pub fn update_customer(&self, mut customer: Customer, operator: &str) -> ApiResult<Customer> {
        let _perf = PerfGuard::new("customer_api.update_customer");
        require_operator(operator)?;
        require_id("customer_id", customer.id)?;
        ensure_valid(customer.validate())?;

        let existing = self.get_customer(customer.id)?;
        customer.customer_number = existing.customer_number;
        customer.audit = existing.audit;
        customer
            .audit
            .mark_updated(Some(operator), Utc::now().naive_utc());

        self.customer_repo.update(&customer)?;

        info!(customer_id = customer.id, "客户已更新");
        self.recorder.record(
            ActionLog::new(ActionType::UpdateCustomer, Some(customer.id.to_string()), operator)
                .with_detail(format!("修改客户 {}", customer.customer_number)),
        )?;
        Ok(customer)
    }

    pub fn get_customer(&self, id: i64) -> ApiResult<Customer> {
        self.customer_repo
            .find_by_id(id, false)?
            .ok_or_else(|| ApiError::NotFound(format!("客户(id={})不存在", id)))
    }

    pub fn get_customer_by_number(&self, customer_number: &str) -> ApiResult<Customer> {
        self.customer_repo
            .find_by_number(customer_number.trim())?
            .ok_or_else(|| ApiError::NotFound(format!("客户({})不存在", customer_number)))
    }

    /// 全部未删除客户（按编号）
    pub fn list_customers(&self) -> ApiResult<Vec<Customer>> {
        let customers = self.customer_repo.list_all()?;
        debug!(count = customers.len(), "查询客户列表");
        Ok(customers)
    }

    /// 按编号/名称/邮箱/城市模糊搜索
    pub fn search_customers(&self, term: &str) -> ApiResult<Vec<Customer>> {
        let term = normalize_search_term(term)?;
        let customers = self.customer_repo.search(&term)?;
        debug!(term = %term, count = customers.len(), "搜索客户");
        Ok(customers)
    }

    /// 软删除客户（有未结发票时拒绝）
    pub fn delete_customer(&self, id: i64, operator: &str) -> ApiResult<()> {
        require_operator(operator)?;
        let customer = self.get_customer(id)?;

        if self.invoice_repo.has_open_invoices(id)? {
            return Err(ApiError::BusinessRuleViolation(t_with_args(
                "invoice.customer_has_open_invoices",
                &[("number", &customer.customer_number)],
            )));
        }

        self.customer_repo
            .soft_delete(id, Some(operator), &Utc::now().naive_utc())?;

        info!(customer_id = id, customer_number = %customer.customer_number, "客户已删除");
        self.recorder.record(
            ActionLog::new(ActionType::DeleteCustomer, Some(id.to_string()), operator)
                .with_detail(format!("删除客户 {}", customer.customer_number)),
        )?;
        Ok(())
    }

    /// 恢复已删除客户
    pub fn restore_customer(&self, id: i64, operator: &str) -> ApiResult<Customer> {
        require_operator(operator)?;
        self.customer_repo
            .restore(id, Some(operator), &Utc::now().naive_utc())?;

        let customer = self.get_customer(id)?;
        info!(customer_id = id, "客户已恢复");
        self.recorder.record(
            ActionLog::new(ActionType::RestoreCustomer, Some(id.to_string()), operator)
                .with_detail(format!("恢复客户 {}", customer.customer_number)),
        )?;
        Ok(customer)
    }

    pub fn count_active_customers(&self) -> ApiResult<i64> {
        Ok(self.customer_repo.count_active()?)
    }
}
