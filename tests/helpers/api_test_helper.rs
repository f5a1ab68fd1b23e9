// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 提供API层集成测试的通用辅助函数
// ==========================================

#[path = "../test_helpers.rs"]
mod test_helpers;

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::NamedTempFile;

use smb_erp::api::{
    CompanyApi, ConfigApi, CreateInvoiceRequest, CustomerApi, DashboardApi, EmailTemplateApi,
    InvoiceApi, ItemApi, NewLine,
};
use smb_erp::app::AppState;
use smb_erp::db::open_sqlite_connection;
use smb_erp::domain::{Customer, Invoice, Item};
use smb_erp::repository::{ActionLogRepository, InvoiceRepository};

pub const OPERATOR: &str = "tester";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ==========================================
// API测试环境
// ==========================================

/// API测试环境
///
/// 通过 AppState 装配全部 API，另开一个连接用于直接检查仓储
pub struct ApiTestEnv {
    pub db_path: String,
    pub customer_api: Arc<CustomerApi>,
    pub item_api: Arc<ItemApi>,
    pub invoice_api: Arc<InvoiceApi>,
    pub company_api: Arc<CompanyApi>,
    pub email_template_api: Arc<EmailTemplateApi>,
    pub dashboard_api: Arc<DashboardApi>,
    pub config_api: Arc<ConfigApi>,

    // Repository层（用于断言）
    pub action_log_repo: Arc<ActionLogRepository>,
    pub invoice_repo: Arc<InvoiceRepository>,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    pub fn new() -> Result<Self, String> {
        let (temp_file, db_path) =
            test_helpers::create_test_db().map_err(|e| format!("创建测试数据库失败: {}", e))?;

        let state = AppState::new(db_path.clone())?;

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        Ok(Self {
            db_path,
            customer_api: state.customer_api.clone(),
            item_api: state.item_api.clone(),
            invoice_api: state.invoice_api.clone(),
            company_api: state.company_api.clone(),
            email_template_api: state.email_template_api.clone(),
            dashboard_api: state.dashboard_api.clone(),
            config_api: state.config_api.clone(),
            action_log_repo: Arc::new(ActionLogRepository::new(conn.clone())),
            invoice_repo: Arc::new(InvoiceRepository::new(conn)),
            _temp_file: temp_file,
        })
    }

    pub fn create_customer(&self, customer: Customer) -> Customer {
        self.customer_api
            .create_customer(customer, OPERATOR)
            .expect("创建客户失败")
    }

    pub fn create_item(&self, item: Item) -> Item {
        self.item_api.create_item(item, OPERATOR).expect("创建条目失败")
    }

    pub fn create_draft(&self, customer_id: i64, invoice_date: NaiveDate) -> Invoice {
        self.invoice_api
            .create_invoice(CreateInvoiceRequest::new(customer_id, invoice_date), OPERATOR)
            .expect("创建发票失败")
    }

    /// 追加一条自由行
    pub fn add_free_line(&self, invoice_id: i64, description: &str, quantity: Decimal, price: Decimal, vat: Decimal) -> Invoice {
        self.invoice_api
            .add_line(
                invoice_id,
                NewLine::Free {
                    description: description.to_string(),
                    quantity,
                    unit: smb_erp::Unit::Piece,
                    unit_price: price,
                    vat_rate: Some(vat),
                    discount_percentage: None,
                    additional_info: None,
                },
                OPERATOR,
            )
            .expect("新增明细失败")
    }

    pub fn action_types_of(&self, entity_type: &str, entity_id: i64) -> Vec<String> {
        self.action_log_repo
            .find_by_entity(entity_type, &entity_id.to_string())
            .expect("查询操作日志失败")
            .into_iter()
            .map(|log| log.action_type)
            .collect()
    }
}
