// ==========================================
// 中小企业 ERP - API 层
// ==========================================
// 职责: 业务服务接口（校验、编号、操作日志），供上层 UI 调用
// ==========================================

pub mod action_recorder;
pub mod company_api;
pub mod config_api;
pub mod customer_api;
pub mod dashboard_api;
pub mod email_template_api;
pub mod error;
pub mod invoice_api;
pub mod item_api;
pub mod validator;

// 重导出核心类型
pub use action_recorder::ActionRecorder;
pub use company_api::CompanyApi;
pub use config_api::{ConfigApi, ConfigItem};
pub use customer_api::CustomerApi;
pub use dashboard_api::{DashboardApi, DashboardSummary};
pub use email_template_api::EmailTemplateApi;
pub use error::{ApiError, ApiResult, ValidationViolation};
pub use invoice_api::{CreateInvoiceRequest, InvoiceApi, LineUpdate, NewLine};
pub use item_api::{ItemApi, StockAdjustment};
