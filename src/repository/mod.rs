// ==========================================
// 中小企业 ERP - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod action_log_repo;
pub mod common;
pub mod company_repo;
pub mod customer_repo;
pub mod email_template_repo;
pub mod error;
pub mod invoice_repo;
pub mod item_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use company_repo::CompanyRepository;
pub use customer_repo::CustomerRepository;
pub use email_template_repo::EmailTemplateRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use invoice_repo::InvoiceRepository;
pub use item_repo::ItemRepository;
