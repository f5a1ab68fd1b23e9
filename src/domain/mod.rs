// ==========================================
// 中小企业 ERP - 领域模型层
// ==========================================
// 职责: 定义领域实体、值对象、业务规则
// 红线: 不含数据访问逻辑
// ==========================================

pub mod action_log;
pub mod audit;
pub mod company;
pub mod customer;
pub mod email;
pub mod email_template;
pub mod error;
pub mod invoice;
pub mod item;
pub mod money;
pub mod numbering;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use audit::AuditInfo;
pub use company::{BankAccount, Company};
pub use customer::Customer;
pub use email::EmailAddress;
pub use email_template::{EmailPriority, EmailTemplate, RenderedEmail};
pub use error::{DomainError, DomainResult, ValidationViolation};
pub use invoice::{Invoice, InvoiceLine, VatBreakdownEntry};
pub use item::{Item, ItemDetails, ProductDetails, ServiceDetails};
pub use money::{round_money, Money};
pub use numbering::InvoiceNumberPolicy;
pub use types::{CustomerStatus, EmailTemplateType, InvoiceStatus, ItemKind, StockStatus, Unit};
