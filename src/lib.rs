// ==========================================
// 中小企业 ERP - 核心库
// ==========================================
// 范围: 客户、商品/服务、发票、邮件模板、公司设置
// 技术栈: Rust + SQLite
// 分层: API -> Repository -> SQLite；领域层承载金额与状态规则
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// SQL 计数与慢操作日志
pub mod perf;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CustomerStatus, EmailTemplateType, InvoiceStatus, ItemKind, Unit};

// 领域实体
pub use domain::{ActionLog, ActionType, Company, Customer, EmailTemplate, Invoice, InvoiceLine, Item};

// API
pub use api::{
    CompanyApi, ConfigApi, CustomerApi, DashboardApi, EmailTemplateApi, InvoiceApi, ItemApi,
};

// 应用状态
pub use app::AppState;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "中小企业 ERP";

// 数据库版本
pub const DB_VERSION: &str = "v1";
