// ==========================================
// 中小企业 ERP - 配置层
// ==========================================
// 职责: 系统配置管理（发票编号、默认条款、应用开关）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod settings;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use settings::{ApplicationSettings, FixedSettings, InvoiceSettings, SettingsReader};
