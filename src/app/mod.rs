// ==========================================
// 中小企业 ERP - 应用层
// ==========================================
// 职责: 组装共享连接、Repository 与 API
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
