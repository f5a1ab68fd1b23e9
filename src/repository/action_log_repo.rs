// ==========================================
// 中小企业 ERP - 操作日志数据仓储
// ==========================================
// 对齐: scripts/schema.sql action_log 表
// 红线: 只追加，不修改、不删除
// ==========================================

mod core;
mod queries;


pub use core::ActionLogRepository;
