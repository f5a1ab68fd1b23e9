// ==========================================
// 中小企业 ERP - 发票数据仓储
// ==========================================
// 对齐: scripts/schema.sql invoice / invoice_line 表
// 红线: 发票头与明细在同一事务内写入
// 红线: 已软删除的明细随发票一并读取（行号不复用）
// ==========================================

mod core;
mod lines;
mod queries;


pub use core::InvoiceRepository;
