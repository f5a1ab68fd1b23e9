use super::lines;
use crate::domain::invoice::{Invoice, InvoiceLine};
use crate::domain::types::InvoiceStatus;
use crate::repository::common::{
    fmt_date, fmt_dec, fmt_opt_dec, fmt_ts, get_date, get_decimal, get_opt_date,
    get_opt_decimal, read_audit, soft_delete_row, SoftDeleteTable, AUDIT_COLUMNS,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

pub(super) const INVOICE_COLUMNS: &str = "id, invoice_number, customer_id, invoice_date, due_date,
    service_date, status, net_amount, vat_amount, total_amount, paid_amount,
    discount_percentage, discount_days, payment_term_days, subject, introduction_text,
    conclusion_text, internal_notes, customer_reference, project_number, sent_date, paid_date";

// ==========================================
// InvoiceRepository - 发票仓储
// ==========================================
// 红线: Repository 不做业务逻辑，金额由领域层汇总后原样落库
pub struct InvoiceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InvoiceRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub(super) fn select_sql(where_clause: &str) -> String {
        format!(
            "SELECT {}, {} FROM invoice {}",
            INVOICE_COLUMNS, AUDIT_COLUMNS, where_clause
        )
    }

    /// 映射发票头（明细另行加载）
    pub(super) fn map_row(row: &Row<'_>) -> rusqlite::Result<Invoice> {
        Ok(Invoice {
            id: row.get("id")?,
            invoice_number: row.get("invoice_number")?,
            customer_id: row.get("customer_id")?,
            invoice_date: get_date(row, "invoice_date")?,
            due_date: get_date(row, "due_date")?,
            service_date: get_opt_date(row, "service_date")?,
            status: InvoiceStatus::from_str(&row.get::<_, String>("status")?),
            net_amount: get_decimal(row, "net_amount")?,
            vat_amount: get_decimal(row, "vat_amount")?,
            total_amount: get_decimal(row, "total_amount")?,
            paid_amount: get_decimal(row, "paid_amount")?,
            discount_percentage: get_opt_decimal(row, "discount_percentage")?,
            discount_days: row.get("discount_days")?,
            payment_term_days: row.get("payment_term_days")?,
            subject: row.get("subject")?,
            introduction_text: row.get("introduction_text")?,
            conclusion_text: row.get("conclusion_text")?,
            internal_notes: row.get("internal_notes")?,
            customer_reference: row.get("customer_reference")?,
            project_number: row.get("project_number")?,
            sent_date: get_opt_date(row, "sent_date")?,
            paid_date: get_opt_date(row, "paid_date")?,
            lines: Vec::new(),
            audit: read_audit(row)?,
        })
    }

    /// 查询发票头列表并逐张加载明细
    pub(super) fn query_with_lines(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepositoryResult<Vec<Invoice>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::map_row)?;
        let mut invoices = rows.collect::<Result<Vec<_>, _>>()?;
        for invoice in invoices.iter_mut() {
            invoice.lines = lines::load_lines(conn, invoice.id)?;
        }
        Ok(invoices)
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入发票及其明细（同一事务），返回新主键
    pub fn insert(&self, invoice: &Invoice) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            r#"
            INSERT INTO invoice (
                invoice_number, customer_id, invoice_date, due_date, service_date, status,
                net_amount, vat_amount, total_amount, paid_amount,
                discount_percentage, discount_days, payment_term_days,
                subject, introduction_text, conclusion_text, internal_notes,
                customer_reference, project_number, sent_date, paid_date,
                created_at, updated_at, created_by, updated_by, is_deleted, deleted_at, deleted_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                      ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28)
            "#,
            params![
                invoice.invoice_number,
                invoice.customer_id,
                fmt_date(&invoice.invoice_date),
                fmt_date(&invoice.due_date),
                invoice.service_date.as_ref().map(fmt_date),
                invoice.status.to_db_str(),
                fmt_dec(&invoice.net_amount),
                fmt_dec(&invoice.vat_amount),
                fmt_dec(&invoice.total_amount),
                fmt_dec(&invoice.paid_amount),
                fmt_opt_dec(&invoice.discount_percentage),
                invoice.discount_days,
                invoice.payment_term_days,
                invoice.subject,
                invoice.introduction_text,
                invoice.conclusion_text,
                invoice.internal_notes,
                invoice.customer_reference,
                invoice.project_number,
                invoice.sent_date.as_ref().map(fmt_date),
                invoice.paid_date.as_ref().map(fmt_date),
                fmt_ts(&invoice.audit.created_at),
                fmt_ts(&invoice.audit.updated_at),
                invoice.audit.created_by,
                invoice.audit.updated_by,
                invoice.audit.is_deleted,
                invoice.audit.deleted_at.as_ref().map(fmt_ts),
                invoice.audit.deleted_by,
            ],
        )?;
        let id = tx.last_insert_rowid();

        for line in &invoice.lines {
            lines::insert_line(&tx, id, line)?;
        }

        tx.commit()?;
        Ok(id)
    }

    fn update_header_on(conn: &Connection, invoice: &Invoice) -> RepositoryResult<()> {
        let affected = conn.execute(
            r#"
            UPDATE invoice SET
                customer_id = ?1, invoice_date = ?2, due_date = ?3, service_date = ?4, status = ?5,
                net_amount = ?6, vat_amount = ?7, total_amount = ?8, paid_amount = ?9,
                discount_percentage = ?10, discount_days = ?11, payment_term_days = ?12,
                subject = ?13, introduction_text = ?14, conclusion_text = ?15, internal_notes = ?16,
                customer_reference = ?17, project_number = ?18, sent_date = ?19, paid_date = ?20,
                updated_at = ?21, updated_by = ?22
            WHERE id = ?23 AND is_deleted = 0
            "#,
            params![
                invoice.customer_id,
                fmt_date(&invoice.invoice_date),
                fmt_date(&invoice.due_date),
                invoice.service_date.as_ref().map(fmt_date),
                invoice.status.to_db_str(),
                fmt_dec(&invoice.net_amount),
                fmt_dec(&invoice.vat_amount),
                fmt_dec(&invoice.total_amount),
                fmt_dec(&invoice.paid_amount),
                fmt_opt_dec(&invoice.discount_percentage),
                invoice.discount_days,
                invoice.payment_term_days,
                invoice.subject,
                invoice.introduction_text,
                invoice.conclusion_text,
                invoice.internal_notes,
                invoice.customer_reference,
                invoice.project_number,
                invoice.sent_date.as_ref().map(fmt_date),
                invoice.paid_date.as_ref().map(fmt_date),
                fmt_ts(&invoice.audit.updated_at),
                invoice.audit.updated_by,
                invoice.id,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Invoice", invoice.id));
        }
        Ok(())
    }

    /// 更新发票头（编号不可修改）
    pub fn update_header(&self, invoice: &Invoice) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::update_header_on(&conn, invoice)
    }

    /// 整体替换明细
    pub fn replace_lines(&self, invoice_id: i64, lines: &[InvoiceLine]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let count = lines::replace_all(&tx, invoice_id, lines)?;
        tx.commit()?;
        Ok(count)
    }

    /// 保存发票头与明细（同一事务）
    pub fn save(&self, invoice: &Invoice) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        Self::update_header_on(&tx, invoice)?;
        lines::replace_all(&tx, invoice.id, &invoice.lines)?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    pub fn soft_delete(&self, id: i64, actor: Option<&str>, now: &NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        soft_delete_row(&conn, SoftDeleteTable::Invoice, id, actor, now)
    }
}
