use super::core::InvoiceRepository;
use super::lines;
use crate::domain::invoice::Invoice;
use crate::domain::types::InvoiceStatus;
use crate::repository::common::{fmt_date, get_decimal};
use crate::repository::error::RepositoryResult;
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};
use rust_decimal::Decimal;

/// 未结清状态（SQL IN 子句）
const OPEN_STATUS_SQL: &str = "('SENT', 'PARTIALLY_PAID', 'OVERDUE')";

impl InvoiceRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按主键查询（含全部明细）
    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Invoice>> {
        let conn = self.get_conn()?;
        let sql = Self::select_sql("WHERE id = ?1 AND is_deleted = 0");
        let invoice = conn.query_row(&sql, params![id], Self::map_row).optional()?;
        match invoice {
            Some(mut invoice) => {
                invoice.lines = lines::load_lines(&conn, invoice.id)?;
                Ok(Some(invoice))
            }
            None => Ok(None),
        }
    }

    pub fn find_by_number(&self, invoice_number: &str) -> RepositoryResult<Option<Invoice>> {
        let conn = self.get_conn()?;
        let sql = Self::select_sql("WHERE invoice_number = ?1 AND is_deleted = 0");
        let invoice = conn
            .query_row(&sql, params![invoice_number], Self::map_row)
            .optional()?;
        match invoice {
            Some(mut invoice) => {
                invoice.lines = lines::load_lines(&conn, invoice.id)?;
                Ok(Some(invoice))
            }
            None => Ok(None),
        }
    }

    /// 客户的发票（新到旧）
    pub fn find_by_customer(&self, customer_id: i64) -> RepositoryResult<Vec<Invoice>> {
        let conn = self.get_conn()?;
        let sql = Self::select_sql(
            "WHERE customer_id = ?1 AND is_deleted = 0 ORDER BY invoice_date DESC, id DESC",
        );
        Self::query_with_lines(&conn, &sql, params![customer_id])
    }

    pub fn list_by_status(&self, status: InvoiceStatus) -> RepositoryResult<Vec<Invoice>> {
        let conn = self.get_conn()?;
        let sql = Self::select_sql(
            "WHERE status = ?1 AND is_deleted = 0 ORDER BY invoice_date, invoice_number",
        );
        Self::query_with_lines(&conn, &sql, params![status.to_db_str()])
    }

    /// 未结清且已过到期日的发票（按到期日升序）
    pub fn list_overdue(&self, today: NaiveDate) -> RepositoryResult<Vec<Invoice>> {
        let conn = self.get_conn()?;
        let sql = Self::select_sql(&format!(
            "WHERE status IN {} AND due_date < ?1 AND is_deleted = 0 ORDER BY due_date, invoice_number",
            OPEN_STATUS_SQL
        ));
        Self::query_with_lines(&conn, &sql, params![fmt_date(&today)])
    }

    /// 未结清发票
    pub fn list_open(&self) -> RepositoryResult<Vec<Invoice>> {
        let conn = self.get_conn()?;
        let sql = Self::select_sql(&format!(
            "WHERE status IN {} AND is_deleted = 0 ORDER BY due_date, invoice_number",
            OPEN_STATUS_SQL
        ));
        Self::query_with_lines(&conn, &sql, [])
    }

    /// 指定前缀的全部发票号（含已删除，用于编号分配）
    pub fn invoice_numbers_with_prefix(&self, prefix: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT invoice_number FROM invoice WHERE substr(invoice_number, 1, length(?1)) = ?1",
        )?;
        let rows = stmt.query_map(params![prefix], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 客户是否有未结清发票
    pub fn has_open_invoices(&self, customer_id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT COUNT(*) FROM invoice WHERE customer_id = ?1 AND status IN {} AND is_deleted = 0",
            OPEN_STATUS_SQL
        );
        let count: i64 = conn.query_row(&sql, params![customer_id], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// 未结清发票的未收金额合计
    pub fn sum_outstanding(&self) -> RepositoryResult<Decimal> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT total_amount, paid_amount FROM invoice WHERE status IN {} AND is_deleted = 0",
            OPEN_STATUS_SQL
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(get_decimal(row, "total_amount")? - get_decimal(row, "paid_amount")?)
        })?;

        let mut total = Decimal::ZERO;
        for outstanding in rows {
            total += outstanding?;
        }
        Ok(total)
    }
}
