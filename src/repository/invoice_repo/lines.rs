use crate::domain::invoice::InvoiceLine;
use crate::domain::types::Unit;
use crate::repository::common::{
    fmt_dec, fmt_opt_dec, fmt_ts, get_decimal, get_opt_decimal, read_audit, AUDIT_COLUMNS,
};
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection, Row};

// ==========================================
// 发票明细读写（仅供 InvoiceRepository 内部使用）
// ==========================================

const LINE_COLUMNS: &str = "id, invoice_id, position, item_id, item_number, description, quantity,
    unit, unit_price, discount_percentage, vat_rate, additional_info, sort_order";

fn map_line_row(row: &Row<'_>) -> rusqlite::Result<InvoiceLine> {
    Ok(InvoiceLine {
        id: row.get("id")?,
        invoice_id: row.get("invoice_id")?,
        position: row.get("position")?,
        item_id: row.get("item_id")?,
        item_number: row.get("item_number")?,
        description: row.get("description")?,
        quantity: get_decimal(row, "quantity")?,
        unit: Unit::from_str(&row.get::<_, String>("unit")?),
        unit_price: get_decimal(row, "unit_price")?,
        discount_percentage: get_opt_decimal(row, "discount_percentage")?,
        vat_rate: get_decimal(row, "vat_rate")?,
        additional_info: row.get("additional_info")?,
        sort_order: row.get("sort_order")?,
        audit: read_audit(row)?,
    })
}

/// 读取发票全部明细（含已软删除），按行号排序
pub(super) fn load_lines(conn: &Connection, invoice_id: i64) -> RepositoryResult<Vec<InvoiceLine>> {
    let sql = format!(
        "SELECT {}, {} FROM invoice_line WHERE invoice_id = ?1 ORDER BY position",
        LINE_COLUMNS, AUDIT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![invoice_id], map_line_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// 写入一条明细，返回新主键
pub(super) fn insert_line(
    conn: &Connection,
    invoice_id: i64,
    line: &InvoiceLine,
) -> RepositoryResult<i64> {
    conn.execute(
        r#"
        INSERT INTO invoice_line (
            invoice_id, position, item_id, item_number, description, quantity,
            unit, unit_price, discount_percentage, vat_rate, additional_info, sort_order,
            created_at, updated_at, created_by, updated_by, is_deleted, deleted_at, deleted_by
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
        "#,
        params![
            invoice_id,
            line.position,
            line.item_id,
            line.item_number,
            line.description,
            fmt_dec(&line.quantity),
            line.unit.to_db_str(),
            fmt_dec(&line.unit_price),
            fmt_opt_dec(&line.discount_percentage),
            fmt_dec(&line.vat_rate),
            line.additional_info,
            line.sort_order,
            fmt_ts(&line.audit.created_at),
            fmt_ts(&line.audit.updated_at),
            line.audit.created_by,
            line.audit.updated_by,
            line.audit.is_deleted,
            line.audit.deleted_at.as_ref().map(fmt_ts),
            line.audit.deleted_by,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// 整体替换明细（先删后插）
pub(super) fn replace_all(
    conn: &Connection,
    invoice_id: i64,
    lines: &[InvoiceLine],
) -> RepositoryResult<usize> {
    conn.execute(
        "DELETE FROM invoice_line WHERE invoice_id = ?1",
        params![invoice_id],
    )?;
    for line in lines {
        insert_line(conn, invoice_id, line)?;
    }
    Ok(lines.len())
}
