// ==========================================
// 中小企业 ERP - 仓储层公共工具
// ==========================================
// 职责: 十进制/日期/审计字段的行映射，软删除 SQL
// 约定: 表名只来自本模块内部常量，不拼接外部输入
// ==========================================

use crate::db::{DATETIME_FORMAT, DATE_FORMAT};
use crate::domain::audit::AuditInfo;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use std::str::FromStr;

/// 审计列（追加在各表 SELECT 列表末尾）
pub const AUDIT_COLUMNS: &str =
    "created_at, updated_at, created_by, updated_by, is_deleted, deleted_at, deleted_by";

// ==========================================
// 写入格式化
// ==========================================

pub fn fmt_ts(ts: &NaiveDateTime) -> String {
    ts.format(DATETIME_FORMAT).to_string()
}

pub fn fmt_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn fmt_dec(value: &Decimal) -> String {
    value.to_string()
}

pub fn fmt_opt_dec(value: &Option<Decimal>) -> Option<String> {
    value.as_ref().map(fmt_dec)
}

// ==========================================
// 读取解析
// ==========================================

fn conversion_error(row: &Row<'_>, column: &str, message: String) -> rusqlite::Error {
    let idx = row.as_ref().column_index(column).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, format!("{}: {}", column, message).into())
}

pub fn get_decimal(row: &Row<'_>, column: &str) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(column)?;
    Decimal::from_str(raw.trim()).map_err(|e| conversion_error(row, column, e.to_string()))
}

pub fn get_opt_decimal(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = row.get(column)?;
    match raw {
        Some(s) if !s.trim().is_empty() => Decimal::from_str(s.trim())
            .map(Some)
            .map_err(|e| conversion_error(row, column, e.to_string())),
        _ => Ok(None),
    }
}

pub fn get_date(row: &Row<'_>, column: &str) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(column)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| conversion_error(row, column, e.to_string()))
}

pub fn get_opt_date(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(column)?;
    raw.map(|s| {
        NaiveDate::parse_from_str(&s, DATE_FORMAT)
            .map_err(|e| conversion_error(row, column, e.to_string()))
    })
    .transpose()
}

pub fn get_ts(row: &Row<'_>, column: &str) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(column)?;
    NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT)
        .map_err(|e| conversion_error(row, column, e.to_string()))
}

pub fn get_opt_ts(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(column)?;
    raw.map(|s| {
        NaiveDateTime::parse_from_str(&s, DATETIME_FORMAT)
            .map_err(|e| conversion_error(row, column, e.to_string()))
    })
    .transpose()
}

/// 读取审计列
pub fn read_audit(row: &Row<'_>) -> rusqlite::Result<AuditInfo> {
    Ok(AuditInfo {
        created_at: get_ts(row, "created_at")?,
        updated_at: get_ts(row, "updated_at")?,
        created_by: row.get("created_by")?,
        updated_by: row.get("updated_by")?,
        is_deleted: row.get::<_, i64>("is_deleted")? != 0,
        deleted_at: get_opt_ts(row, "deleted_at")?,
        deleted_by: row.get("deleted_by")?,
    })
}

// ==========================================
// 软删除 / 恢复
// ==========================================

/// 支持软删除的表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftDeleteTable {
    Customer,
    Item,
    Invoice,
    EmailTemplate,
}

impl SoftDeleteTable {
    fn table_name(&self) -> &'static str {
        match self {
            SoftDeleteTable::Customer => "customer",
            SoftDeleteTable::Item => "item",
            SoftDeleteTable::Invoice => "invoice",
            SoftDeleteTable::EmailTemplate => "email_template",
        }
    }

    fn entity_name(&self) -> &'static str {
        match self {
            SoftDeleteTable::Customer => "Customer",
            SoftDeleteTable::Item => "Item",
            SoftDeleteTable::Invoice => "Invoice",
            SoftDeleteTable::EmailTemplate => "EmailTemplate",
        }
    }
}

/// 软删除（仅作用于未删除的行），行不存在返回 NotFound
pub fn soft_delete_row(
    conn: &Connection,
    table: SoftDeleteTable,
    id: i64,
    actor: Option<&str>,
    now: &NaiveDateTime,
) -> RepositoryResult<()> {
    let sql = format!(
        "UPDATE {} SET is_deleted = 1, deleted_at = ?1, deleted_by = ?2, updated_at = ?1, updated_by = ?2
         WHERE id = ?3 AND is_deleted = 0",
        table.table_name()
    );
    let affected = conn.execute(&sql, params![fmt_ts(now), actor, id])?;
    if affected == 0 {
        return Err(RepositoryError::not_found(table.entity_name(), id));
    }
    Ok(())
}

/// 恢复已软删除的行，行不存在或未删除返回 NotFound
pub fn restore_row(
    conn: &Connection,
    table: SoftDeleteTable,
    id: i64,
    actor: Option<&str>,
    now: &NaiveDateTime,
) -> RepositoryResult<()> {
    let sql = format!(
        "UPDATE {} SET is_deleted = 0, deleted_at = NULL, deleted_by = NULL, updated_at = ?1, updated_by = ?2
         WHERE id = ?3 AND is_deleted = 1",
        table.table_name()
    );
    let affected = conn.execute(&sql, params![fmt_ts(now), actor, id])?;
    if affected == 0 {
        return Err(RepositoryError::not_found(table.entity_name(), id));
    }
    Ok(())
}

/// LIKE 模式转义（% _ \）
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_roundtrip_through_text() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v TEXT, o TEXT)").unwrap();
        conn.execute(
            "INSERT INTO t (v, o) VALUES (?1, ?2)",
            params![fmt_dec(&dec!(1234.50)), fmt_opt_dec(&None)],
        )
        .unwrap();

        let (v, o) = conn
            .query_row("SELECT v, o FROM t", [], |row| {
                Ok((get_decimal(row, "v")?, get_opt_decimal(row, "o")?))
            })
            .unwrap();
        assert_eq!(v, dec!(1234.50));
        assert_eq!(o, None);
    }

    #[test]
    fn test_bad_decimal_is_conversion_error() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn
            .query_row("SELECT 'abc' AS v", [], |row| get_decimal(row, "v"))
            .unwrap_err();
        assert!(matches!(err, rusqlite::Error::FromSqlConversionFailure(..)));
    }

    #[test]
    fn test_like_pattern_escapes() {
        assert_eq!(like_pattern(" 50%_a "), "%50\\%\\_a%");
    }
}
