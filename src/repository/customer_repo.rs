// ==========================================
// 中小企业 ERP - 客户数据仓储
// ==========================================
// 对齐: scripts/schema.sql customer 表
// 红线: Repository 不含业务逻辑；默认查询排除已软删除记录
// ==========================================

use crate::domain::customer::Customer;
use crate::domain::numbering::{parse_customer_number, CUSTOMER_NUMBER_PREFIX};
use crate::domain::types::CustomerStatus;
use crate::repository::common::{
    fmt_opt_dec, fmt_ts, get_opt_decimal, get_opt_ts, like_pattern, read_audit, restore_row,
    soft_delete_row, SoftDeleteTable, AUDIT_COLUMNS,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const CUSTOMER_COLUMNS: &str = "id, customer_number, company_name, contact_first_name, contact_last_name,
    email, alternative_email, phone, mobile, fax, website,
    billing_street, billing_zip_code, billing_city, billing_country,
    shipping_street, shipping_zip_code, shipping_city, shipping_country,
    vat_id, tax_number, payment_term_days, discount_percentage, discount_days, credit_limit,
    status, last_contact_date, notes";

// ==========================================
// CustomerRepository - 客户仓储
// ==========================================
pub struct CustomerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CustomerRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn select_sql(where_clause: &str) -> String {
        format!(
            "SELECT {}, {} FROM customer {}",
            CUSTOMER_COLUMNS, AUDIT_COLUMNS, where_clause
        )
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Customer> {
        Ok(Customer {
            id: row.get("id")?,
            customer_number: row.get("customer_number")?,
            company_name: row.get("company_name")?,
            contact_first_name: row.get("contact_first_name")?,
            contact_last_name: row.get("contact_last_name")?,
            email: row.get("email")?,
            alternative_email: row.get("alternative_email")?,
            phone: row.get("phone")?,
            mobile: row.get("mobile")?,
            fax: row.get("fax")?,
            website: row.get("website")?,
            billing_street: row.get("billing_street")?,
            billing_zip_code: row.get("billing_zip_code")?,
            billing_city: row.get("billing_city")?,
            billing_country: row.get("billing_country")?,
            shipping_street: row.get("shipping_street")?,
            shipping_zip_code: row.get("shipping_zip_code")?,
            shipping_city: row.get("shipping_city")?,
            shipping_country: row.get("shipping_country")?,
            vat_id: row.get("vat_id")?,
            tax_number: row.get("tax_number")?,
            payment_term_days: row.get("payment_term_days")?,
            discount_percentage: get_opt_decimal(row, "discount_percentage")?,
            discount_days: row.get("discount_days")?,
            credit_limit: get_opt_decimal(row, "credit_limit")?,
            status: CustomerStatus::from_str(&row.get::<_, String>("status")?),
            last_contact_date: get_opt_ts(row, "last_contact_date")?,
            notes: row.get("notes")?,
            audit: read_audit(row)?,
        })
    }

    fn query_list(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepositoryResult<Vec<Customer>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::map_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入客户，返回新主键
    pub fn insert(&self, c: &Customer) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO customer (
                customer_number, company_name, contact_first_name, contact_last_name,
                email, alternative_email, phone, mobile, fax, website,
                billing_street, billing_zip_code, billing_city, billing_country,
                shipping_street, shipping_zip_code, shipping_city, shipping_country,
                vat_id, tax_number, payment_term_days, discount_percentage, discount_days,
                credit_limit, status, last_contact_date, notes,
                created_at, updated_at, created_by, updated_by, is_deleted, deleted_at, deleted_by
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31, ?32, ?33, ?34
            )
            "#,
            params![
                c.customer_number,
                c.company_name,
                c.contact_first_name,
                c.contact_last_name,
                c.email,
                c.alternative_email,
                c.phone,
                c.mobile,
                c.fax,
                c.website,
                c.billing_street,
                c.billing_zip_code,
                c.billing_city,
                c.billing_country,
                c.shipping_street,
                c.shipping_zip_code,
                c.shipping_city,
                c.shipping_country,
                c.vat_id,
                c.tax_number,
                c.payment_term_days,
                fmt_opt_dec(&c.discount_percentage),
                c.discount_days,
                fmt_opt_dec(&c.credit_limit),
                c.status.to_db_str(),
                c.last_contact_date.as_ref().map(fmt_ts),
                c.notes,
                fmt_ts(&c.audit.created_at),
                fmt_ts(&c.audit.updated_at),
                c.audit.created_by,
                c.audit.updated_by,
                c.audit.is_deleted,
                c.audit.deleted_at.as_ref().map(fmt_ts),
                c.audit.deleted_by,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 更新客户主数据（不修改编号与删除标志）
    pub fn update(&self, c: &Customer) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE customer SET
                company_name = ?1, contact_first_name = ?2, contact_last_name = ?3,
                email = ?4, alternative_email = ?5, phone = ?6, mobile = ?7, fax = ?8, website = ?9,
                billing_street = ?10, billing_zip_code = ?11, billing_city = ?12, billing_country = ?13,
                shipping_street = ?14, shipping_zip_code = ?15, shipping_city = ?16, shipping_country = ?17,
                vat_id = ?18, tax_number = ?19, payment_term_days = ?20, discount_percentage = ?21,
                discount_days = ?22, credit_limit = ?23, status = ?24, last_contact_date = ?25,
                notes = ?26, updated_at = ?27, updated_by = ?28
            WHERE id = ?29 AND is_deleted = 0
            "#,
            params![
                c.company_name,
                c.contact_first_name,
                c.contact_last_name,
                c.email,
                c.alternative_email,
                c.phone,
                c.mobile,
                c.fax,
                c.website,
                c.billing_street,
                c.billing_zip_code,
                c.billing_city,
                c.billing_country,
                c.shipping_street,
                c.shipping_zip_code,
                c.shipping_city,
                c.shipping_country,
                c.vat_id,
                c.tax_number,
                c.payment_term_days,
                fmt_opt_dec(&c.discount_percentage),
                c.discount_days,
                fmt_opt_dec(&c.credit_limit),
                c.status.to_db_str(),
                c.last_contact_date.as_ref().map(fmt_ts),
                c.notes,
                fmt_ts(&c.audit.updated_at),
                c.audit.updated_by,
                c.id,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Customer", c.id));
        }
        Ok(())
    }

    pub fn soft_delete(&self, id: i64, actor: Option<&str>, now: &NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        soft_delete_row(&conn, SoftDeleteTable::Customer, id, actor, now)
    }

    pub fn restore(&self, id: i64, actor: Option<&str>, now: &NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        restore_row(&conn, SoftDeleteTable::Customer, id, actor, now)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按主键查询（include_deleted 控制是否包含已删除）
    pub fn find_by_id(&self, id: i64, include_deleted: bool) -> RepositoryResult<Option<Customer>> {
        let conn = self.get_conn()?;
        let sql = if include_deleted {
            Self::select_sql("WHERE id = ?1")
        } else {
            Self::select_sql("WHERE id = ?1 AND is_deleted = 0")
        };
        Ok(conn.query_row(&sql, params![id], Self::map_row).optional()?)
    }

    pub fn find_by_number(&self, customer_number: &str) -> RepositoryResult<Option<Customer>> {
        let conn = self.get_conn()?;
        let sql = Self::select_sql("WHERE customer_number = ?1 AND is_deleted = 0");
        Ok(conn
            .query_row(&sql, params![customer_number], Self::map_row)
            .optional()?)
    }

    /// 全部未删除客户（按编号升序）
    pub fn list_all(&self) -> RepositoryResult<Vec<Customer>> {
        let conn = self.get_conn()?;
        let sql = Self::select_sql("WHERE is_deleted = 0 ORDER BY customer_number");
        Self::query_list(&conn, &sql, [])
    }

    /// 按编号/公司名/联系人/邮箱/城市模糊搜索
    pub fn search(&self, term: &str) -> RepositoryResult<Vec<Customer>> {
        let conn = self.get_conn()?;
        let sql = Self::select_sql(
            r#"WHERE is_deleted = 0 AND (
                customer_number LIKE ?1 ESCAPE '\'
                OR company_name LIKE ?1 ESCAPE '\'
                OR contact_first_name LIKE ?1 ESCAPE '\'
                OR contact_last_name LIKE ?1 ESCAPE '\'
                OR (contact_first_name || ' ' || contact_last_name) LIKE ?1 ESCAPE '\'
                OR email LIKE ?1 ESCAPE '\'
                OR billing_city LIKE ?1 ESCAPE '\'
            ) ORDER BY customer_number"#,
        );
        Self::query_list(&conn, &sql, params![like_pattern(term)])
    }

    /// 已用的最大客户流水号（含已删除，编号不复用）
    pub fn max_customer_sequence(&self) -> RepositoryResult<Option<u32>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT customer_number FROM customer WHERE customer_number LIKE ?1")?;
        let numbers = stmt
            .query_map(params![format!("{}%", CUSTOMER_NUMBER_PREFIX)], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(numbers.iter().filter_map(|n| parse_customer_number(n)).max())
    }

    pub fn count_active(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM customer WHERE is_deleted = 0 AND status = 'ACTIVE'",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn setup() -> CustomerRepository {
        let conn = crate::db::open_in_memory().unwrap();
        CustomerRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn sample(number: &str, last_name: &str) -> Customer {
        let mut c = Customer::new("Anna", last_name, "Ringstraße 5", "1010", "Wien");
        c.customer_number = number.to_string();
        c.email = Some(format!("{}@example.at", last_name.to_lowercase()));
        c.discount_percentage = Some(dec!(2.5));
        c.discount_days = Some(7);
        c
    }

    #[test]
    fn test_insert_and_find() {
        let repo = setup();
        let id = repo.insert(&sample("KD000001", "Huber")).unwrap();

        let found = repo.find_by_id(id, false).unwrap().unwrap();
        assert_eq!(found.customer_number, "KD000001");
        assert_eq!(found.discount_percentage, Some(dec!(2.5)));
        assert_eq!(found.billing_country, "Österreich");
        assert!(repo.find_by_number("KD000001").unwrap().is_some());
    }

    #[test]
    fn test_duplicate_number_rejected() {
        let repo = setup();
        repo.insert(&sample("KD000001", "Huber")).unwrap();
        let err = repo.insert(&sample("KD000001", "Maier")).unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }

    #[test]
    fn test_soft_delete_hides_but_keeps_sequence() {
        let repo = setup();
        repo.insert(&sample("KD000001", "Huber")).unwrap();
        let id2 = repo.insert(&sample("KD000002", "Maier")).unwrap();
        let now = chrono::Utc::now().naive_utc();

        repo.soft_delete(id2, Some("admin"), &now).unwrap();
        assert!(repo.find_by_id(id2, false).unwrap().is_none());
        let deleted = repo.find_by_id(id2, true).unwrap().unwrap();
        assert!(deleted.audit.is_deleted);
        assert_eq!(deleted.audit.deleted_by.as_deref(), Some("admin"));

        assert_eq!(repo.list_all().unwrap().len(), 1);
        assert_eq!(repo.max_customer_sequence().unwrap(), Some(2));

        // 重复删除报 NotFound
        assert!(repo.soft_delete(id2, None, &now).is_err());
        repo.restore(id2, Some("admin"), &now).unwrap();
        assert_eq!(repo.list_all().unwrap().len(), 2);
    }

    #[test]
    fn test_update_and_search() {
        let repo = setup();
        let id = repo.insert(&sample("KD000001", "Huber")).unwrap();
        repo.insert(&sample("KD000002", "Maier")).unwrap();

        let mut c = repo.find_by_id(id, false).unwrap().unwrap();
        c.company_name = Some("Huber & Söhne OG".to_string());
        c.status = CustomerStatus::Blocked;
        repo.update(&c).unwrap();

        let found = repo.search("söhne").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].status, CustomerStatus::Blocked);
        assert_eq!(repo.search("anna maier").unwrap().len(), 1);
        assert_eq!(repo.search("%").unwrap().len(), 0);
        assert_eq!(repo.count_active().unwrap(), 1);
    }
}
