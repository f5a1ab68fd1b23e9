// ==========================================
// 中小企业 ERP - 本公司信息数据仓储
// ==========================================
// 对齐: scripts/schema.sql company 表（单行，id = 1）
// ==========================================

use crate::domain::company::{BankAccount, Company};
use crate::repository::common::{fmt_dec, fmt_ts, get_decimal, read_audit, AUDIT_COLUMNS};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

/// 公司记录固定主键
pub const COMPANY_ROW_ID: i64 = 1;

const COMPANY_COLUMNS: &str = "id, name, legal_form, managing_director, street, zip_code, city,
    country, phone, fax, email, website, vat_id, tax_number, commercial_register, court,
    bank_name, iban, bic, account_holder, bank_name_2, iban_2, bic_2, account_holder_2,
    logo_path, company_color, secondary_color, default_payment_term_days, default_vat_rate,
    currency, additional_info, is_small_business, small_business_text";

pub struct CompanyRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CompanyRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Company> {
        let second_bank = BankAccount {
            bank_name: row.get("bank_name_2")?,
            iban: row.get("iban_2")?,
            bic: row.get("bic_2")?,
            account_holder: row.get("account_holder_2")?,
        };

        Ok(Company {
            id: row.get("id")?,
            name: row.get("name")?,
            legal_form: row.get("legal_form")?,
            managing_director: row.get("managing_director")?,
            street: row.get("street")?,
            zip_code: row.get("zip_code")?,
            city: row.get("city")?,
            country: row.get("country")?,
            phone: row.get("phone")?,
            fax: row.get("fax")?,
            email: row.get("email")?,
            website: row.get("website")?,
            vat_id: row.get("vat_id")?,
            tax_number: row.get("tax_number")?,
            commercial_register: row.get("commercial_register")?,
            court: row.get("court")?,
            bank: BankAccount {
                bank_name: row.get("bank_name")?,
                iban: row.get("iban")?,
                bic: row.get("bic")?,
                account_holder: row.get("account_holder")?,
            },
            second_bank: (!second_bank.is_empty()).then_some(second_bank),
            logo_path: row.get("logo_path")?,
            company_color: row.get("company_color")?,
            secondary_color: row.get("secondary_color")?,
            default_payment_term_days: row.get("default_payment_term_days")?,
            default_vat_rate: get_decimal(row, "default_vat_rate")?,
            currency: row.get("currency")?,
            additional_info: row.get("additional_info")?,
            is_small_business: row.get("is_small_business")?,
            small_business_text: row.get("small_business_text")?,
            audit: read_audit(row)?,
        })
    }

    /// 读取公司信息（尚未维护时返回 None）
    pub fn get(&self) -> RepositoryResult<Option<Company>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {}, {} FROM company WHERE id = ?1",
            COMPANY_COLUMNS, AUDIT_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![COMPANY_ROW_ID], Self::map_row)
            .optional()?)
    }

    /// 写入或覆盖公司信息（created_at/created_by 保留首次写入值）
    pub fn upsert(&self, company: &Company) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let second = company.second_bank.clone().unwrap_or_default();

        conn.execute(
            r#"
            INSERT INTO company (
                id, name, legal_form, managing_director, street, zip_code, city,
                country, phone, fax, email, website, vat_id, tax_number, commercial_register, court,
                bank_name, iban, bic, account_holder, bank_name_2, iban_2, bic_2, account_holder_2,
                logo_path, company_color, secondary_color, default_payment_term_days, default_vat_rate,
                currency, additional_info, is_small_business, small_business_text,
                created_at, updated_at, created_by, updated_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                      ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29,
                      ?30, ?31, ?32, ?33, ?34, ?35, ?36, ?37)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                legal_form = excluded.legal_form,
                managing_director = excluded.managing_director,
                street = excluded.street,
                zip_code = excluded.zip_code,
                city = excluded.city,
                country = excluded.country,
                phone = excluded.phone,
                fax = excluded.fax,
                email = excluded.email,
                website = excluded.website,
                vat_id = excluded.vat_id,
                tax_number = excluded.tax_number,
                commercial_register = excluded.commercial_register,
                court = excluded.court,
                bank_name = excluded.bank_name,
                iban = excluded.iban,
                bic = excluded.bic,
                account_holder = excluded.account_holder,
                bank_name_2 = excluded.bank_name_2,
                iban_2 = excluded.iban_2,
                bic_2 = excluded.bic_2,
                account_holder_2 = excluded.account_holder_2,
                logo_path = excluded.logo_path,
                company_color = excluded.company_color,
                secondary_color = excluded.secondary_color,
                default_payment_term_days = excluded.default_payment_term_days,
                default_vat_rate = excluded.default_vat_rate,
                currency = excluded.currency,
                additional_info = excluded.additional_info,
                is_small_business = excluded.is_small_business,
                small_business_text = excluded.small_business_text,
                updated_at = excluded.updated_at,
                updated_by = excluded.updated_by
            "#,
            params![
                COMPANY_ROW_ID,
                company.name,
                company.legal_form,
                company.managing_director,
                company.street,
                company.zip_code,
                company.city,
                company.country,
                company.phone,
                company.fax,
                company.email,
                company.website,
                company.vat_id,
                company.tax_number,
                company.commercial_register,
                company.court,
                company.bank.bank_name,
                company.bank.iban,
                company.bank.bic,
                company.bank.account_holder,
                second.bank_name,
                second.iban,
                second.bic,
                second.account_holder,
                company.logo_path,
                company.company_color,
                company.secondary_color,
                company.default_payment_term_days,
                fmt_dec(&company.default_vat_rate),
                company.currency,
                company.additional_info,
                company.is_small_business,
                company.small_business_text,
                fmt_ts(&company.audit.created_at),
                fmt_ts(&company.audit.updated_at),
                company.audit.created_by,
                company.audit.updated_by,
            ],
        )?;
        Ok(())
    }
}
