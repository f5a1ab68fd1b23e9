// ==========================================
// 中小企业 ERP - 邮件模板数据仓储
// ==========================================
// 红线: 每种模板类型至多一个默认模板（set_default 单事务切换）
// ==========================================

use crate::domain::email_template::{EmailPriority, EmailTemplate};
use crate::domain::types::EmailTemplateType;
use crate::repository::common::{
    fmt_ts, read_audit, soft_delete_row, SoftDeleteTable, AUDIT_COLUMNS,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const TEMPLATE_COLUMNS: &str = "id, name, template_type, subject, body, is_html, is_default,
    is_active, language, description, available_placeholders, attach_pdf_automatically,
    bcc_email, reply_to_email, priority";

pub struct EmailTemplateRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EmailTemplateRepository {
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
            "SELECT {}, {} FROM email_template {}",
            TEMPLATE_COLUMNS, AUDIT_COLUMNS, where_clause
        )
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<EmailTemplate> {
        Ok(EmailTemplate {
            id: row.get("id")?,
            name: row.get("name")?,
            template_type: EmailTemplateType::from_str(&row.get::<_, String>("template_type")?),
            subject: row.get("subject")?,
            body: row.get("body")?,
            is_html: row.get("is_html")?,
            is_default: row.get("is_default")?,
            is_active: row.get("is_active")?,
            language: row.get("language")?,
            description: row.get("description")?,
            available_placeholders: row.get("available_placeholders")?,
            attach_pdf_automatically: row.get("attach_pdf_automatically")?,
            bcc_email: row.get("bcc_email")?,
            reply_to_email: row.get("reply_to_email")?,
            priority: EmailPriority::from_str(&row.get::<_, String>("priority")?),
            audit: read_audit(row)?,
        })
    }

    fn query_list(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepositoryResult<Vec<EmailTemplate>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::map_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 插入模板；若标记为默认，同一事务内清除同类型其他默认
    pub fn insert(&self, template: &EmailTemplate) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        if template.is_default && !template.audit.is_deleted {
            tx.execute(
                "UPDATE email_template SET is_default = 0 WHERE template_type = ?1 AND is_default = 1",
                params![template.template_type.to_db_str()],
            )?;
        }

        tx.execute(
            r#"
            INSERT INTO email_template (
                name, template_type, subject, body, is_html, is_default, is_active, language,
                description, available_placeholders, attach_pdf_automatically,
                bcc_email, reply_to_email, priority,
                created_at, updated_at, created_by, updated_by, is_deleted, deleted_at, deleted_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                      ?15, ?16, ?17, ?18, ?19, ?20, ?21)
            "#,
            params![
                template.name,
                template.template_type.to_db_str(),
                template.subject,
                template.body,
                template.is_html,
                template.is_default,
                template.is_active,
                template.language,
                template.description,
                template.available_placeholders,
                template.attach_pdf_automatically,
                template.bcc_email,
                template.reply_to_email,
                template.priority.to_db_str(),
                fmt_ts(&template.audit.created_at),
                fmt_ts(&template.audit.updated_at),
                template.audit.created_by,
                template.audit.updated_by,
                template.audit.is_deleted,
                template.audit.deleted_at.as_ref().map(fmt_ts),
                template.audit.deleted_by,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    /// 更新模板内容（默认标记由 set_default 维护，此处不改）
    pub fn update(&self, template: &EmailTemplate) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE email_template SET
                name = ?1, template_type = ?2, subject = ?3, body = ?4, is_html = ?5,
                is_active = ?6, language = ?7, description = ?8, available_placeholders = ?9,
                attach_pdf_automatically = ?10, bcc_email = ?11, reply_to_email = ?12,
                priority = ?13, updated_at = ?14, updated_by = ?15
            WHERE id = ?16 AND is_deleted = 0
            "#,
            params![
                template.name,
                template.template_type.to_db_str(),
                template.subject,
                template.body,
                template.is_html,
                template.is_active,
                template.language,
                template.description,
                template.available_placeholders,
                template.attach_pdf_automatically,
                template.bcc_email,
                template.reply_to_email,
                template.priority.to_db_str(),
                fmt_ts(&template.audit.updated_at),
                template.audit.updated_by,
                template.id,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("EmailTemplate", template.id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<EmailTemplate>> {
        let conn = self.get_conn()?;
        let sql = Self::select_sql("WHERE id = ?1 AND is_deleted = 0");
        Ok(conn.query_row(&sql, params![id], Self::map_row).optional()?)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<EmailTemplate>> {
        let conn = self.get_conn()?;
        let sql = Self::select_sql("WHERE is_deleted = 0 ORDER BY template_type, name");
        Self::query_list(&conn, &sql, [])
    }

    /// 某类型的模板（默认模板排在最前）
    pub fn list_by_type(&self, template_type: EmailTemplateType) -> RepositoryResult<Vec<EmailTemplate>> {
        let conn = self.get_conn()?;
        let sql = Self::select_sql(
            "WHERE template_type = ?1 AND is_deleted = 0 ORDER BY is_default DESC, name",
        );
        Self::query_list(&conn, &sql, params![template_type.to_db_str()])
    }

    /// 某类型的默认模板（仅启用的）
    pub fn find_default(&self, template_type: EmailTemplateType) -> RepositoryResult<Option<EmailTemplate>> {
        let conn = self.get_conn()?;
        let sql = Self::select_sql(
            "WHERE template_type = ?1 AND is_default = 1 AND is_active = 1 AND is_deleted = 0 LIMIT 1",
        );
        Ok(conn
            .query_row(&sql, params![template_type.to_db_str()], Self::map_row)
            .optional()?)
    }

    /// 设为默认: 同一事务内清除同类型其他默认标记
    pub fn set_default(&self, id: i64, actor: Option<&str>, now: &NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let template_type: Option<String> = tx
            .query_row(
                "SELECT template_type FROM email_template WHERE id = ?1 AND is_deleted = 0",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let template_type =
            template_type.ok_or_else(|| RepositoryError::not_found("EmailTemplate", id))?;

        tx.execute(
            "UPDATE email_template SET is_default = 0 WHERE template_type = ?1 AND id <> ?2 AND is_default = 1",
            params![template_type, id],
        )?;
        tx.execute(
            "UPDATE email_template SET is_default = 1, updated_at = ?1, updated_by = ?2 WHERE id = ?3",
            params![fmt_ts(now), actor, id],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// 软删除（同时取消默认标记）
    pub fn soft_delete(&self, id: i64, actor: Option<&str>, now: &NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        soft_delete_row(&conn, SoftDeleteTable::EmailTemplate, id, actor, now)?;
        conn.execute(
            "UPDATE email_template SET is_default = 0 WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> EmailTemplateRepository {
        let conn = crate::db::open_in_memory().unwrap();
        EmailTemplateRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn template(name: &str, is_default: bool) -> EmailTemplate {
        let mut t = EmailTemplate::new(
            name,
            EmailTemplateType::Invoice,
            "Rechnung {{InvoiceNumber}}",
            "Sehr geehrte/r {{CustomerName}}",
        );
        t.is_default = is_default;
        t
    }

    #[test]
    fn test_insert_and_find() {
        let repo = setup();
        let id = repo.insert(&template("Standard", true)).unwrap();
        let found = repo.find_by_id(id).unwrap().unwrap();
        assert_eq!(found.template_type, EmailTemplateType::Invoice);
        assert_eq!(found.priority, EmailPriority::Normal);
        assert!(found.is_default);
        assert_eq!(
            repo.find_default(EmailTemplateType::Invoice).unwrap().unwrap().id,
            id
        );
        assert!(repo.find_default(EmailTemplateType::Quote).unwrap().is_none());
    }

    #[test]
    fn test_single_default_per_type() {
        let repo = setup();
        let first = repo.insert(&template("Standard", true)).unwrap();
        let second = repo.insert(&template("Formell", true)).unwrap();

        let defaults: Vec<i64> = repo
            .list_by_type(EmailTemplateType::Invoice)
            .unwrap()
            .into_iter()
            .filter(|t| t.is_default)
            .map(|t| t.id)
            .collect();
        assert_eq!(defaults, vec![second]);

        let now = chrono::Utc::now().naive_utc();
        repo.set_default(first, Some("admin"), &now).unwrap();
        assert_eq!(
            repo.find_default(EmailTemplateType::Invoice).unwrap().unwrap().id,
            first
        );
        assert!(!repo.find_by_id(second).unwrap().unwrap().is_default);
    }

    #[test]
    fn test_set_default_missing_and_soft_delete() {
        let repo = setup();
        let now = chrono::Utc::now().naive_utc();
        assert!(matches!(
            repo.set_default(99, None, &now),
            Err(RepositoryError::NotFound { .. })
        ));

        let id = repo.insert(&template("Standard", true)).unwrap();
        repo.soft_delete(id, Some("admin"), &now).unwrap();
        assert!(repo.find_by_id(id).unwrap().is_none());
        assert!(repo.find_default(EmailTemplateType::Invoice).unwrap().is_none());
        assert!(repo.list_all().unwrap().is_empty());
    }
}
