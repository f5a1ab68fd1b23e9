// ==========================================
// Repository 层集成测试
// ==========================================
// 测试目标: 文件库上的持久化、软删除可见性、跨连接读取
// ==========================================

mod test_helpers;

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime, Utc};
use rust_decimal_macros::dec;
use smb_erp::db::{open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
use smb_erp::domain::{AuditInfo, Customer, Invoice, InvoiceLine};
use smb_erp::repository::{CustomerRepository, InvoiceRepository, RepositoryError};

fn shared(db_path: &str) -> Arc<Mutex<rusqlite::Connection>> {
    Arc::new(Mutex::new(open_sqlite_connection(db_path).expect("打开数据库失败")))
}

fn sample_customer(number: &str) -> Customer {
    let mut customer = Customer::new("Anna", "Huber", "Teststraße 1", "1010", "Wien");
    customer.customer_number = number.to_string();
    customer.email = Some("anna@example.at".to_string());
    customer.audit = AuditInfo::now(Some("tester"));
    customer
}

#[test]
fn test_schema_version_已记录() {
    let (_tmp, db_path) = test_helpers::create_test_db().unwrap();
    let conn = open_sqlite_connection(&db_path).unwrap();
    assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
}

#[test]
fn test_customer_软删除跨连接可见性() {
    let (_tmp, db_path) = test_helpers::create_test_db().unwrap();
    let writer = CustomerRepository::new(shared(&db_path));
    let reader = CustomerRepository::new(shared(&db_path));

    let id = writer.insert(&sample_customer("KD000001")).unwrap();
    assert!(reader.find_by_id(id, false).unwrap().is_some());

    let now = Utc::now().naive_utc();
    writer.soft_delete(id, Some("tester"), &now).unwrap();
    assert!(reader.find_by_id(id, false).unwrap().is_none());
    let deleted = reader.find_by_id(id, true).unwrap().unwrap();
    assert!(deleted.audit.is_deleted);
    assert_eq!(deleted.audit.deleted_by.as_deref(), Some("tester"));

    // 已删除客户的编号仍计入最大流水号
    assert_eq!(reader.max_customer_sequence().unwrap(), Some(1));

    // 编号唯一约束
    let err = writer.insert(&sample_customer("KD000001")).unwrap_err();
    assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));

    // 重复删除返回 NotFound
    assert!(matches!(
        writer.soft_delete(id, Some("tester"), &now),
        Err(RepositoryError::NotFound { .. })
    ));
}

fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

#[test]
fn test_customer_删除与恢复更新修改时间() {
    let (_tmp, db_path) = test_helpers::create_test_db().unwrap();
    let repo = CustomerRepository::new(shared(&db_path));

    let mut customer = sample_customer("KD000001");
    customer.audit = AuditInfo::new(Some("creator"), ts("2025-01-01 08:00:00"));
    let id = repo.insert(&customer).unwrap();

    repo.soft_delete(id, Some("deleter"), &ts("2025-02-01 09:30:00")).unwrap();
    let deleted = repo.find_by_id(id, true).unwrap().unwrap();
    assert_eq!(deleted.audit.updated_at, ts("2025-02-01 09:30:00"));
    assert_eq!(deleted.audit.updated_by.as_deref(), Some("deleter"));
    assert_eq!(deleted.audit.deleted_at, Some(ts("2025-02-01 09:30:00")));
    assert_eq!(deleted.audit.created_at, ts("2025-01-01 08:00:00"));

    repo.restore(id, Some("restorer"), &ts("2025-03-01 10:00:00")).unwrap();
    let restored = repo.find_by_id(id, false).unwrap().unwrap();
    assert!(!restored.audit.is_deleted);
    assert_eq!(restored.audit.deleted_at, None);
    assert_eq!(restored.audit.updated_at, ts("2025-03-01 10:00:00"));
    assert_eq!(restored.audit.updated_by.as_deref(), Some("restorer"));
    assert_eq!(restored.audit.created_by.as_deref(), Some("creator"));

    // 未删除的行不能恢复
    assert!(matches!(
        repo.restore(id, Some("restorer"), &ts("2025-03-02 10:00:00")),
        Err(RepositoryError::NotFound { .. })
    ));
}

#[test]
fn test_invoice_明细随表头保存() {
    let (_tmp, db_path) = test_helpers::create_test_db().unwrap();
    let conn = shared(&db_path);
    let customer_id = CustomerRepository::new(conn.clone())
        .insert(&sample_customer("KD000001"))
        .unwrap();
    let repo = InvoiceRepository::new(conn);

    let mut invoice = Invoice::new(customer_id, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(), 14);
    invoice.invoice_number = "RG-2025-0001".to_string();
    invoice.audit = AuditInfo::now(Some("tester"));
    invoice
        .add_line(InvoiceLine::new("Beratung", dec!(1.5), dec!(120), dec!(20)))
        .unwrap();
    invoice
        .add_line(InvoiceLine::new("Fachbuch", dec!(1), dec!(45.90), dec!(10)))
        .unwrap();
    let id = repo.insert(&invoice).unwrap();

    let mut stored = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(stored.lines.len(), 2);
    assert_eq!(stored.net_amount, dec!(225.90));
    assert_eq!(stored.vat_amount, dec!(40.59));
    assert_eq!(stored.total_amount, dec!(266.49));

    stored.remove_line(1, Some("tester")).unwrap();
    repo.save(&stored).unwrap();

    let reloaded = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(reloaded.lines.len(), 2);
    assert_eq!(reloaded.active_lines().count(), 1);
    assert_eq!(reloaded.total_amount, dec!(50.49));
    assert_eq!(
        repo.invoice_numbers_with_prefix("RG-2025-").unwrap(),
        vec!["RG-2025-0001".to_string()]
    );
}
