// ==========================================
// CustomerApi 集成测试
// ==========================================
// 测试范围:
// 1. 建档: 编号分配、校验失败
// 2. 修改/查询/搜索
// 3. 删除: 有未结发票时拒绝、软删除后编号不复用、恢复
// ==========================================

mod helpers;

use helpers::api_test_helper::*;
use helpers::test_data_builder::CustomerBuilder;
use rust_decimal_macros::dec;
use smb_erp::api::ApiError;

#[test]
fn test_create_customer_分配连续编号() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let first = env.create_customer(CustomerBuilder::new("Anna", "Huber").build());
    let second = env.create_customer(CustomerBuilder::new("Thomas", "Gruber").build());

    assert_eq!(first.customer_number, "KD000001");
    assert_eq!(second.customer_number, "KD000002");
    assert!(first.id > 0);
    assert_eq!(first.audit.created_by.as_deref(), Some(OPERATOR));
    assert_eq!(env.action_types_of("Customer", first.id), vec!["CreateCustomer"]);
}

#[test]
fn test_create_customer_校验失败() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let mut customer = CustomerBuilder::new("Anna", "Huber").build();
    customer.email = Some("kein-email".to_string());
    customer.billing_city = String::new();

    let err = env.customer_api.create_customer(customer, OPERATOR).unwrap_err();
    match err {
        ApiError::ValidationFailed { violations, .. } => {
            let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
            assert!(fields.contains(&"email"));
            assert!(fields.contains(&"billing_city"));
        }
        other => panic!("应为校验失败，实际: {:?}", other),
    }

    assert!(env.customer_api.create_customer(CustomerBuilder::new("A", "B").build(), " ").is_err());
}

#[test]
fn test_update_customer_保留编号() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let created = env.create_customer(CustomerBuilder::new("Anna", "Huber").build());

    let mut changed = created.clone();
    changed.customer_number = "KD999999".to_string();
    changed.billing_city = "Linz".to_string();
    changed.payment_term_days = 30;
    let updated = env.customer_api.update_customer(changed, "editor").unwrap();

    assert_eq!(updated.customer_number, "KD000001");
    let stored = env.customer_api.get_customer(created.id).unwrap();
    assert_eq!(stored.billing_city, "Linz");
    assert_eq!(stored.payment_term_days, 30);
    assert_eq!(stored.audit.created_by.as_deref(), Some(OPERATOR));
    assert_eq!(stored.audit.updated_by.as_deref(), Some("editor"));
}

#[test]
fn test_search_customers_按名称和城市() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_customer(CustomerBuilder::new("Anna", "Huber").company("Huber Bau GmbH").build());
    env.create_customer(CustomerBuilder::new("Thomas", "Gruber").city("Graz").build());

    let found = env.customer_api.search_customers("huber").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].contact_last_name, "Huber");

    let found = env.customer_api.search_customers("Graz").unwrap();
    assert_eq!(found.len(), 1);

    assert!(env.customer_api.search_customers("  ").is_err());
    assert_eq!(env.customer_api.list_customers().unwrap().len(), 2);
}

#[test]
fn test_delete_customer_有未结发票时拒绝() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let customer = env.create_customer(CustomerBuilder::new("Anna", "Huber").build());

    let invoice = env.create_draft(customer.id, date(2025, 3, 1));
    env.add_free_line(invoice.id, "Beratung", dec!(2), dec!(100), dec!(20));
    env.invoice_api.mark_sent(invoice.id, date(2025, 3, 1), OPERATOR).unwrap();

    let err = env.customer_api.delete_customer(customer.id, OPERATOR).unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));

    env.invoice_api
        .register_payment(invoice.id, dec!(240), date(2025, 3, 10), OPERATOR)
        .unwrap();
    env.customer_api.delete_customer(customer.id, OPERATOR).unwrap();
    assert!(matches!(
        env.customer_api.get_customer(customer.id),
        Err(ApiError::NotFound(_))
    ));
}

#[test]
fn test_soft_delete_编号不复用且可恢复() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let first = env.create_customer(CustomerBuilder::new("Anna", "Huber").build());
    let second = env.create_customer(CustomerBuilder::new("Thomas", "Gruber").build());

    env.customer_api.delete_customer(second.id, OPERATOR).unwrap();
    assert_eq!(env.customer_api.count_active_customers().unwrap(), 1);

    let third = env.create_customer(CustomerBuilder::new("Lisa", "Wagner").build());
    assert_eq!(third.customer_number, "KD000003");

    let restored = env.customer_api.restore_customer(second.id, OPERATOR).unwrap();
    assert_eq!(restored.customer_number, "KD000002");
    assert!(!restored.audit.is_deleted);
    assert_eq!(env.customer_api.count_active_customers().unwrap(), 3);
    assert_eq!(
        env.customer_api.get_customer_by_number("KD000001").unwrap().id,
        first.id
    );

    let history = env.action_types_of("Customer", second.id);
    assert_eq!(history, vec!["RestoreCustomer", "DeleteCustomer", "CreateCustomer"]);
}

#[test]
fn test_update_delete_restore_刷新修改人与修改时间() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.create_customer(CustomerBuilder::new("Anna", "Huber").build()).id;
    let created = env.customer_api.get_customer(id).unwrap();
    assert_eq!(created.audit.updated_by.as_deref(), Some(OPERATOR));

    let mut changed = created.clone();
    changed.notes = Some("Rückruf".to_string());
    env.customer_api.update_customer(changed, "editor").unwrap();
    let updated = env.customer_api.get_customer(id).unwrap();
    assert_eq!(updated.audit.updated_by.as_deref(), Some("editor"));
    assert!(updated.audit.updated_at >= created.audit.updated_at);
    assert_eq!(updated.audit.created_at, created.audit.created_at);

    env.customer_api.delete_customer(id, "deleter").unwrap();
    let restored = env.customer_api.restore_customer(id, "restorer").unwrap();
    assert_eq!(restored.audit.updated_by.as_deref(), Some("restorer"));
    assert!(restored.audit.updated_at >= updated.audit.updated_at);
    assert_eq!(restored.audit.created_by.as_deref(), Some(OPERATOR));
    assert!(restored.audit.deleted_by.is_none());
}
