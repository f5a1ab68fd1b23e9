// ==========================================
// DashboardApi 集成测试
// ==========================================

mod helpers;

use helpers::api_test_helper::*;
use helpers::test_data_builder::{CustomerBuilder, ItemBuilder};
use rust_decimal_macros::dec;

#[test]
fn test_summary_汇总应收与逾期() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let cid = env
        .create_customer(CustomerBuilder::new("Anna", "Huber").payment_terms(10).build())
        .id;
    env.create_customer(CustomerBuilder::new("Thomas", "Gruber").build());
    env.create_item(ItemBuilder::product("P-1", dec!(10)).stock(dec!(1), dec!(3)).build());
    env.create_item(ItemBuilder::service("S-1", dec!(90)).build());

    // 逾期且部分付款: 120 - 20 = 100
    let overdue = env.create_draft(cid, date(2025, 1, 1));
    env.add_free_line(overdue.id, "A", dec!(1), dec!(100), dec!(20));
    env.invoice_api.mark_sent(overdue.id, date(2025, 1, 1), OPERATOR).unwrap();
    env.invoice_api
        .register_payment(overdue.id, dec!(20), date(2025, 1, 5), OPERATOR)
        .unwrap();

    // 未到期: 60
    let open = env.create_draft(cid, date(2025, 1, 28));
    env.add_free_line(open.id, "B", dec!(1), dec!(50), dec!(20));
    env.invoice_api.mark_sent(open.id, date(2025, 1, 28), OPERATOR).unwrap();

    // 草稿不计入应收
    let draft = env.create_draft(cid, date(2025, 1, 28));
    env.add_free_line(draft.id, "C", dec!(1), dec!(999), dec!(20));

    let summary = env.dashboard_api.summary(date(2025, 2, 1)).unwrap();
    assert_eq!(summary.customer_count, 2);
    assert_eq!(summary.active_item_count, 2);
    assert_eq!(summary.low_stock_count, 1);
    assert_eq!(summary.open_receivables, dec!(160.00));
    assert_eq!(summary.overdue_count, 1);
    assert_eq!(summary.overdue_amount, dec!(100.00));

    let line = summary.summary_line();
    assert!(line.contains("160,00"));
}

#[test]
fn test_recent_actions_与实体历史() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let customer = env.create_customer(CustomerBuilder::new("Anna", "Huber").build());
    let mut changed = customer.clone();
    changed.notes = Some("VIP".to_string());
    env.customer_api.update_customer(changed, OPERATOR).unwrap();

    let recent = env.dashboard_api.get_recent_actions(10).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].action_type, "UpdateCustomer");

    let history = env
        .dashboard_api
        .list_entity_history("Customer", &customer.id.to_string())
        .unwrap();
    assert_eq!(history.len(), 2);

    assert!(env.dashboard_api.get_recent_actions(0).is_err());
    assert!(env.dashboard_api.list_entity_history(" ", "1").is_err());
}
