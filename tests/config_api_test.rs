// ==========================================
// ConfigApi 集成测试
// ==========================================
// 测试范围:
// 1. 配置更新: update_config 影响发票编号与审计开关
// 2. 配置快照: get_config_snapshot, restore_from_snapshot
// ==========================================

mod helpers;

use helpers::api_test_helper::*;
use helpers::test_data_builder::CustomerBuilder;
use smb_erp::api::ApiError;
use smb_erp::config::config_keys;

#[test]
fn test_update_config_影响发票编号() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.config_api
        .update_config(config_keys::INVOICE_NUMBER_PREFIX, "AR", OPERATOR, "新编号规则")
        .unwrap();
    env.config_api
        .update_config(config_keys::INVOICE_START_NUMBER, "100", OPERATOR, "新编号规则")
        .unwrap();

    let settings = env.config_api.invoice_settings().unwrap();
    assert_eq!(settings.number_prefix, "AR");
    assert_eq!(settings.start_number, 100);

    let cid = env.create_customer(CustomerBuilder::new("Anna", "Huber").build()).id;
    let invoice = env.create_draft(cid, date(2025, 5, 1));
    assert_eq!(invoice.invoice_number, "AR-2025-0100");

    assert_eq!(
        env.config_api.get_config(config_keys::INVOICE_NUMBER_PREFIX).unwrap(),
        Some("AR".to_string())
    );
}

#[test]
fn test_update_config_缺少原因() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    assert!(matches!(
        env.config_api.update_config("currency", "CHF", OPERATOR, " "),
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(
        env.config_api.update_config(" ", "x", OPERATOR, "原因"),
        Err(ApiError::InvalidInput(_))
    ));
}

#[test]
fn test_enable_audit_logs_关闭后不记录() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.config_api
        .update_config(config_keys::ENABLE_AUDIT_LOGS, "false", OPERATOR, "演示环境")
        .unwrap();

    let customer = env.create_customer(CustomerBuilder::new("Anna", "Huber").build());
    assert!(env.action_types_of("Customer", customer.id).is_empty());
}

#[test]
fn test_restore_from_snapshot_覆盖快照中的键() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.config_api
        .update_config(config_keys::CURRENCY, "EUR", OPERATOR, "初始化")
        .unwrap();
    let snapshot = env.config_api.get_config_snapshot().unwrap();

    env.config_api
        .update_config(config_keys::CURRENCY, "CHF", OPERATOR, "测试")
        .unwrap();
    env.config_api
        .update_config(config_keys::DATE_FORMAT, "%Y/%m/%d", OPERATOR, "测试")
        .unwrap();

    let restored = env
        .config_api
        .restore_from_snapshot(&snapshot, OPERATOR, "回滚")
        .unwrap();
    assert!(restored >= 1);
    assert_eq!(
        env.config_api.get_config(config_keys::CURRENCY).unwrap(),
        Some("EUR".to_string())
    );
    // 快照外的键保持不变
    assert_eq!(
        env.config_api.get_config(config_keys::DATE_FORMAT).unwrap(),
        Some("%Y/%m/%d".to_string())
    );

    assert!(matches!(
        env.config_api.restore_from_snapshot("{not json", OPERATOR, "回滚"),
        Err(ApiError::InvalidInput(_))
    ));
}
