// ==========================================
// ItemApi 集成测试
// ==========================================
// 测试范围:
// 1. 建档: 货号唯一、类型不可修改
// 2. 库存调整: 增加/减少/盘点，服务不可调整，减少不可超过库存
// 3. 低库存查询、上下架、删除
// ==========================================

mod helpers;

use helpers::api_test_helper::*;
use helpers::test_data_builder::ItemBuilder;
use rust_decimal_macros::dec;
use smb_erp::api::{ApiError, StockAdjustment};
use smb_erp::domain::item::ItemDetails;
use smb_erp::ItemKind;

fn stock_of(item: &smb_erp::Item) -> rust_decimal::Decimal {
    match &item.details {
        ItemDetails::Product(p) => p.stock_quantity,
        ItemDetails::Service(_) => panic!("服务没有库存"),
    }
}

#[test]
fn test_create_item_货号唯一() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let created = env.create_item(ItemBuilder::product("P-1", dec!(10)).build());
    assert!(created.id > 0);

    let err = env
        .item_api
        .create_item(ItemBuilder::service("P-1", dec!(90)).build(), OPERATOR)
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));

    let by_number = env.item_api.get_item_by_number("P-1").unwrap();
    assert_eq!(by_number.id, created.id);
    assert_eq!(by_number.kind(), ItemKind::Product);
}

#[test]
fn test_update_item_类型不可修改() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let product = env.create_item(ItemBuilder::product("P-1", dec!(10)).build());

    let mut as_service = ItemBuilder::service("P-1", dec!(10)).build();
    as_service.id = product.id;
    assert!(matches!(
        env.item_api.update_item(as_service, OPERATOR),
        Err(ApiError::InvalidInput(_))
    ));

    let mut changed = product.clone();
    changed.sale_price = dec!(12.50);
    env.item_api.update_item(changed, OPERATOR).unwrap();
    assert_eq!(env.item_api.get_item(product.id).unwrap().sale_price, dec!(12.50));
}

#[test]
fn test_adjust_stock_增减与盘点() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let item = env.create_item(ItemBuilder::product("P-1", dec!(10)).stock(dec!(10), dec!(2)).build());

    let item = env
        .item_api
        .adjust_stock(item.id, StockAdjustment::Increase, dec!(5), Some("Lieferung"), OPERATOR)
        .unwrap();
    assert_eq!(stock_of(&item), dec!(15));

    let item = env
        .item_api
        .adjust_stock(item.id, StockAdjustment::Decrease, dec!(4), None, OPERATOR)
        .unwrap();
    assert_eq!(stock_of(&item), dec!(11));

    let err = env
        .item_api
        .adjust_stock(item.id, StockAdjustment::Decrease, dec!(12), None, OPERATOR)
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));

    let item = env
        .item_api
        .adjust_stock(item.id, StockAdjustment::Set, dec!(7), Some("Inventur"), OPERATOR)
        .unwrap();
    assert_eq!(stock_of(&env.item_api.get_item(item.id).unwrap()), dec!(7));

    let history = env.action_types_of("Item", item.id);
    assert_eq!(history.iter().filter(|t| *t == "AdjustStock").count(), 3);
}

#[test]
fn test_adjust_stock_服务不可调整() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let service = env.create_item(ItemBuilder::service("S-1", dec!(90)).build());

    let result = env
        .item_api
        .adjust_stock(service.id, StockAdjustment::Increase, dec!(1), None, OPERATOR);
    assert!(result.is_err());
}

#[test]
fn test_list_low_stock_仅在售商品() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let low = env.create_item(ItemBuilder::product("P-LOW", dec!(10)).stock(dec!(1), dec!(5)).build());
    env.create_item(ItemBuilder::product("P-EDGE", dec!(10)).stock(dec!(5), dec!(5)).build());
    env.create_item(ItemBuilder::product("P-OFF", dec!(10)).stock(dec!(0), dec!(5)).inactive().build());
    env.create_item(ItemBuilder::service("S-1", dec!(90)).build());

    let items = env.item_api.list_low_stock().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, low.id);

    assert_eq!(env.item_api.list_items_by_kind(ItemKind::Service).unwrap().len(), 1);
    assert_eq!(env.item_api.count_active_items().unwrap(), 3);
}

#[test]
fn test_activate_deactivate_delete() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let item = env.create_item(ItemBuilder::product("P-1", dec!(10)).build());

    let item = env.item_api.deactivate_item(item.id, OPERATOR).unwrap();
    assert!(!item.is_active);
    assert!(env.item_api.list_active_items().unwrap().is_empty());

    let item = env.item_api.activate_item(item.id, OPERATOR).unwrap();
    assert!(item.is_active);

    env.item_api.delete_item(item.id, OPERATOR).unwrap();
    assert!(matches!(env.item_api.get_item(item.id), Err(ApiError::NotFound(_))));
    assert!(env.item_api.list_items().unwrap().is_empty());
}
