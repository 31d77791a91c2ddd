// ==========================================
// 计价集成测试（SQLite 运价表）
// ==========================================
// 测试范围:
// 1. 整单计价与金额回写
// 2. 未批准运单拒绝计价
// 3. 任一费用行失败时不写入任何金额
// 4. 已驳回费用行跳过
// ==========================================

mod helpers;

use helpers::test_data_builder::ShipmentBuilder;
use hhg_move_engine::api::ApiError;
use hhg_move_engine::domain::line_item::ShipmentLineItem;
use hhg_move_engine::domain::types::{LineItemLocation, LineItemStatus};
use hhg_move_engine::domain::units::{BaseQuantity, Cents};
use hhg_move_engine::logging;
use test_helpers::{create_test_db, june_2018, seed_tariff, setup_env, TestEnv};

/// 推进到 APPROVED 的可计价运单
fn approved_shipment_id(env: &TestEnv) -> String {
    let api = &env.shipment_api;
    let shipment = api
        .create_shipment(ShipmentBuilder::new("move-1").priceable().build(june_2018()))
        .unwrap();
    let id = shipment.shipment_id.clone();
    let tsp = api.create_tsp("ABCD", "Acme Movers").unwrap();

    api.submit(&id).unwrap();
    api.award(&id).unwrap();
    api.create_shipment_offer(&id, &tsp.tsp_id, "perf-1", false).unwrap();
    api.accept_shipment_for_tsp(&tsp.tsp_id, &id).unwrap();
    api.approve(&id).unwrap();
    id
}

#[test]
fn test_price_shipment_writes_amounts() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = setup_env(&db_path, june_2018);
    seed_tariff(&env.tariff_repo);
    let id = approved_shipment_id(&env);
    let api = &env.shipment_api;

    api.create_shipment_line_item(&id, "105B", 5, 0, LineItemLocation::Origin, None)
        .unwrap();
    api.create_shipment_line_item(&id, "120A", 1, 0, LineItemLocation::Origin, None)
        .unwrap();
    api.create_shipment_line_item(&id, "LHS", 0, 0, LineItemLocation::Origin, None)
        .unwrap();

    let priced = env.rate_api.price_shipment(&id).unwrap();
    let amount_of = |code: &str| {
        priced
            .iter()
            .find(|i| i.code == code)
            .and_then(|i| i.amount_cents)
    };
    // 2275 × 5
    assert_eq!(amount_of("105B"), Some(Cents(11375)));
    assert_eq!(amount_of("120A"), Some(Cents(1890)));
    // 100×20 + 57×20 + 60×20
    assert_eq!(amount_of("LHS"), Some(Cents(4340)));

    let stored = env.line_item_repo.find_by_shipment(&id).unwrap();
    assert!(stored.iter().all(|i| i.amount_cents.is_some()));
    let total: Cents = stored.iter().filter_map(|i| i.amount_cents).sum();
    assert_eq!(total, Cents(17605));

    // 重复计价结果一致
    let again = env.rate_api.price_shipment(&id).unwrap();
    let again_total: Cents = again.iter().filter_map(|i| i.amount_cents).sum();
    assert_eq!(again_total, total);
}

#[test]
fn test_price_requires_approved_shipment() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = setup_env(&db_path, june_2018);
    seed_tariff(&env.tariff_repo);
    let api = &env.shipment_api;

    let shipment = api
        .create_shipment(ShipmentBuilder::new("move-1").priceable().build(june_2018()))
        .unwrap();
    api.submit(&shipment.shipment_id).unwrap();
    let item = api
        .create_shipment_line_item(&shipment.shipment_id, "105B", 5, 0, LineItemLocation::Origin, None)
        .unwrap();

    let err = env.rate_api.price_shipment(&shipment.shipment_id).unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)), "实际: {:?}", err);
    let err = env.rate_api.price_line_item(&item.line_item_id).unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));

    let err = env.rate_api.price_line_item("no-such-item").unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[test]
fn test_failed_item_leaves_no_amounts() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = setup_env(&db_path, june_2018);
    seed_tariff(&env.tariff_repo);
    let id = approved_shipment_id(&env);
    let api = &env.shipment_api;

    api.create_shipment_line_item(&id, "105B", 5, 0, LineItemLocation::Origin, None)
        .unwrap();
    // 未登记的项目代码
    api.create_shipment_line_item(&id, "999Z", 1, 0, LineItemLocation::Origin, None)
        .unwrap();

    let err = env.rate_api.price_shipment(&id).unwrap_err();
    assert!(matches!(err, ApiError::PricingError(_)), "实际: {:?}", err);

    let stored = env.line_item_repo.find_by_shipment(&id).unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|i| i.amount_cents.is_none()));
}

#[test]
fn test_rejected_items_are_skipped() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = setup_env(&db_path, june_2018);
    seed_tariff(&env.tariff_repo);
    let id = approved_shipment_id(&env);

    let mut rejected = ShipmentLineItem::new(
        &id,
        "999Z",
        BaseQuantity::from_int(1),
        BaseQuantity(0),
        LineItemLocation::Origin,
        Some("duplicate".to_string()),
        june_2018(),
    );
    rejected.status = LineItemStatus::Rejected;
    env.line_item_repo.insert(&rejected).unwrap();
    env.shipment_api
        .create_shipment_line_item(&id, "105B", 5, 0, LineItemLocation::Origin, None)
        .unwrap();

    let priced = env.rate_api.price_shipment(&id).unwrap();
    assert_eq!(priced.len(), 1);
    assert_eq!(priced[0].amount_cents, Some(Cents(11375)));

    let err = env.rate_api.price_line_item(&rejected.line_item_id).unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
    let stored = env.line_item_repo.find_by_id(&rejected.line_item_id).unwrap().unwrap();
    assert!(stored.amount_cents.is_none());
}

#[test]
fn test_price_single_line_item_at_destination() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = setup_env(&db_path, june_2018);
    seed_tariff(&env.tariff_repo);
    let id = approved_shipment_id(&env);

    // 目的地服务区 500 为档 2: 2500 × 2
    let item = env
        .shipment_api
        .create_shipment_line_item(&id, "105E", 2, 0, LineItemLocation::Destination, None)
        .unwrap();
    let priced = env.rate_api.price_line_item(&item.line_item_id).unwrap();
    assert_eq!(priced.amount_cents, Some(Cents(5000)));

    let by_code = env.shipment_api.fetch_line_items_by_code(&id, "105E").unwrap();
    assert_eq!(by_code.len(), 1);
    assert_eq!(by_code[0].amount_cents, Some(Cents(5000)));
}

#[test]
fn test_save_shipment_and_line_items_is_atomic() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = setup_env(&db_path, june_2018);
    let api = &env.shipment_api;

    let shipment = api
        .create_shipment(ShipmentBuilder::new("move-1").priceable().build(june_2018()))
        .unwrap();
    let items = vec![
        api.build_line_item(&shipment.shipment_id, "105B", 5, 0, LineItemLocation::Origin, None)
            .unwrap(),
        api.build_line_item(&shipment.shipment_id, "120A", 1, 0, LineItemLocation::Origin, None)
            .unwrap(),
    ];

    let mut edited = shipment.clone();
    edited.market = Some("dHHG".to_string());
    let saved = api.save_shipment_and_line_items(&edited, &items).unwrap();
    assert_eq!(saved.revision, 1);
    assert_eq!(env.line_item_repo.find_by_shipment(&shipment.shipment_id).unwrap().len(), 2);

    // 过期 revision：运单与新费用行都不写入
    let extra = vec![api
        .build_line_item(&shipment.shipment_id, "LHS", 0, 0, LineItemLocation::Origin, None)
        .unwrap()];
    let err = api.save_shipment_and_line_items(&edited, &extra).unwrap_err();
    assert!(matches!(err, ApiError::ConcurrencyConflict(_)), "实际: {:?}", err);
    assert_eq!(env.line_item_repo.find_by_shipment(&shipment.shipment_id).unwrap().len(), 2);
}
