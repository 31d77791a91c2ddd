// ==========================================
// 搬迁日期 + 配置集成测试
// ==========================================
// 测试范围:
// 1. 默认天数表与联邦假日
// 2. 配置覆盖打包天数表与额外假日
// 3. 按运单属性计算
// ==========================================

mod helpers;

use helpers::test_data_builder::ShipmentBuilder;
use hhg_move_engine::api::ApiError;
use hhg_move_engine::app::AppState;
use hhg_move_engine::config::config_keys;
use hhg_move_engine::domain::units::{Miles, Pound};
use hhg_move_engine::logging;
use test_helpers::{create_test_db, d, june_2018};

#[test]
fn test_default_tables_skip_independence_day() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path).unwrap();

    // 2018-07-05 周四；07-04 为独立日
    let summary = state
        .move_dates_api
        .summary(d(2018, 7, 5), Pound(5000), Miles(500), d(2018, 8, 1))
        .unwrap();

    assert_eq!(summary.num_pack_days, 2);
    assert_eq!(summary.window.pack_days, vec![d(2018, 7, 2), d(2018, 7, 3)]);
    assert_eq!(summary.window.pickup_days, vec![d(2018, 7, 5)]);
    assert_eq!(summary.num_transit_days, 9);
    assert_eq!(summary.window.transit_days.first(), Some(&d(2018, 7, 6)));
    assert_eq!(summary.window.transit_days.last(), Some(&d(2018, 7, 14)));
    assert_eq!(summary.window.delivery_days, vec![d(2018, 7, 15)]);
    assert_eq!(summary.window.report_days, vec![d(2018, 8, 1)]);
}

#[test]
fn test_config_overrides_pack_days_and_holidays() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path).unwrap();
    let config = &state.config_manager;

    config
        .set_config_value(
            config_keys::PACK_DAYS_TABLE,
            r#"[{"min_weight_lbs":0,"days":3}]"#,
        )
        .unwrap();

    // 2018-06-13 周三
    let summary = state
        .move_dates_api
        .summary(d(2018, 6, 13), Pound(5000), Miles(500), d(2018, 7, 1))
        .unwrap();
    assert_eq!(
        summary.window.pack_days,
        vec![d(2018, 6, 8), d(2018, 6, 11), d(2018, 6, 12)]
    );

    config
        .set_config_value(config_keys::EXTRA_HOLIDAYS, r#"["2018-06-11"]"#)
        .unwrap();
    let summary = state
        .move_dates_api
        .summary(d(2018, 6, 13), Pound(5000), Miles(500), d(2018, 7, 1))
        .unwrap();
    assert_eq!(
        summary.window.pack_days,
        vec![d(2018, 6, 7), d(2018, 6, 8), d(2018, 6, 12)]
    );

    // 快照包含两项覆盖
    let snapshot = config.get_config_snapshot().unwrap();
    assert!(snapshot.contains(config_keys::PACK_DAYS_TABLE));
    assert!(snapshot.contains(config_keys::EXTRA_HOLIDAYS));
}

#[test]
fn test_invalid_inputs_are_rejected() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path).unwrap();

    let err = state
        .move_dates_api
        .summary(d(2018, 6, 13), Pound(0), Miles(500), d(2018, 7, 1))
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)), "实际: {:?}", err);

    let err = state
        .move_dates_api
        .summary(d(2018, 6, 13), Pound(5000), Miles(-1), d(2018, 7, 1))
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[test]
fn test_summary_for_shipment() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path).unwrap();

    let shipment = state
        .shipment_api
        .create_shipment(
            ShipmentBuilder::new("move-1")
                .requested_pickup(d(2018, 6, 13))
                .weight_estimate(5000)
                .distance(500)
                .build(june_2018()),
        )
        .unwrap();
    let summary = state
        .move_dates_api
        .summary_for_shipment(&shipment.shipment_id, d(2018, 7, 1))
        .unwrap();
    assert_eq!(summary.window.pack_days, vec![d(2018, 6, 11), d(2018, 6, 12)]);
    assert_eq!(summary.window.delivery_days, vec![d(2018, 6, 23)]);

    let incomplete = state
        .shipment_api
        .create_shipment(ShipmentBuilder::new("move-2").build(june_2018()))
        .unwrap();
    let err = state
        .move_dates_api
        .summary_for_shipment(&incomplete.shipment_id, d(2018, 7, 1))
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)), "实际: {:?}", err);
}
