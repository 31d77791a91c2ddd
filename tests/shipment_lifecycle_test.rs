// ==========================================
// 运单生命周期集成测试
// ==========================================
// 测试范围:
// 1. 提交分配 GBL 号（按 GBLOC + 财年递增）
// 2. 完整路径 DRAFT → COMPLETED
// 3. 非法转换、重复打包、乐观锁冲突
// 4. 承运商接受、未报价运单查询
// ==========================================

mod helpers;

use helpers::test_data_builder::ShipmentBuilder;
use hhg_move_engine::api::ApiError;
use hhg_move_engine::domain::offer::ShipmentOffer;
use hhg_move_engine::domain::types::{LineItemLocation, ShipmentStatus};
use hhg_move_engine::domain::units::Pound;
use hhg_move_engine::logging;
use std::collections::HashSet;
use test_helpers::{create_test_db, d, june_2018, october_2018, setup_env};

// ==========================================
// GBL 号分配
// ==========================================

#[test]
fn test_submit_assigns_sequential_gbl_numbers() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = setup_env(&db_path, june_2018);
    let api = &env.shipment_api;

    let first = api.create_shipment(ShipmentBuilder::new("move-1").build(june_2018())).unwrap();
    let second = api.create_shipment(ShipmentBuilder::new("move-2").build(june_2018())).unwrap();
    let other_office = api
        .create_shipment(ShipmentBuilder::new("move-3").gbloc("LKNQ").build(june_2018()))
        .unwrap();

    let first = api.submit(&first.shipment_id).unwrap();
    let second = api.submit(&second.shipment_id).unwrap();
    let other_office = api.submit(&other_office.shipment_id).unwrap();

    assert_eq!(first.status, ShipmentStatus::Submitted);
    assert_eq!(first.gbl_number.as_deref(), Some("GBO1180000001"));
    assert_eq!(second.gbl_number.as_deref(), Some("GBO1180000002"));
    // 不同 GBLOC 各自计数
    assert_eq!(other_office.gbl_number.as_deref(), Some("LKNQ180000001"));
    assert_eq!(first.book_date, Some(d(2018, 6, 1)));

    // 已落库
    let stored = api.get_shipment(&first.shipment_id).unwrap();
    assert_eq!(stored.gbl_number, first.gbl_number);
    assert_eq!(stored.revision, first.revision);
}

#[test]
fn test_submit_in_october_uses_next_fiscal_year() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = setup_env(&db_path, october_2018);
    let api = &env.shipment_api;

    let shipment = api.create_shipment(ShipmentBuilder::new("move-1").build(october_2018())).unwrap();
    let shipment = api.submit(&shipment.shipment_id).unwrap();

    assert_eq!(shipment.gbl_number.as_deref(), Some("GBO1190000001"));
}

#[test]
fn test_submit_without_gbloc_consumes_no_sequence() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = setup_env(&db_path, june_2018);
    let api = &env.shipment_api;

    let orphan = api
        .create_shipment(ShipmentBuilder::new("move-1").without_gbloc().build(june_2018()))
        .unwrap();
    let err = api.submit(&orphan.shipment_id).unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)), "实际: {:?}", err);

    // 运单未被修改
    let stored = api.get_shipment(&orphan.shipment_id).unwrap();
    assert_eq!(stored.status, ShipmentStatus::Draft);
    assert!(stored.gbl_number.is_none());
    assert_eq!(stored.revision, 0);

    let next = api.create_shipment(ShipmentBuilder::new("move-2").build(june_2018())).unwrap();
    let next = api.submit(&next.shipment_id).unwrap();
    assert_eq!(next.gbl_number.as_deref(), Some("GBO1180000001"));
}

#[test]
fn test_create_shipment_reports_all_violations() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = setup_env(&db_path, june_2018);

    let mut shipment = ShipmentBuilder::new("").build(june_2018());
    shipment.weight_estimate = Some(Pound(-3));
    shipment.estimated_pack_days = Some(0);

    match env.shipment_api.create_shipment(shipment) {
        Err(ApiError::ValidationError { violations, .. }) => {
            let fields: HashSet<&str> = violations.iter().map(|v| v.field.as_str()).collect();
            assert_eq!(
                fields,
                HashSet::from(["move_id", "weight_estimate", "estimated_pack_days"])
            );
        }
        other => panic!("应返回 ValidationError, 实际: {:?}", other),
    }
}

// ==========================================
// 完整生命周期
// ==========================================

#[test]
fn test_full_lifecycle_to_completed() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = setup_env(&db_path, june_2018);
    let api = &env.shipment_api;

    let shipment = api.create_shipment(ShipmentBuilder::new("move-1").build(june_2018())).unwrap();
    let id = shipment.shipment_id.clone();

    api.submit(&id).unwrap();
    api.award(&id).unwrap();

    let tsp = api.create_tsp("ABCD", "Acme Movers").unwrap();
    api.create_shipment_offer(&id, &tsp.tsp_id, "perf-1", false).unwrap();
    let (accepted, offer) = api.accept_shipment_for_tsp(&tsp.tsp_id, &id).unwrap();
    assert_eq!(accepted.status, ShipmentStatus::Accepted);
    assert_eq!(offer.accepted, Some(true));
    assert_eq!(api.fetch_offers(&id).unwrap()[0].accepted, Some(true));

    api.approve(&id).unwrap();
    let packed = api.pack(&id, d(2018, 6, 4)).unwrap();
    assert_eq!(packed.status, ShipmentStatus::Approved);
    assert_eq!(packed.actual_pack_date, Some(d(2018, 6, 4)));

    api.transport(&id, d(2018, 6, 5)).unwrap();
    api.deliver(&id, d(2018, 6, 12)).unwrap();
    let completed = api.complete(&id).unwrap();

    assert_eq!(completed.status, ShipmentStatus::Completed);
    assert_eq!(completed.actual_pack_date, Some(d(2018, 6, 4)));
    assert_eq!(completed.actual_pickup_date, Some(d(2018, 6, 5)));
    assert_eq!(completed.actual_delivery_date, Some(d(2018, 6, 12)));
    assert_eq!(completed.gbl_number.as_deref(), Some("GBO1180000001"));
    assert!(api.available_transitions(&id).unwrap().is_empty());
    assert_eq!(api.list_by_status(ShipmentStatus::Completed).unwrap().len(), 1);
    assert!(api.list_by_status(ShipmentStatus::Draft).unwrap().is_empty());
}

#[test]
fn test_out_of_order_transitions_are_rejected() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = setup_env(&db_path, june_2018);
    let api = &env.shipment_api;

    let shipment = api.create_shipment(ShipmentBuilder::new("move-1").build(june_2018())).unwrap();
    let id = shipment.shipment_id.clone();

    let err = api.approve(&id).unwrap_err();
    match err {
        ApiError::InvalidStateTransition { from, requested, .. } => {
            assert_eq!(from, "DRAFT");
            assert_eq!(requested, "APPROVE");
        }
        other => panic!("应返回 InvalidStateTransition, 实际: {:?}", other),
    }
    assert_eq!(api.available_transitions(&id).unwrap(), vec!["SUBMIT"]);
    assert_eq!(api.get_shipment(&id).unwrap().status, ShipmentStatus::Draft);
}

#[test]
fn test_pack_twice_is_rejected() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = setup_env(&db_path, june_2018);
    let api = &env.shipment_api;

    let shipment = api.create_shipment(ShipmentBuilder::new("move-1").build(june_2018())).unwrap();
    let id = shipment.shipment_id.clone();
    let tsp = api.create_tsp("ABCD", "Acme Movers").unwrap();

    api.submit(&id).unwrap();
    api.award(&id).unwrap();
    api.create_shipment_offer(&id, &tsp.tsp_id, "perf-1", false).unwrap();
    api.accept_shipment_for_tsp(&tsp.tsp_id, &id).unwrap();
    api.approve(&id).unwrap();
    api.pack(&id, d(2018, 6, 4)).unwrap();

    let err = api.pack(&id, d(2018, 6, 5)).unwrap_err();
    assert!(matches!(err, ApiError::InvalidStateTransition { .. }), "实际: {:?}", err);
    assert_eq!(api.get_shipment(&id).unwrap().actual_pack_date, Some(d(2018, 6, 4)));

    // 提货日早于打包日
    let err = api.transport(&id, d(2018, 6, 3)).unwrap_err();
    assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
}

// ==========================================
// 乐观锁
// ==========================================

#[test]
fn test_stale_update_is_concurrency_conflict() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = setup_env(&db_path, june_2018);
    let api = &env.shipment_api;

    let shipment = api.create_shipment(ShipmentBuilder::new("move-1").build(june_2018())).unwrap();
    let mut reader_a = api.get_shipment(&shipment.shipment_id).unwrap();
    let mut reader_b = api.get_shipment(&shipment.shipment_id).unwrap();

    reader_a.weight_estimate = Some(Pound(4000));
    let saved = api.update_shipment_details(&reader_a).unwrap();
    assert_eq!(saved.revision, 1);

    reader_b.weight_estimate = Some(Pound(9000));
    let err = api.update_shipment_details(&reader_b).unwrap_err();
    assert!(matches!(err, ApiError::ConcurrencyConflict(_)), "实际: {:?}", err);
    assert!(err.is_retryable());

    let stored = api.get_shipment(&shipment.shipment_id).unwrap();
    assert_eq!(stored.weight_estimate, Some(Pound(4000)));
}

#[test]
fn test_update_details_cannot_change_status() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = setup_env(&db_path, june_2018);
    let api = &env.shipment_api;

    let shipment = api.create_shipment(ShipmentBuilder::new("move-1").build(june_2018())).unwrap();
    let mut tampered = shipment.clone();
    tampered.status = ShipmentStatus::Completed;
    tampered.gbl_number = Some("FAKE180000001".to_string());
    tampered.market = Some("dHHG".to_string());

    let saved = api.update_shipment_details(&tampered).unwrap();
    assert_eq!(saved.status, ShipmentStatus::Draft);
    assert!(saved.gbl_number.is_none());
    assert_eq!(saved.market.as_deref(), Some("dHHG"));
}

#[test]
fn test_save_with_line_items_cannot_change_status() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = setup_env(&db_path, june_2018);
    let api = &env.shipment_api;

    let shipment = api.create_shipment(ShipmentBuilder::new("move-1").build(june_2018())).unwrap();
    let mut forged = shipment.clone();
    forged.status = ShipmentStatus::Completed;
    forged.book_date = Some(d(2018, 5, 1));
    forged.actual_delivery_date = Some(d(2018, 6, 20));
    forged.market = Some("dHHG".to_string());
    let items = vec![api
        .build_line_item(&shipment.shipment_id, "105B", 1, 0, LineItemLocation::Origin, None)
        .unwrap()];

    let saved = api.save_shipment_and_line_items(&forged, &items).unwrap();
    assert_eq!(saved.status, ShipmentStatus::Draft);
    assert!(saved.book_date.is_none());
    assert!(saved.actual_delivery_date.is_none());

    let stored = api.get_shipment(&shipment.shipment_id).unwrap();
    assert_eq!(stored.status, ShipmentStatus::Draft);
    assert!(stored.gbl_number.is_none());
    assert!(stored.actual_delivery_date.is_none());
    assert_eq!(stored.market.as_deref(), Some("dHHG"));
    assert_eq!(env.line_item_repo.find_by_shipment(&shipment.shipment_id).unwrap().len(), 1);
}

#[test]
fn test_gbloc_is_fixed_after_submit() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = setup_env(&db_path, june_2018);
    let api = &env.shipment_api;

    let shipment = api.create_shipment(ShipmentBuilder::new("move-1").build(june_2018())).unwrap();

    // 提交前可以改
    let mut draft = shipment.clone();
    draft.source_gbloc = Some("LKNQ".to_string());
    api.update_shipment_details(&draft).unwrap();

    let submitted = api.submit(&shipment.shipment_id).unwrap();
    assert_eq!(submitted.gbl_number.as_deref(), Some("LKNQ180000001"));

    let mut edited = submitted.clone();
    edited.source_gbloc = Some("GBO1".to_string());
    let saved = api.update_shipment_details(&edited).unwrap();
    assert_eq!(saved.source_gbloc.as_deref(), Some("LKNQ"));

    let mut edited = saved.clone();
    edited.source_gbloc = Some("GBO1".to_string());
    let saved = api.save_shipment_and_line_items(&edited, &[]).unwrap();
    assert_eq!(saved.source_gbloc.as_deref(), Some("LKNQ"));
    assert_eq!(
        api.get_shipment(&shipment.shipment_id).unwrap().source_gbloc.as_deref(),
        Some("LKNQ")
    );
}

// ==========================================
// 报价与承运商接受
// ==========================================

#[test]
fn test_accept_requires_offer_and_awarded_status() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = setup_env(&db_path, june_2018);
    let api = &env.shipment_api;

    let shipment = api.create_shipment(ShipmentBuilder::new("move-1").build(june_2018())).unwrap();
    let id = shipment.shipment_id.clone();
    api.submit(&id).unwrap();
    let tsp = api.create_tsp("ABCD", "Acme Movers").unwrap();

    // 无报价
    let err = api.accept_shipment_for_tsp(&tsp.tsp_id, &id).unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)), "实际: {:?}", err);

    // 有报价但运单尚未授予
    api.create_shipment_offer(&id, &tsp.tsp_id, "perf-1", false).unwrap();
    let err = api.accept_shipment_for_tsp(&tsp.tsp_id, &id).unwrap_err();
    assert!(matches!(err, ApiError::InvalidStateTransition { .. }), "实际: {:?}", err);
    assert_eq!(api.fetch_offers(&id).unwrap()[0].accepted, None);

    // 未登记的承运商不能报价
    let err = api.create_shipment_offer(&id, "no-such-tsp", "perf-2", false).unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[test]
fn test_fetch_unoffered_shipments_ignores_rejected_offers() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let env = setup_env(&db_path, june_2018);
    let api = &env.shipment_api;
    let tsp = api.create_tsp("ABCD", "Acme Movers").unwrap();

    let submit = |move_id: &str| {
        let s = api.create_shipment(ShipmentBuilder::new(move_id).build(june_2018())).unwrap();
        api.submit(&s.shipment_id).unwrap()
    };

    let no_offer = submit("move-no-offer");
    let pending = submit("move-pending");
    let rejected = submit("move-rejected");
    api.create_shipment(ShipmentBuilder::new("move-draft").build(june_2018())).unwrap();

    api.create_shipment_offer(&pending.shipment_id, &tsp.tsp_id, "perf-1", false).unwrap();

    let mut refused = ShipmentOffer::new(&rejected.shipment_id, &tsp.tsp_id, "perf-1", false);
    refused.accepted = Some(false);
    refused.rejection_reason = Some("capacity".to_string());
    env.offer_repo.insert_offer(&refused).unwrap();

    let ids: HashSet<String> = api
        .fetch_unoffered_shipments()
        .unwrap()
        .into_iter()
        .map(|s| s.shipment_id)
        .collect();
    assert_eq!(
        ids,
        HashSet::from([no_offer.shipment_id.clone(), rejected.shipment_id.clone()])
    );
}
