// ==========================================
// 家庭物品搬迁核心 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享连接和 API 实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{MoveDatesApi, RateApi, ShipmentApi};
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::gbl::GblNumberAssigner;
use crate::engine::rate::RateEngine;
use crate::engine::shipment_state::ShipmentStateMachine;
use crate::importer::TariffImporter;
use crate::repository::{
    GblSequenceRepository, ShipmentLineItemRepository, ShipmentOfferRepository,
    ShipmentRepository, TariffRepository,
};

/// 应用状态
///
/// 所有仓储共享同一连接；GBL 序号仓储使用独立连接，
/// 使序号递增不与运单读写争用同一把互斥锁
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    pub shipment_api: Arc<ShipmentApi>,
    pub move_dates_api: Arc<MoveDatesApi>,
    pub rate_api: Arc<RateApi>,
    pub tariff_importer: Arc<TariffImporter>,
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例（幂等建表）
    ///
    /// # 返回
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // Repository 层
        // ==========================================
        let shipment_repo = Arc::new(ShipmentRepository::from_connection(conn.clone()));
        let line_item_repo = Arc::new(ShipmentLineItemRepository::from_connection(conn.clone()));
        let offer_repo = Arc::new(ShipmentOfferRepository::from_connection(conn.clone()));
        let tariff_repo = Arc::new(TariffRepository::from_connection(conn.clone()));
        let gbl_repo = Arc::new(
            GblSequenceRepository::new(&db_path)
                .map_err(|e| format!("无法创建GblSequenceRepository: {}", e))?,
        );

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // Engine 层
        // ==========================================
        let state_machine = Arc::new(ShipmentStateMachine::new(Arc::new(GblNumberAssigner::new(
            gbl_repo,
        ))));
        let rate_engine = Arc::new(RateEngine::new(tariff_repo.clone()));

        // ==========================================
        // API 层
        // ==========================================
        let shipment_api = Arc::new(ShipmentApi::new(
            shipment_repo.clone(),
            line_item_repo.clone(),
            offer_repo,
            state_machine,
        ));
        let move_dates_api = Arc::new(MoveDatesApi::new(config_manager.clone(), shipment_repo.clone()));
        let rate_api = Arc::new(RateApi::new(shipment_repo, line_item_repo, rate_engine));
        let tariff_importer = Arc::new(TariffImporter::new(tariff_repo));

        tracing::info!("AppState初始化完成");
        Ok(Self {
            db_path,
            shipment_api,
            move_dates_api,
            rate_api,
            tariff_importer,
            config_manager,
        })
    }
}
