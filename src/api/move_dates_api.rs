// ==========================================
// 家庭物品搬迁核心 - 搬迁日期 API
// ==========================================
// 职责: 按当前配置（天数表 + 日历）计算搬迁日期窗口
// 说明: 结果为派生数据，不落库
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::domain::move_dates::MoveDateWindow;
use crate::domain::units::{Miles, Pound};
use crate::engine::move_dates::MoveDateScheduler;
use crate::repository::shipment_repo::ShipmentRepository;

/// 日期窗口 + 天数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveDatesSummary {
    pub num_pack_days: i64,
    pub num_transit_days: i64,
    #[serde(flatten)]
    pub window: MoveDateWindow,
}

// ==========================================
// MoveDatesApi - 搬迁日期 API
// ==========================================
pub struct MoveDatesApi {
    config_manager: Arc<ConfigManager>,
    shipment_repo: Arc<ShipmentRepository>,
}

impl MoveDatesApi {
    pub fn new(config_manager: Arc<ConfigManager>, shipment_repo: Arc<ShipmentRepository>) -> Self {
        Self {
            config_manager,
            shipment_repo,
        }
    }

    fn scheduler(&self) -> ApiResult<MoveDateScheduler> {
        self.config_manager
            .build_move_date_scheduler()
            .map_err(|e| ApiError::InternalError(format!("排期配置读取失败: {}", e)))
    }

    /// 计算搬迁日期窗口
    ///
    /// # 参数
    /// - `target_move_date`: 目标搬迁日（提货日）
    /// - `entitlement_weight`: 授权重量（磅）
    /// - `transit_distance`: 运输距离（英里）
    /// - `report_by_date`: 报到日
    ///
    /// # 错误
    /// - `ApiError::InvalidInput`: 重量/距离非正，或日历内找不到足够打包日
    pub fn summary(
        &self,
        target_move_date: NaiveDate,
        entitlement_weight: Pound,
        transit_distance: Miles,
        report_by_date: NaiveDate,
    ) -> ApiResult<MoveDatesSummary> {
        let scheduler = self.scheduler()?;
        let window = scheduler.calculate(
            target_move_date,
            entitlement_weight,
            transit_distance,
            report_by_date,
        )?;

        Ok(MoveDatesSummary {
            num_pack_days: window.pack_days.len() as i64,
            num_transit_days: window.transit_days.len() as i64,
            window,
        })
    }

    /// 以运单的期望提货日、重量估算与运输距离计算
    pub fn summary_for_shipment(
        &self,
        shipment_id: &str,
        report_by_date: NaiveDate,
    ) -> ApiResult<MoveDatesSummary> {
        let shipment = self.shipment_repo.fetch(shipment_id)?;
        let missing = |attribute: &str| {
            ApiError::BusinessRuleViolation(format!("运单{}缺少属性: {}", shipment_id, attribute))
        };

        let target = shipment
            .requested_pickup_date
            .ok_or_else(|| missing("requested_pickup_date"))?;
        let weight = shipment
            .weight_estimate
            .ok_or_else(|| missing("weight_estimate"))?;
        let distance = shipment
            .transit_distance
            .ok_or_else(|| missing("transit_distance"))?;

        self.summary(target, weight, distance, report_by_date)
    }
}
