// ==========================================
// 家庭物品搬迁核心 - 计价 API
// ==========================================
// 职责: 费用行最终计价并回写金额
// 红线: 仅 APPROVED 及之后的运单可计价；已驳回费用行不计价
// 红线: 整单计价要么全部写入，要么一条不写
// ==========================================

use std::sync::Arc;

use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::line_item::ShipmentLineItem;
use crate::domain::shipment::Shipment;
use crate::domain::units::Cents;
use crate::engine::rate::RateEngine;
use crate::repository::line_item_repo::ShipmentLineItemRepository;
use crate::repository::shipment_repo::ShipmentRepository;

// ==========================================
// RateApi - 计价 API
// ==========================================
pub struct RateApi {
    shipment_repo: Arc<ShipmentRepository>,
    line_item_repo: Arc<ShipmentLineItemRepository>,
    rate_engine: Arc<RateEngine>,
}

impl RateApi {
    pub fn new(
        shipment_repo: Arc<ShipmentRepository>,
        line_item_repo: Arc<ShipmentLineItemRepository>,
        rate_engine: Arc<RateEngine>,
    ) -> Self {
        Self {
            shipment_repo,
            line_item_repo,
            rate_engine,
        }
    }

    /// 单条费用行计价并保存金额
    ///
    /// # 错误
    /// - `ApiError::NotFound`: 费用行或运单不存在
    /// - `ApiError::BusinessRuleViolation`: 运单未批准、费用行已驳回、运单缺少计价属性
    /// - `ApiError::PricingError`: 无适用运价 / 运价不唯一 / 未登记的项目代码
    #[instrument(skip(self))]
    pub fn price_line_item(&self, line_item_id: &str) -> ApiResult<ShipmentLineItem> {
        let mut item = self
            .line_item_repo
            .find_by_id(line_item_id)?
            .ok_or_else(|| ApiError::NotFound(format!("ShipmentLineItem(id={})不存在", line_item_id)))?;
        if item.is_rejected() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "费用行{}已驳回，不能计价",
                line_item_id
            )));
        }

        let shipment = self.approved_shipment(&item.shipment_id)?;
        let amount = self.rate_engine.compute_line_item(&item, &shipment)?;
        self.line_item_repo.update_amount(&item.line_item_id, amount)?;

        item.amount_cents = Some(amount);
        info!(code = %item.code, amount = %amount, "费用行已计价");
        Ok(item)
    }

    /// 整单计价（跳过已驳回费用行），任一失败则不写入任何金额
    ///
    /// # 返回
    /// - Ok(Vec<ShipmentLineItem>): 已计价的费用行
    #[instrument(skip(self))]
    pub fn price_shipment(&self, shipment_id: &str) -> ApiResult<Vec<ShipmentLineItem>> {
        let shipment = self.approved_shipment(shipment_id)?;
        let mut items: Vec<ShipmentLineItem> = self
            .line_item_repo
            .find_by_shipment(shipment_id)?
            .into_iter()
            .filter(|i| !i.is_rejected())
            .collect();

        let amounts = self.rate_engine.compute_line_items(&items, &shipment)?;
        self.line_item_repo.update_amounts(&amounts)?;

        for (item, (_, amount)) in items.iter_mut().zip(amounts.iter()) {
            item.amount_cents = Some(*amount);
        }
        let total: Cents = amounts.iter().map(|(_, amount)| *amount).sum();
        info!(count = items.len(), total = %total, "整单计价完成");
        Ok(items)
    }

    fn approved_shipment(&self, shipment_id: &str) -> ApiResult<Shipment> {
        let shipment = self.shipment_repo.fetch(shipment_id)?;
        if !shipment.status.is_approved_or_later() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "运单{}状态为{}，批准后才能计价",
                shipment_id, shipment.status
            )));
        }
        Ok(shipment)
    }
}
