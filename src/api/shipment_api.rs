// ==========================================
// 家庭物品搬迁核心 - 运单 API
// ==========================================
// 职责: 运单创建、状态流转、承运商接受、报价与费用行管理
// 流程: 读取 → 状态机/校验 → 乐观锁保存
// 红线: 状态机失败时不写库；保存冲突原样返回调用方（不重试）
// ==========================================

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::line_item::ShipmentLineItem;
use crate::domain::offer::{ShipmentOffer, TransportationServiceProvider};
use crate::domain::shipment::Shipment;
use crate::domain::types::{LineItemLocation, ShipmentStatus};
use crate::domain::units::BaseQuantity;
use crate::engine::shipment_state::{ShipmentStateMachine, ShipmentTransition};
use crate::repository::line_item_repo::ShipmentLineItemRepository;
use crate::repository::offer_repo::ShipmentOfferRepository;
use crate::repository::shipment_repo::ShipmentRepository;

/// 时间来源（测试中可替换）
pub type Clock = fn() -> NaiveDateTime;

pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

// ==========================================
// ShipmentApi - 运单 API
// ==========================================
pub struct ShipmentApi {
    shipment_repo: Arc<ShipmentRepository>,
    line_item_repo: Arc<ShipmentLineItemRepository>,
    offer_repo: Arc<ShipmentOfferRepository>,
    state_machine: Arc<ShipmentStateMachine>,
    clock: Clock,
}

impl ShipmentApi {
    pub fn new(
        shipment_repo: Arc<ShipmentRepository>,
        line_item_repo: Arc<ShipmentLineItemRepository>,
        offer_repo: Arc<ShipmentOfferRepository>,
        state_machine: Arc<ShipmentStateMachine>,
    ) -> Self {
        Self {
            shipment_repo,
            line_item_repo,
            offer_repo,
            state_machine,
            clock: local_now,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    // ==========================================
    // 运单
    // ==========================================

    /// 创建草稿运单
    ///
    /// # 错误
    /// - `ApiError::ValidationError`: 字段校验失败（返回全部违规项）
    /// - `ApiError::InvalidInput`: 运单不是 DRAFT 或已带 GBL 号
    pub fn create_shipment(&self, mut shipment: Shipment) -> ApiResult<Shipment> {
        if !shipment.is_draft() || shipment.gbl_number.is_some() {
            return Err(ApiError::InvalidInput(
                "新运单必须为 DRAFT 且不带 GBL 号".to_string(),
            ));
        }
        let violations = shipment.validate();
        if !violations.is_empty() {
            return Err(ApiError::validation(violations));
        }

        let now = (self.clock)();
        shipment.created_at = now;
        shipment.updated_at = now;
        shipment.revision = 0;
        self.shipment_repo.insert(&shipment)?;

        info!(shipment_id = %shipment.shipment_id, move_id = %shipment.move_id, "运单已创建");
        Ok(shipment)
    }

    pub fn get_shipment(&self, shipment_id: &str) -> ApiResult<Shipment> {
        Ok(self.shipment_repo.fetch(shipment_id)?)
    }

    /// 更新运单非状态字段（重量、距离、地址、估算等）
    ///
    /// 状态、GBL 号与实际日期以库内为准，调用方传入的值被忽略；
    /// 已提交的运单 source_gbloc 也不可再改
    pub fn update_shipment_details(&self, shipment: &Shipment) -> ApiResult<Shipment> {
        let current = self.shipment_repo.fetch(&shipment.shipment_id)?;
        let violations = shipment.validate();
        if !violations.is_empty() {
            return Err(ApiError::validation(violations));
        }

        let mut updated = pin_managed_fields(shipment, current);
        updated.updated_at = (self.clock)();

        updated.revision = self.shipment_repo.update(&updated)?;
        Ok(updated)
    }

    // ==========================================
    // 状态流转
    // ==========================================

    /// 提交: DRAFT → SUBMITTED，分配 GBL 号
    pub fn submit(&self, shipment_id: &str) -> ApiResult<Shipment> {
        self.run_transition(shipment_id, ShipmentTransition::Submit)
    }

    /// 授予承运商: SUBMITTED → AWARDED
    pub fn award(&self, shipment_id: &str) -> ApiResult<Shipment> {
        self.run_transition(shipment_id, ShipmentTransition::Award)
    }

    /// 批准: ACCEPTED → APPROVED
    pub fn approve(&self, shipment_id: &str) -> ApiResult<Shipment> {
        self.run_transition(shipment_id, ShipmentTransition::Approve)
    }

    /// 打包: 停留在 APPROVED，记录实际打包日
    pub fn pack(&self, shipment_id: &str, pack_date: NaiveDate) -> ApiResult<Shipment> {
        self.run_transition(shipment_id, ShipmentTransition::Pack(pack_date))
    }

    /// 提货运输: APPROVED → IN_TRANSIT
    pub fn transport(&self, shipment_id: &str, pickup_date: NaiveDate) -> ApiResult<Shipment> {
        self.run_transition(shipment_id, ShipmentTransition::Transport(pickup_date))
    }

    /// 送达: IN_TRANSIT → DELIVERED
    pub fn deliver(&self, shipment_id: &str, delivery_date: NaiveDate) -> ApiResult<Shipment> {
        self.run_transition(shipment_id, ShipmentTransition::Deliver(delivery_date))
    }

    /// 完成: DELIVERED → COMPLETED
    pub fn complete(&self, shipment_id: &str) -> ApiResult<Shipment> {
        self.run_transition(shipment_id, ShipmentTransition::Complete)
    }

    #[instrument(skip(self, transition), fields(transition = %transition))]
    fn run_transition(&self, shipment_id: &str, transition: ShipmentTransition) -> ApiResult<Shipment> {
        let mut shipment = self.shipment_repo.fetch(shipment_id)?;
        self.state_machine
            .apply(&mut shipment, transition, (self.clock)())?;

        shipment.revision = self.shipment_repo.update(&shipment).map_err(|e| {
            warn!(error = %e, "运单保存失败");
            ApiError::from(e)
        })?;
        Ok(shipment)
    }

    // ==========================================
    // 承运商与报价
    // ==========================================

    pub fn create_tsp(&self, scac: &str, name: &str) -> ApiResult<TransportationServiceProvider> {
        let tsp = TransportationServiceProvider::new(scac.trim(), name.trim());
        let violations = tsp.validate();
        if !violations.is_empty() {
            return Err(ApiError::validation(violations));
        }
        self.offer_repo.insert_tsp(&tsp)?;
        Ok(tsp)
    }

    /// 为运单创建报价（待定状态）
    pub fn create_shipment_offer(
        &self,
        shipment_id: &str,
        tsp_id: &str,
        tsp_performance_id: &str,
        administrative_shipment: bool,
    ) -> ApiResult<ShipmentOffer> {
        self.shipment_repo.fetch(shipment_id)?;
        if self.offer_repo.find_tsp(tsp_id)?.is_none() {
            return Err(ApiError::NotFound(format!(
                "TransportationServiceProvider(id={})不存在",
                tsp_id
            )));
        }

        let offer = ShipmentOffer::new(shipment_id, tsp_id, tsp_performance_id, administrative_shipment);
        self.offer_repo.insert_offer(&offer)?;
        Ok(offer)
    }

    /// 承运商接受运单
    ///
    /// 运单须为 AWARDED 且该承运商持有报价；运单 Accept 与报价 accepted=true 同一事务保存
    ///
    /// # 返回
    /// - Ok((Shipment, ShipmentOffer)): 更新后的运单与报价
    #[instrument(skip(self))]
    pub fn accept_shipment_for_tsp(
        &self,
        tsp_id: &str,
        shipment_id: &str,
    ) -> ApiResult<(Shipment, ShipmentOffer)> {
        let mut shipment = self.shipment_repo.fetch(shipment_id)?;
        let mut offer = self
            .offer_repo
            .find_for_tsp(shipment_id, tsp_id)?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "ShipmentOffer(shipment_id={}, tsp_id={})不存在",
                    shipment_id, tsp_id
                ))
            })?;

        self.state_machine
            .apply(&mut shipment, ShipmentTransition::Accept, (self.clock)())?;
        offer.accepted = Some(true);
        offer.rejection_reason = None;

        shipment.revision = self.shipment_repo.save_shipment_with_offer(&shipment, &offer)?;
        info!(offer_id = %offer.offer_id, "承运商已接受运单");
        Ok((shipment, offer))
    }

    /// 未报价运单：SUBMITTED 且没有待定/已接受的报价
    pub fn fetch_unoffered_shipments(&self) -> ApiResult<Vec<Shipment>> {
        Ok(self.shipment_repo.fetch_unoffered_shipments()?)
    }

    pub fn fetch_offers(&self, shipment_id: &str) -> ApiResult<Vec<ShipmentOffer>> {
        Ok(self.offer_repo.find_by_shipment(shipment_id)?)
    }

    // ==========================================
    // 费用行
    // ==========================================

    /// 创建费用行
    ///
    /// # 参数
    /// - `quantity1` / `quantity2`: 计费单位整数，存储时换算为基础数量
    pub fn create_shipment_line_item(
        &self,
        shipment_id: &str,
        code: &str,
        quantity1: i64,
        quantity2: i64,
        location: LineItemLocation,
        notes: Option<String>,
    ) -> ApiResult<ShipmentLineItem> {
        let item = self.build_line_item(shipment_id, code, quantity1, quantity2, location, notes)?;
        self.shipment_repo.fetch(shipment_id)?;
        self.line_item_repo.insert(&item)?;
        Ok(item)
    }

    /// 构造费用行（不落库），供 save_shipment_and_line_items 批量使用
    pub fn build_line_item(
        &self,
        shipment_id: &str,
        code: &str,
        quantity1: i64,
        quantity2: i64,
        location: LineItemLocation,
        notes: Option<String>,
    ) -> ApiResult<ShipmentLineItem> {
        if code.trim().is_empty() {
            return Err(ApiError::InvalidInput("项目代码不能为空".to_string()));
        }
        if quantity1 < 0 || quantity2 < 0 {
            return Err(ApiError::InvalidInput(format!(
                "数量不能为负: quantity1={}, quantity2={}",
                quantity1, quantity2
            )));
        }
        Ok(ShipmentLineItem::new(
            shipment_id,
            code,
            BaseQuantity::from_int(quantity1),
            BaseQuantity::from_int(quantity2),
            location,
            notes,
            (self.clock)(),
        ))
    }

    /// 同一事务保存运单与新费用行
    ///
    /// 与 update_shipment_details 相同：状态机管理的字段以库内为准
    pub fn save_shipment_and_line_items(
        &self,
        shipment: &Shipment,
        items: &[ShipmentLineItem],
    ) -> ApiResult<Shipment> {
        let violations = shipment.validate();
        if !violations.is_empty() {
            return Err(ApiError::validation(violations));
        }
        if let Some(stray) = items.iter().find(|i| i.shipment_id != shipment.shipment_id) {
            return Err(ApiError::InvalidInput(format!(
                "费用行{}不属于运单{}",
                stray.line_item_id, shipment.shipment_id
            )));
        }

        let current = self.shipment_repo.fetch(&shipment.shipment_id)?;
        let mut saved = pin_managed_fields(shipment, current);
        saved.updated_at = (self.clock)();
        saved.revision = self
            .line_item_repo
            .save_shipment_and_line_items(&saved, items)?;
        Ok(saved)
    }

    pub fn fetch_line_items_by_code(
        &self,
        shipment_id: &str,
        code: &str,
    ) -> ApiResult<Vec<ShipmentLineItem>> {
        Ok(self.line_item_repo.find_by_code(shipment_id, code)?)
    }

    /// 当前状态下可执行的转换（供调用方展示）
    pub fn available_transitions(&self, shipment_id: &str) -> ApiResult<Vec<&'static str>> {
        let shipment = self.shipment_repo.fetch(shipment_id)?;
        Ok(crate::engine::shipment_state::available_transitions(shipment.status))
    }

    /// 按状态列出运单
    pub fn list_by_status(&self, status: ShipmentStatus) -> ApiResult<Vec<Shipment>> {
        Ok(self.shipment_repo.find_by_status(status)?)
    }
}

/// 以库内记录覆盖只能由状态机修改的字段
fn pin_managed_fields(shipment: &Shipment, current: Shipment) -> Shipment {
    let mut pinned = shipment.clone();
    if current.status.is_submitted_or_later() {
        pinned.source_gbloc = current.source_gbloc;
    }
    pinned.status = current.status;
    pinned.gbl_number = current.gbl_number;
    pinned.book_date = current.book_date;
    pinned.actual_pack_date = current.actual_pack_date;
    pinned.actual_pickup_date = current.actual_pickup_date;
    pinned.actual_delivery_date = current.actual_delivery_date;
    pinned.created_at = current.created_at;
    pinned
}
