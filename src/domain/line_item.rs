// ==========================================
// 家庭物品搬迁核心 - 附加费用行领域模型
// ==========================================
// 红线: 费用行按 shipment_id 弱引用运单，不嵌入运单
// 红线: amount_cents 只在计价成功后写入
// ==========================================

use crate::domain::types::{LineItemLocation, LineItemStatus};
use crate::domain::units::{BaseQuantity, Cents};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentLineItem {
    pub line_item_id: String,
    pub shipment_id: String,          // 所属运单
    pub code: String,                 // 运价项目代码 (如 105B)
    pub quantity1: BaseQuantity,      // 基础数量1（含义随代码而定）
    pub quantity2: BaseQuantity,      // 基础数量2
    pub location: LineItemLocation,   // 起运地 / 目的地
    pub status: LineItemStatus,
    pub notes: Option<String>,
    pub amount_cents: Option<Cents>,  // 计价结果
    pub submitted_date: NaiveDateTime,
    pub approved_date: Option<NaiveDateTime>,
}

impl ShipmentLineItem {
    /// 创建新的费用行（已提交状态）
    pub fn new(
        shipment_id: &str,
        code: &str,
        quantity1: BaseQuantity,
        quantity2: BaseQuantity,
        location: LineItemLocation,
        notes: Option<String>,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            line_item_id: Uuid::new_v4().to_string(),
            shipment_id: shipment_id.to_string(),
            code: code.trim().to_uppercase(),
            quantity1,
            quantity2,
            location,
            status: LineItemStatus::Submitted,
            notes,
            amount_cents: None,
            submitted_date: now,
            approved_date: None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.status == LineItemStatus::Rejected
    }
}
