// ==========================================
// 家庭物品搬迁核心 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、计量单位
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod line_item;
pub mod move_dates;
pub mod offer;
pub mod shipment;
pub mod tariff;
pub mod types;
pub mod units;

// 重导出核心类型
pub use line_item::ShipmentLineItem;
pub use move_dates::MoveDateWindow;
pub use offer::{ShipmentOffer, TransportationServiceProvider};
pub use shipment::{Address, FieldViolation, Shipment};
pub use tariff::{
    EffectiveWindow, ItemRate, LinehaulRate, ServiceAreaRate, TariffKey, TariffRateRecord,
    Zip3Record,
};
pub use types::{LineItemLocation, LineItemStatus, ShipmentStatus};
pub use units::{BaseQuantity, Cents, Miles, Pound, BASE_QUANTITY_SCALE};
