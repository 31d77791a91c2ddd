// ==========================================
// 家庭物品搬迁核心 - API 层
// ==========================================
// 职责: 编排 读取 → 引擎 → 保存，错误统一转换为 ApiError
// ==========================================

pub mod error;
pub mod move_dates_api;
pub mod rate_api;
pub mod shipment_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use move_dates_api::{MoveDatesApi, MoveDatesSummary};
pub use rate_api::RateApi;
pub use shipment_api::{local_now, Clock, ShipmentApi};
