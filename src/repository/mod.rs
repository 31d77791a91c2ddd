// ==========================================
// 家庭物品搬迁核心 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod gbl_repo;
pub mod line_item_repo;
pub mod offer_repo;
pub mod shipment_repo;
pub mod tariff_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use gbl_repo::GblSequenceRepository;
pub use line_item_repo::ShipmentLineItemRepository;
pub use offer_repo::ShipmentOfferRepository;
pub use shipment_repo::ShipmentRepository;
pub use tariff_repo::TariffRepository;
