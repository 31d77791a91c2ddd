// ==========================================
// 家庭物品搬迁核心 - 核心库
// ==========================================
// 组成: 运单生命周期状态机 / 搬迁日期排期 / 运价计算
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 运价表
pub mod importer;

// 配置层 - 排期规则与日历
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{LineItemLocation, LineItemStatus, ShipmentStatus};

// 领域实体
pub use domain::{
    Address, MoveDateWindow, Shipment, ShipmentLineItem, ShipmentOffer, TariffRateRecord,
    TransportationServiceProvider,
};

// 引擎
pub use engine::{
    GblNumberAssigner, MoveDateScheduler, RateEngine, ShipmentStateMachine, ShipmentTransition,
    WorkCalendar,
};

// API
pub use api::{MoveDatesApi, RateApi, ShipmentApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "家庭物品搬迁核心";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
