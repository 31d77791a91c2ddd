// ==========================================
// 家庭物品搬迁核心 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎，不拼 SQL
// 红线: Engine 不拼 SQL，仓储能力通过 trait 注入
// 红线: 同一输入必得同一输出（时间由调用方传入）
// ==========================================

pub mod calendar;
pub mod error;
pub mod gbl;
pub mod move_dates;
pub mod rate;
pub mod shipment_state;

// 重导出核心引擎
pub use calendar::WorkCalendar;
pub use error::{EngineError, EngineResult};
pub use gbl::{fiscal_year, format_gbl_number, GblNumberAssigner, GblSequencer};
pub use move_dates::{
    MoveDateScheduler, PackDaysEntry, PackDaysTable, TransitDaysEntry, TransitDaysTable,
};
pub use rate::{RateEngine, TariffSource, TariffTable};
pub use shipment_state::{available_transitions, ShipmentStateMachine, ShipmentTransition};
