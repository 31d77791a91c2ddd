// ==========================================
// 家庭物品搬迁核心 - 引擎层错误类型
// ==========================================
// 红线: 所有错误原样返回调用方，引擎内部不重试
// 红线: 任何失败都不修改运单与费用行
// ==========================================

use crate::domain::tariff::TariffKey;
use crate::domain::types::ShipmentStatus;
use crate::repository::error::RepositoryError;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 状态机 =====
    #[error("无效的状态转换: shipment_id={shipment_id}, 当前状态={from}, 请求操作={requested}, 原因={reason}")]
    InvalidTransition {
        shipment_id: String,
        from: ShipmentStatus,
        requested: String,
        reason: String,
    },

    // ===== 排期 =====
    #[error("无效输入: {0}")]
    InvalidInput(String),

    // ===== 计价 =====
    #[error("无适用运价: key={key}, date={as_of}")]
    NoApplicableRate { key: TariffKey, as_of: NaiveDate },

    #[error("运价不唯一: key={key}, date={as_of}, 匹配 {count} 条")]
    AmbiguousRate {
        key: TariffKey,
        as_of: NaiveDate,
        count: usize,
    },

    #[error("运单缺少计价所需属性: shipment_id={shipment_id}, attribute={attribute}")]
    MissingShipmentAttribute {
        shipment_id: String,
        attribute: String,
    },

    #[error("项目代码未登记计价策略: {0}")]
    UnpricedItemCode(String),

    #[error("金额超出可表示范围: {0}")]
    AmountOverflow(String),

    #[error("运价数据重叠: {0}")]
    OverlappingTariff(String),

    // ===== GBL =====
    #[error("GBL 序号已用尽: gbloc={gbloc}, fiscal_year={fiscal_year}, sequence={sequence}")]
    GblSequenceExhausted {
        gbloc: String,
        fiscal_year: i32,
        sequence: i64,
    },

    // ===== 并发 =====
    #[error("并发冲突: {0}")]
    ConcurrencyConflict(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type EngineResult<T> = Result<T, EngineError>;
