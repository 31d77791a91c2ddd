// ==========================================
// 家庭物品搬迁核心 - 运价表领域模型
// ==========================================
// 职责: 定义按日期生效的运价记录
// 红线: 生效区间为半开区间 [lower, upper)
// 红线: 同一键在任一日期至多一条记录生效
// 约定: 重量区间、距离区间同样为半开区间 [lower, upper)
// ==========================================

use crate::domain::units::{Cents, Miles, Pound};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// EffectiveWindow - 生效区间
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EffectiveWindow {
    pub lower: NaiveDate, // 含
    pub upper: NaiveDate, // 不含
}

impl EffectiveWindow {
    pub fn new(lower: NaiveDate, upper: NaiveDate) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.lower <= date && date < self.upper
    }

    pub fn overlaps(&self, other: &EffectiveWindow) -> bool {
        self.lower < other.upper && other.lower < self.upper
    }

    pub fn is_empty(&self) -> bool {
        self.lower >= self.upper
    }
}

impl fmt::Display for EffectiveWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.lower, self.upper)
    }
}

/// 半开区间成员判断
fn in_band(value: i64, lower: i64, upper: i64) -> bool {
    lower <= value && value < upper
}

// ==========================================
// Zip3Record - 邮编前三位 → 服务区
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zip3Record {
    pub zip3: String,
    pub basepoint_city: String,
    pub state: String,
    pub service_area: String,
    pub rate_area: String,
    pub region: String,
}

// ==========================================
// ServiceAreaRate - 服务区运价
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAreaRate {
    pub service_area: String,
    pub name: String,
    pub services_schedule: i32,         // 服务费率档（包装/装箱等项目按此档取价）
    pub linehaul_factor: Cents,         // 干线系数（分/cwt）
    pub service_charge_cents: Cents,    // 服务费（分/cwt）
    pub sit_185a_rate_cents: Cents,     // 仓储首日（分/cwt）
    pub sit_185b_rate_cents: Cents,     // 仓储续日（分/cwt/日）
    pub sit_pd_schedule: i32,           // 仓储提送档
    pub weight_lbs_lower: Pound,
    pub weight_lbs_upper: Pound,
    pub window: EffectiveWindow,
}

impl ServiceAreaRate {
    pub fn covers_weight(&self, weight: Pound) -> bool {
        in_band(weight.0, self.weight_lbs_lower.0, self.weight_lbs_upper.0)
    }
}

// ==========================================
// ItemRate - 附加项目运价
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRate {
    pub code: String,
    pub schedule: Option<i32>, // 服务区费率档；None 表示与档位无关
    pub weight_lbs_lower: Pound,
    pub weight_lbs_upper: Pound,
    pub rate_cents: Cents,     // 每计费单位（或每 cwt）分
    pub window: EffectiveWindow,
}

impl ItemRate {
    pub fn covers_weight(&self, weight: Pound) -> bool {
        in_band(weight.0, self.weight_lbs_lower.0, self.weight_lbs_upper.0)
    }
}

// ==========================================
// LinehaulRate - 干线基础运价
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinehaulRate {
    pub distance_miles_lower: Miles,
    pub distance_miles_upper: Miles,
    pub weight_lbs_lower: Pound,
    pub weight_lbs_upper: Pound,
    pub rate_cents: Cents, // 分/cwt
    pub window: EffectiveWindow,
}

impl LinehaulRate {
    pub fn covers(&self, distance: Miles, weight: Pound) -> bool {
        in_band(distance.0, self.distance_miles_lower.0, self.distance_miles_upper.0)
            && in_band(weight.0, self.weight_lbs_lower.0, self.weight_lbs_upper.0)
    }
}

// ==========================================
// TariffKey / TariffRateRecord
// ==========================================

/// 运价查询键
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TariffKey {
    Zip3(String),
    ServiceArea(String),
    Item(String),
    Linehaul,
}

impl fmt::Display for TariffKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TariffKey::Zip3(z) => write!(f, "zip3={}", z),
            TariffKey::ServiceArea(sa) => write!(f, "service_area={}", sa),
            TariffKey::Item(code) => write!(f, "item={}", code),
            TariffKey::Linehaul => write!(f, "linehaul"),
        }
    }
}

/// 运价记录（四类表统一视图）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TariffRateRecord {
    Zip3(Zip3Record),
    ServiceArea(ServiceAreaRate),
    Item(ItemRate),
    Linehaul(LinehaulRate),
}

impl TariffRateRecord {
    /// 该记录所属的查询键
    pub fn key(&self) -> TariffKey {
        match self {
            TariffRateRecord::Zip3(r) => TariffKey::Zip3(r.zip3.clone()),
            TariffRateRecord::ServiceArea(r) => TariffKey::ServiceArea(r.service_area.clone()),
            TariffRateRecord::Item(r) => TariffKey::Item(r.code.clone()),
            TariffRateRecord::Linehaul(_) => TariffKey::Linehaul,
        }
    }

    /// 生效区间（Zip3 映射无日期，恒生效）
    pub fn window(&self) -> Option<EffectiveWindow> {
        match self {
            TariffRateRecord::Zip3(_) => None,
            TariffRateRecord::ServiceArea(r) => Some(r.window),
            TariffRateRecord::Item(r) => Some(r.window),
            TariffRateRecord::Linehaul(r) => Some(r.window),
        }
    }

    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.window().map_or(true, |w| w.contains(date))
    }

    /// 区间不重叠约束的完整键（键 + 重量/距离/档位区间）
    pub fn bracket_key(&self) -> String {
        match self {
            TariffRateRecord::Zip3(r) => format!("zip3:{}", r.zip3),
            TariffRateRecord::ServiceArea(r) => format!(
                "sa:{}:{}-{}",
                r.service_area, r.weight_lbs_lower.0, r.weight_lbs_upper.0
            ),
            TariffRateRecord::Item(r) => format!(
                "item:{}:{}:{}-{}",
                r.code,
                r.schedule.map(|s| s.to_string()).unwrap_or_else(|| "*".to_string()),
                r.weight_lbs_lower.0,
                r.weight_lbs_upper.0
            ),
            TariffRateRecord::Linehaul(r) => format!(
                "lh:{}-{}:{}-{}",
                r.distance_miles_lower.0,
                r.distance_miles_upper.0,
                r.weight_lbs_lower.0,
                r.weight_lbs_upper.0
            ),
        }
    }
}
