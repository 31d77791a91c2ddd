// ==========================================
// 计价策略目录（封闭集合）
// ==========================================
// 新增项目代码只能从既有策略中选一个，不允许写专用逻辑
// ==========================================

use serde::Serialize;

/// 组合策略的子费率，每项独立查表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubRate {
    /// 服务区服务费 × cwt
    ServiceCharge,
    /// 仓储首日: 185A 费率 × cwt
    SitFirstDay,
    /// 仓储续日: 185B 费率 × cwt × (天数 - 1)
    SitAdditionalDays,
    /// 仓储提送: 210A 项目费率（按服务区 SIT P/D 档与重量段）× cwt
    SitPickupDelivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PricingPolicy {
    /// 干线: 干线费率(距离段 × 重量段) × cwt + 起运/目的服务区干线系数 × cwt
    Linehaul,
    /// 按单位: 重量段项目费率 × quantity1 计费单位
    FlatPerUnit { rate_code: &'static str },
    /// 服务区固定: 服务区费率档对应的项目费率 × quantity1 / 10000
    AreaFixed { rate_code: &'static str },
    /// 组合: 各子费率之和
    Composite(&'static [SubRate]),
}

const SERVICE_CHARGE: &[SubRate] = &[SubRate::ServiceCharge];
const SIT_STORAGE: &[SubRate] = &[SubRate::SitFirstDay, SubRate::SitAdditionalDays];
const SIT_PICKUP_DELIVERY: &[SubRate] = &[SubRate::SitPickupDelivery];

/// 项目代码 → 计价策略
const CATALOG: &[(&str, PricingPolicy)] = &[
    ("LHS", PricingPolicy::Linehaul),
    ("105A", PricingPolicy::AreaFixed { rate_code: "105A" }),
    ("105B", PricingPolicy::AreaFixed { rate_code: "105B" }),
    ("105C", PricingPolicy::AreaFixed { rate_code: "105C" }),
    // 拆箱按装箱费率计价
    ("105E", PricingPolicy::AreaFixed { rate_code: "105B" }),
    ("120A", PricingPolicy::FlatPerUnit { rate_code: "120A" }),
    ("125A", PricingPolicy::FlatPerUnit { rate_code: "125A" }),
    ("125B", PricingPolicy::FlatPerUnit { rate_code: "125B" }),
    ("130A", PricingPolicy::FlatPerUnit { rate_code: "130A" }),
    ("135A", PricingPolicy::Composite(SERVICE_CHARGE)),
    ("135B", PricingPolicy::Composite(SERVICE_CHARGE)),
    ("185A", PricingPolicy::Composite(SIT_STORAGE)),
    ("210A", PricingPolicy::Composite(SIT_PICKUP_DELIVERY)),
];

/// 查询项目代码的计价策略（大小写不敏感）
pub fn policy_for(code: &str) -> Option<PricingPolicy> {
    let code = code.trim().to_ascii_uppercase();
    CATALOG
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, policy)| *policy)
}

/// 已登记的全部项目代码
pub fn priced_codes() -> Vec<&'static str> {
    CATALOG.iter().map(|(c, _)| *c).collect()
}
