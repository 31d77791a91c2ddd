// ==========================================
// 家庭物品搬迁核心 - 计量单位
// ==========================================
// 职责: 重量 / 金额 / 数量 / 距离 的强类型包装
// 红线: 金额一律整数分(cents)，禁止浮点参与计价
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// 基础数量的隐含小数位: 1 个计费单位 = 10000 基础数量
pub const BASE_QUANTITY_SCALE: i64 = 10_000;

/// 四舍五入的整数除法（用于正负金额，半数远离零）
pub fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    debug_assert!(denominator > 0);
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.abs() * 2 >= denominator {
        quotient + numerator.signum()
    } else {
        quotient
    }
}

// ==========================================
// Pound - 重量（磅）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pound(pub i64);

impl Pound {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// 百磅(cwt)数，按整磅精度保留为 (分子, 100)
    pub fn hundredweight_numerator(&self) -> i128 {
        self.0 as i128
    }
}

impl fmt::Display for Pound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}lbs", self.0)
    }
}

// ==========================================
// Miles - 运输距离（英里）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Miles(pub i64);

impl Miles {
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Miles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}mi", self.0)
    }
}

// ==========================================
// Cents - 金额（分）
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cents(pub i64);

impl Cents {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// 乘以 分子/分母 并四舍五入到分
    ///
    /// # 返回
    /// - None: 结果超出 i64 可表示范围
    pub fn multiply_ratio(&self, numerator: i128, denominator: i128) -> Option<Cents> {
        let product = (self.0 as i128).checked_mul(numerator)?;
        i64::try_from(div_round_half_up(product, denominator))
            .ok()
            .map(Cents)
    }

    /// 按百磅计价: rate(分/cwt) × weight / 100
    pub fn per_hundredweight(&self, weight: Pound) -> Option<Cents> {
        self.multiply_ratio(weight.hundredweight_numerator(), 100)
    }

    pub fn checked_add(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_add(rhs.0).map(Cents)
    }
}

impl Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl std::iter::Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Cents {
        iter.fold(Cents(0), |acc, c| acc + c)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}

// ==========================================
// BaseQuantity - 基础数量（4 位隐含小数）
// ==========================================
// 例: 50000 => 5 个计费单位
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BaseQuantity(pub i64);

impl BaseQuantity {
    pub fn from_int(units: i64) -> Self {
        BaseQuantity(units * BASE_QUANTITY_SCALE)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// 取整数计费单位（截断）
    pub fn to_unit_int(&self) -> i64 {
        self.0 / BASE_QUANTITY_SCALE
    }
}

impl fmt::Display for BaseQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:04}",
            self.0 / BASE_QUANTITY_SCALE,
            (self.0 % BASE_QUANTITY_SCALE).abs()
        )
    }
}
