use super::pricing::{policy_for, PricingPolicy, SubRate};
use super::tariff_table::TariffSource;
use crate::domain::line_item::ShipmentLineItem;
use crate::domain::shipment::Shipment;
use crate::domain::tariff::{ItemRate, LinehaulRate, ServiceAreaRate, TariffKey, TariffRateRecord};
use crate::domain::types::LineItemLocation;
use crate::domain::units::{Cents, Miles, Pound, BASE_QUANTITY_SCALE};
use crate::engine::error::{EngineError, EngineResult};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// 单次计价的输入（只读）
struct PricingContext<'a> {
    shipment: &'a Shipment,
    item: &'a ShipmentLineItem,
    as_of: NaiveDate,
}

// ==========================================
// RateEngine - 运价计算引擎
// ==========================================
pub struct RateEngine {
    source: Arc<dyn TariffSource>,
}

impl RateEngine {
    pub fn new(source: Arc<dyn TariffSource>) -> Self {
        Self { source }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 计算单条费用行金额
    ///
    /// 运价按运单 book_date 取生效记录；引擎不修改费用行，结果由调用方持久化
    ///
    /// # 参数
    /// - `item`: 费用行
    /// - `shipment`: 所属运单
    ///
    /// # 返回
    /// - Ok(Cents): 金额（分）
    ///
    /// # 错误
    /// - `UnpricedItemCode`: 项目代码不在计价目录中
    /// - `MissingShipmentAttribute`: 缺少 book_date / 重量 / 距离 / 地址
    /// - `NoApplicableRate` / `AmbiguousRate`: 运价记录为零条或多于一条
    #[instrument(skip_all, fields(shipment_id = %shipment.shipment_id, code = %item.code))]
    pub fn compute_line_item(
        &self,
        item: &ShipmentLineItem,
        shipment: &Shipment,
    ) -> EngineResult<Cents> {
        let policy = policy_for(&item.code)
            .ok_or_else(|| EngineError::UnpricedItemCode(item.code.clone()))?;
        let as_of = shipment
            .book_date
            .ok_or_else(|| missing(shipment, "book_date"))?;

        let ctx = PricingContext { shipment, item, as_of };
        let result = match policy {
            PricingPolicy::Linehaul => self.price_linehaul(&ctx),
            PricingPolicy::AreaFixed { rate_code } => self.price_area_fixed(&ctx, rate_code),
            PricingPolicy::FlatPerUnit { rate_code } => self.price_flat_per_unit(&ctx, rate_code),
            PricingPolicy::Composite(parts) => {
                parts
                    .iter()
                    .try_fold(Cents(0), |acc, part| -> EngineResult<Cents> {
                        let amount = self.price_sub_rate(&ctx, *part)?;
                        checked(acc.checked_add(amount), &item.code)
                    })
            }
        };

        match &result {
            Ok(amount) => debug!(amount = %amount, policy = ?policy, "计价完成"),
            Err(e) => warn!(error = %e, "计价失败"),
        }
        result
    }

    /// 按顺序计算多条费用行，任一失败即整体失败
    pub fn compute_line_items(
        &self,
        items: &[ShipmentLineItem],
        shipment: &Shipment,
    ) -> EngineResult<Vec<(String, Cents)>> {
        items
            .iter()
            .map(|item| {
                self.compute_line_item(item, shipment)
                    .map(|amount| (item.line_item_id.clone(), amount))
            })
            .collect()
    }

    // ==========================================
    // 策略实现
    // ==========================================

    fn price_linehaul(&self, ctx: &PricingContext<'_>) -> EngineResult<Cents> {
        let weight = require_weight(ctx.shipment)?;
        let distance = require_distance(ctx.shipment)?;

        let base = self.linehaul_rate(distance, weight, ctx.as_of)?;
        let origin = self.service_area_rate_at(ctx, LineItemLocation::Origin, Some(weight))?;
        let destination = self.service_area_rate_at(ctx, LineItemLocation::Destination, Some(weight))?;

        let total = [base.rate_cents, origin.linehaul_factor, destination.linehaul_factor]
            .iter()
            .try_fold(Cents(0), |acc, rate| acc.checked_add(rate.per_hundredweight(weight)?));
        checked(total, "LHS")
    }

    /// 按服务区档位取项目费率；运单有净重时同时按重量档筛选
    fn price_area_fixed(&self, ctx: &PricingContext<'_>, rate_code: &str) -> EngineResult<Cents> {
        let weight = ctx.shipment.net_weight;
        let area = self.service_area_rate_at(ctx, ctx.item.location, weight)?;
        let rate = self.item_rate(rate_code, Some(area.services_schedule), weight, ctx.as_of)?;
        checked(
            rate.rate_cents
                .multiply_ratio(ctx.item.quantity1.value() as i128, BASE_QUANTITY_SCALE as i128),
            &ctx.item.code,
        )
    }

    fn price_flat_per_unit(&self, ctx: &PricingContext<'_>, rate_code: &str) -> EngineResult<Cents> {
        let weight = require_weight(ctx.shipment)?;
        let rate = self.item_rate(rate_code, None, Some(weight), ctx.as_of)?;
        checked(
            rate.rate_cents
                .multiply_ratio(ctx.item.quantity1.value() as i128, BASE_QUANTITY_SCALE as i128),
            &ctx.item.code,
        )
    }

    fn price_sub_rate(&self, ctx: &PricingContext<'_>, part: SubRate) -> EngineResult<Cents> {
        let weight = require_weight(ctx.shipment)?;
        let area = self.service_area_rate_at(ctx, ctx.item.location, Some(weight))?;

        let amount = match part {
            SubRate::ServiceCharge => area.service_charge_cents.per_hundredweight(weight),
            SubRate::SitFirstDay => area.sit_185a_rate_cents.per_hundredweight(weight),
            SubRate::SitAdditionalDays => {
                let extra_days = (ctx.item.quantity1.to_unit_int() - 1).max(0) as i128;
                area.sit_185b_rate_cents
                    .multiply_ratio(weight.hundredweight_numerator() * extra_days, 100)
            }
            SubRate::SitPickupDelivery => {
                let rate = self.item_rate("210A", Some(area.sit_pd_schedule), Some(weight), ctx.as_of)?;
                rate.rate_cents.per_hundredweight(weight)
            }
        };
        let amount = checked(amount, &ctx.item.code)?;
        debug!(part = ?part, amount = %amount, "子费率");
        Ok(amount)
    }

    // ==========================================
    // 运价查找
    // ==========================================

    /// 由运单地址解析服务区运价
    fn service_area_rate_at(
        &self,
        ctx: &PricingContext<'_>,
        location: LineItemLocation,
        weight: Option<Pound>,
    ) -> EngineResult<ServiceAreaRate> {
        let service_area = self.resolve_service_area(ctx, location)?;
        let key = TariffKey::ServiceArea(service_area);
        self.exactly_one(&key, ctx.as_of, |record| match record {
            TariffRateRecord::ServiceArea(r) if weight.map_or(true, |w| r.covers_weight(w)) => {
                Some(r.clone())
            }
            _ => None,
        })
    }

    /// 起运地用提货地址，目的地用送达地址；取邮编前三位查 Zip3 表
    fn resolve_service_area(
        &self,
        ctx: &PricingContext<'_>,
        location: LineItemLocation,
    ) -> EngineResult<String> {
        let shipment = ctx.shipment;
        let (field, address) = match location {
            LineItemLocation::Origin => ("pickup_address", shipment.pickup_address.as_ref()),
            LineItemLocation::Destination => ("delivery_address", shipment.delivery_address.as_ref()),
        };
        let address = address.ok_or_else(|| missing(shipment, field))?;
        let zip3 = address
            .zip3()
            .ok_or_else(|| missing(shipment, &format!("{}.postal_code", field)))?;

        let key = TariffKey::Zip3(zip3.to_string());
        self.exactly_one(&key, ctx.as_of, |record| match record {
            TariffRateRecord::Zip3(r) => Some(r.service_area.clone()),
            _ => None,
        })
    }

    fn item_rate(
        &self,
        code: &str,
        schedule: Option<i32>,
        weight: Option<Pound>,
        as_of: NaiveDate,
    ) -> EngineResult<ItemRate> {
        let key = TariffKey::Item(code.to_string());
        self.exactly_one(&key, as_of, |record| match record {
            TariffRateRecord::Item(r)
                if (r.schedule.is_none() || r.schedule == schedule)
                    && weight.map_or(true, |w| r.covers_weight(w)) =>
            {
                Some(r.clone())
            }
            _ => None,
        })
    }

    fn linehaul_rate(&self, distance: Miles, weight: Pound, as_of: NaiveDate) -> EngineResult<LinehaulRate> {
        self.exactly_one(&TariffKey::Linehaul, as_of, |record| match record {
            TariffRateRecord::Linehaul(r) if r.covers(distance, weight) => Some(r.clone()),
            _ => None,
        })
    }

    /// 取唯一匹配记录：零条 → NoApplicableRate，多条 → AmbiguousRate
    fn exactly_one<T>(
        &self,
        key: &TariffKey,
        as_of: NaiveDate,
        select: impl Fn(&TariffRateRecord) -> Option<T>,
    ) -> EngineResult<T> {
        let mut matches: Vec<T> = self
            .source
            .fetch_tariff_records(key, as_of)?
            .iter()
            .filter(|r| r.is_effective_on(as_of))
            .filter_map(|r| select(r))
            .collect();

        debug!(key = %key, as_of = %as_of, count = matches.len(), "运价查找");
        match matches.len() {
            0 => Err(EngineError::NoApplicableRate {
                key: key.clone(),
                as_of,
            }),
            1 => Ok(matches.remove(0)),
            count => Err(EngineError::AmbiguousRate {
                key: key.clone(),
                as_of,
                count,
            }),
        }
    }
}

fn require_weight(shipment: &Shipment) -> EngineResult<Pound> {
    shipment
        .net_weight
        .ok_or_else(|| missing(shipment, "net_weight"))
}

fn require_distance(shipment: &Shipment) -> EngineResult<Miles> {
    shipment
        .transit_distance
        .ok_or_else(|| missing(shipment, "transit_distance"))
}

/// 金额运算溢出 → AmountOverflow
fn checked(amount: Option<Cents>, code: &str) -> EngineResult<Cents> {
    amount.ok_or_else(|| EngineError::AmountOverflow(format!("项目代码 {}", code)))
}

fn missing(shipment: &Shipment, attribute: &str) -> EngineError {
    EngineError::MissingShipmentAttribute {
        shipment_id: shipment.shipment_id.clone(),
        attribute: attribute.to_string(),
    }
}
