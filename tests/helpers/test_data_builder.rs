// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use hhg_move_engine::domain::shipment::{Address, Shipment};
use hhg_move_engine::domain::tariff::{EffectiveWindow, ItemRate, TariffRateRecord};
use hhg_move_engine::domain::units::{Cents, Miles, Pound};

// ==========================================
// Shipment 构建器
// ==========================================

pub struct ShipmentBuilder {
    move_id: String,
    source_gbloc: Option<String>,
    requested_pickup_date: Option<NaiveDate>,
    weight_estimate: Option<Pound>,
    net_weight: Option<Pound>,
    transit_distance: Option<Miles>,
    pickup_zip: Option<String>,
    delivery_zip: Option<String>,
}

impl ShipmentBuilder {
    pub fn new(move_id: &str) -> Self {
        Self {
            move_id: move_id.to_string(),
            source_gbloc: Some("GBO1".to_string()),
            requested_pickup_date: None,
            weight_estimate: None,
            net_weight: None,
            transit_distance: None,
            pickup_zip: None,
            delivery_zip: None,
        }
    }

    pub fn gbloc(mut self, gbloc: &str) -> Self {
        self.source_gbloc = Some(gbloc.to_string());
        self
    }

    pub fn without_gbloc(mut self) -> Self {
        self.source_gbloc = None;
        self
    }

    pub fn requested_pickup(mut self, date: NaiveDate) -> Self {
        self.requested_pickup_date = Some(date);
        self
    }

    pub fn weight_estimate(mut self, lbs: i64) -> Self {
        self.weight_estimate = Some(Pound(lbs));
        self
    }

    pub fn net_weight(mut self, lbs: i64) -> Self {
        self.net_weight = Some(Pound(lbs));
        self
    }

    pub fn distance(mut self, miles: i64) -> Self {
        self.transit_distance = Some(Miles(miles));
        self
    }

    pub fn route(mut self, pickup_zip: &str, delivery_zip: &str) -> Self {
        self.pickup_zip = Some(pickup_zip.to_string());
        self.delivery_zip = Some(delivery_zip.to_string());
        self
    }

    /// 可计价运单：2000 磅、500 英里、39501 → 33601
    pub fn priceable(self) -> Self {
        self.net_weight(2000).distance(500).route("39501", "33601")
    }

    pub fn build(self, now: NaiveDateTime) -> Shipment {
        let mut shipment = Shipment::new_draft(&self.move_id, now);
        shipment.source_gbloc = self.source_gbloc;
        shipment.requested_pickup_date = self.requested_pickup_date;
        shipment.weight_estimate = self.weight_estimate;
        shipment.net_weight = self.net_weight;
        shipment.transit_distance = self.transit_distance;
        shipment.pickup_address = self
            .pickup_zip
            .map(|zip| Address::new("1 Main St", "Gulfport", "MS", &zip));
        shipment.delivery_address = self
            .delivery_zip
            .map(|zip| Address::new("9 Bay Rd", "Tampa", "FL", &zip));
        shipment
    }
}

// ==========================================
// ItemRate 构建器
// ==========================================

pub struct ItemRateBuilder {
    code: String,
    schedule: Option<i32>,
    rate_cents: i64,
    window: EffectiveWindow,
}

impl ItemRateBuilder {
    pub fn new(code: &str, rate_cents: i64, lower: NaiveDate, upper: NaiveDate) -> Self {
        Self {
            code: code.to_string(),
            schedule: None,
            rate_cents,
            window: EffectiveWindow::new(lower, upper),
        }
    }

    pub fn schedule(mut self, schedule: i32) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn build(self) -> TariffRateRecord {
        TariffRateRecord::Item(ItemRate {
            code: self.code,
            schedule: self.schedule,
            weight_lbs_lower: Pound(0),
            weight_lbs_upper: Pound(i64::MAX),
            rate_cents: Cents(self.rate_cents),
            window: self.window,
        })
    }
}
