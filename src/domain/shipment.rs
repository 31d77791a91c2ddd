// ==========================================
// 家庭物品搬迁核心 - 运单领域模型
// ==========================================
// 红线: 运单是聚合根；状态与日期字段只能经由状态机修改
// 红线: 日期一旦写入不再清空
// ==========================================

use crate::domain::types::ShipmentStatus;
use crate::domain::units::{Miles, Pound};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// Address - 地址
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street_address_1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String, // 5 位或 9 位邮编
}

impl Address {
    pub fn new(street: &str, city: &str, state: &str, postal_code: &str) -> Self {
        Self {
            street_address_1: street.to_string(),
            city: city.to_string(),
            state: state.to_string(),
            postal_code: postal_code.to_string(),
        }
    }

    /// 邮编前三位（服务区解析用）
    pub fn zip3(&self) -> Option<&str> {
        let trimmed = self.postal_code.trim();
        if trimmed.len() >= 3 && trimmed.is_char_boundary(3) && trimmed[..3].chars().all(|c| c.is_ascii_digit()) {
            Some(&trimmed[..3])
        } else {
            None
        }
    }
}

// ==========================================
// FieldViolation - 字段校验违规
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &str, message: String) -> Self {
        Self {
            field: field.to_string(),
            message,
        }
    }
}

// ==========================================
// Shipment - 运单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    // ===== 标识 =====
    pub shipment_id: String,
    pub move_id: String,
    pub status: ShipmentStatus,

    // ===== 会计办公室 / GBL =====
    pub source_gbloc: Option<String>,      // 起运地 GBLOC
    pub destination_gbloc: Option<String>, // 目的地 GBLOC
    pub gbl_number: Option<String>,        // 提交时分配，只分配一次
    pub market: Option<String>,            // 市场 (dHHG / iHHG)

    // ===== 日期 =====
    pub book_date: Option<NaiveDate>,
    pub requested_pickup_date: Option<NaiveDate>,
    pub actual_pack_date: Option<NaiveDate>,
    pub actual_pickup_date: Option<NaiveDate>,
    pub actual_delivery_date: Option<NaiveDate>,

    // ===== 估算 =====
    pub estimated_pack_days: Option<i64>,
    pub estimated_transit_days: Option<i64>,
    pub weight_estimate: Option<Pound>,
    pub progear_weight_estimate: Option<Pound>,
    pub spouse_progear_weight_estimate: Option<Pound>,

    // ===== 计价输入 =====
    pub net_weight: Option<Pound>,        // 过磅前可为空
    pub transit_distance: Option<Miles>,  // 由外部路径规划写入
    pub pickup_address: Option<Address>,
    pub delivery_address: Option<Address>,

    // ===== 审计 =====
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub revision: i32, // 乐观锁：修订号
}

impl Shipment {
    /// 创建草稿运单
    pub fn new_draft(move_id: &str, now: NaiveDateTime) -> Self {
        Self {
            shipment_id: Uuid::new_v4().to_string(),
            move_id: move_id.to_string(),
            status: ShipmentStatus::Draft,
            source_gbloc: None,
            destination_gbloc: None,
            gbl_number: None,
            market: None,
            book_date: None,
            requested_pickup_date: None,
            actual_pack_date: None,
            actual_pickup_date: None,
            actual_delivery_date: None,
            estimated_pack_days: None,
            estimated_transit_days: None,
            weight_estimate: None,
            progear_weight_estimate: None,
            spouse_progear_weight_estimate: None,
            net_weight: None,
            transit_distance: None,
            pickup_address: None,
            delivery_address: None,
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    /// 字段校验，返回全部违规项（空表示通过）
    pub fn validate(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();

        if self.move_id.trim().is_empty() {
            violations.push(FieldViolation::new("move_id", "move_id can not be blank.".to_string()));
        }

        for (field, value) in [
            ("estimated_pack_days", self.estimated_pack_days),
            ("estimated_transit_days", self.estimated_transit_days),
        ] {
            if let Some(v) = value {
                if v <= 0 {
                    violations.push(FieldViolation::new(
                        field,
                        format!("{} is less than or equal to zero.", v),
                    ));
                }
            }
        }

        for (field, value) in [
            ("weight_estimate", self.weight_estimate),
            ("progear_weight_estimate", self.progear_weight_estimate),
            ("spouse_progear_weight_estimate", self.spouse_progear_weight_estimate),
            ("net_weight", self.net_weight),
        ] {
            if let Some(Pound(v)) = value {
                if v < 0 {
                    violations.push(FieldViolation::new(field, format!("{} is less than zero.", v)));
                }
            }
        }

        violations
    }

    pub fn is_draft(&self) -> bool {
        self.status == ShipmentStatus::Draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2018, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_validate_reports_every_bad_field() {
        let mut shipment = Shipment::new_draft("", now());
        shipment.estimated_pack_days = Some(-2);
        shipment.estimated_transit_days = Some(0);
        shipment.weight_estimate = Some(Pound(-3));
        shipment.progear_weight_estimate = Some(Pound(-12));
        shipment.spouse_progear_weight_estimate = Some(Pound(-9));

        let violations = shipment.validate();
        let find = |field: &str| {
            violations
                .iter()
                .find(|v| v.field == field)
                .map(|v| v.message.clone())
        };

        assert_eq!(violations.len(), 6);
        assert_eq!(find("move_id").as_deref(), Some("move_id can not be blank."));
        assert_eq!(find("estimated_pack_days").as_deref(), Some("-2 is less than or equal to zero."));
        assert_eq!(find("estimated_transit_days").as_deref(), Some("0 is less than or equal to zero."));
        assert_eq!(find("weight_estimate").as_deref(), Some("-3 is less than zero."));
        assert_eq!(find("progear_weight_estimate").as_deref(), Some("-12 is less than zero."));
        assert_eq!(find("spouse_progear_weight_estimate").as_deref(), Some("-9 is less than zero."));
    }

    #[test]
    fn test_new_draft_is_valid() {
        let shipment = Shipment::new_draft("move-1", now());
        assert!(shipment.is_draft());
        assert!(shipment.validate().is_empty());
        assert!(shipment.gbl_number.is_none());
    }

    #[test]
    fn test_zip3() {
        assert_eq!(Address::new("1 Main", "Gulfport", "MS", "39501").zip3(), Some("395"));
        assert_eq!(Address::new("1 Main", "X", "MS", "3a").zip3(), None);
    }
}
