// ==========================================
// 家庭物品搬迁核心 - 承运商与报价领域模型
// ==========================================
// 说明: 承运商分配（竞标）逻辑不在本核心内，
//       这里只保留运单状态流转需要读取的报价记录
// ==========================================

use crate::domain::shipment::FieldViolation;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// TransportationServiceProvider - 承运商 (TSP)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportationServiceProvider {
    pub tsp_id: String,
    pub standard_carrier_alpha_code: String, // SCAC
    pub name: String,
}

impl TransportationServiceProvider {
    pub fn new(scac: &str, name: &str) -> Self {
        Self {
            tsp_id: Uuid::new_v4().to_string(),
            standard_carrier_alpha_code: scac.to_string(),
            name: name.to_string(),
        }
    }

    pub fn validate(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        if self.standard_carrier_alpha_code.trim().is_empty() {
            violations.push(FieldViolation {
                field: "standard_carrier_alpha_code".to_string(),
                message: "StandardCarrierAlphaCode can not be blank.".to_string(),
            });
        }
        if self.name.trim().is_empty() {
            violations.push(FieldViolation {
                field: "name".to_string(),
                message: "Name can not be blank.".to_string(),
            });
        }
        violations
    }
}

// ==========================================
// ShipmentOffer - 运单报价
// ==========================================
// accepted: None=待定, Some(true)=已接受, Some(false)=已拒绝
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentOffer {
    pub offer_id: String,
    pub shipment_id: String,
    pub tsp_id: String,
    pub tsp_performance_id: String,
    pub administrative_shipment: bool,
    pub accepted: Option<bool>,
    pub rejection_reason: Option<String>,
}

impl ShipmentOffer {
    pub fn new(
        shipment_id: &str,
        tsp_id: &str,
        tsp_performance_id: &str,
        administrative_shipment: bool,
    ) -> Self {
        Self {
            offer_id: Uuid::new_v4().to_string(),
            shipment_id: shipment_id.to_string(),
            tsp_id: tsp_id.to_string(),
            tsp_performance_id: tsp_performance_id.to_string(),
            administrative_shipment,
            accepted: None,
            rejection_reason: None,
        }
    }

    /// 待定或已接受的报价视为"已报价"
    pub fn is_live(&self) -> bool {
        self.accepted != Some(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tsp_requires_scac_and_name() {
        let tsp = TransportationServiceProvider::new(" ", "");
        let fields: Vec<_> = tsp.validate().into_iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["standard_carrier_alpha_code", "name"]);
    }

    #[test]
    fn test_rejected_offer_is_not_live() {
        let mut offer = ShipmentOffer::new("s", "t", "p", false);
        assert!(offer.is_live());
        offer.accepted = Some(false);
        assert!(!offer.is_live());
    }
}
