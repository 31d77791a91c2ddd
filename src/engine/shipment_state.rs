// ==========================================
// 家庭物品搬迁核心 - 运单状态机
// ==========================================
// 职责: 集中校验并执行运单的具名状态转换
// 状态: DRAFT → SUBMITTED → AWARDED → ACCEPTED → APPROVED → IN_TRANSIT → DELIVERED → COMPLETED
// 红线: 每个转换只允许从唯一的源状态发起（见 TRANSITION_TABLE）
// 红线: 校验失败时运单保持原样（先校验、再取序号、最后统一写字段）
// 红线: 日期一旦写入不再覆盖；重复 Pack 视为非法转换
// ==========================================

use crate::domain::shipment::Shipment;
use crate::domain::types::ShipmentStatus;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::gbl::GblNumberAssigner;
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument, warn};

// ==========================================
// ShipmentTransition - 具名转换
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipmentTransition {
    Submit,
    Award,
    Accept,
    Approve,
    Pack(NaiveDate),
    Transport(NaiveDate),
    Deliver(NaiveDate),
    Complete,
}

/// 转换名称 → (源状态, 目标状态)
const TRANSITION_TABLE: [(&str, ShipmentStatus, ShipmentStatus); 8] = [
    ("SUBMIT", ShipmentStatus::Draft, ShipmentStatus::Submitted),
    ("AWARD", ShipmentStatus::Submitted, ShipmentStatus::Awarded),
    ("ACCEPT", ShipmentStatus::Awarded, ShipmentStatus::Accepted),
    ("APPROVE", ShipmentStatus::Accepted, ShipmentStatus::Approved),
    ("PACK", ShipmentStatus::Approved, ShipmentStatus::Approved),
    ("TRANSPORT", ShipmentStatus::Approved, ShipmentStatus::InTransit),
    ("DELIVER", ShipmentStatus::InTransit, ShipmentStatus::Delivered),
    ("COMPLETE", ShipmentStatus::Delivered, ShipmentStatus::Completed),
];

impl ShipmentTransition {
    pub fn name(&self) -> &'static str {
        self.entry().0
    }

    pub fn source(&self) -> ShipmentStatus {
        self.entry().1
    }

    pub fn target(&self) -> ShipmentStatus {
        self.entry().2
    }

    fn entry(&self) -> (&'static str, ShipmentStatus, ShipmentStatus) {
        let index = match self {
            ShipmentTransition::Submit => 0,
            ShipmentTransition::Award => 1,
            ShipmentTransition::Accept => 2,
            ShipmentTransition::Approve => 3,
            ShipmentTransition::Pack(_) => 4,
            ShipmentTransition::Transport(_) => 5,
            ShipmentTransition::Deliver(_) => 6,
            ShipmentTransition::Complete => 7,
        };
        TRANSITION_TABLE[index]
    }
}

impl fmt::Display for ShipmentTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShipmentTransition::Pack(d)
            | ShipmentTransition::Transport(d)
            | ShipmentTransition::Deliver(d) => write!(f, "{}({})", self.name(), d),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// 某状态下可发起的转换名称
pub fn available_transitions(status: ShipmentStatus) -> Vec<&'static str> {
    TRANSITION_TABLE
        .iter()
        .filter(|(_, source, _)| *source == status)
        .map(|(name, _, _)| *name)
        .collect()
}

// ==========================================
// ShipmentStateMachine - 运单状态机
// ==========================================
pub struct ShipmentStateMachine {
    gbl_assigner: Arc<GblNumberAssigner>,
}

impl ShipmentStateMachine {
    pub fn new(gbl_assigner: Arc<GblNumberAssigner>) -> Self {
        Self { gbl_assigner }
    }

    /// 只做合法性检查，不修改运单、不消耗序号
    pub fn check(&self, shipment: &Shipment, transition: &ShipmentTransition) -> EngineResult<()> {
        if shipment.status != transition.source() {
            return Err(invalid(
                shipment,
                transition,
                format!("{} 只能从 {} 发起", transition.name(), transition.source()),
            ));
        }

        match transition {
            ShipmentTransition::Submit => {
                let violations = shipment.validate();
                if !violations.is_empty() {
                    let detail = violations
                        .iter()
                        .map(|v| format!("{}: {}", v.field, v.message))
                        .collect::<Vec<_>>()
                        .join("; ");
                    return Err(invalid(shipment, transition, format!("运单字段校验失败: {}", detail)));
                }
                let has_gbloc = shipment
                    .source_gbloc
                    .as_deref()
                    .map_or(false, |g| !g.trim().is_empty());
                if !has_gbloc {
                    return Err(EngineError::MissingShipmentAttribute {
                        shipment_id: shipment.shipment_id.clone(),
                        attribute: "source_gbloc".to_string(),
                    });
                }
            }
            ShipmentTransition::Pack(_) => {
                if let Some(packed) = shipment.actual_pack_date {
                    return Err(invalid(
                        shipment,
                        transition,
                        format!("已于 {} 打包，不允许重复打包", packed),
                    ));
                }
            }
            ShipmentTransition::Transport(date) => {
                if let Some(packed) = shipment.actual_pack_date {
                    if *date < packed {
                        return Err(invalid(
                            shipment,
                            transition,
                            format!("提货日 {} 早于打包日 {}", date, packed),
                        ));
                    }
                }
            }
            ShipmentTransition::Deliver(date) => {
                if let Some(picked_up) = shipment.actual_pickup_date {
                    if *date < picked_up {
                        return Err(invalid(
                            shipment,
                            transition,
                            format!("送达日 {} 早于提货日 {}", date, picked_up),
                        ));
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// 执行转换
    ///
    /// # 参数
    /// - `shipment`: 运单（成功时原地更新）
    /// - `transition`: 具名转换
    /// - `now`: 当前时间（Submit 的 book_date 与 GBL 财年取自该日期）
    ///
    /// # 错误
    /// - `EngineError::InvalidTransition`: 源状态不符、重复打包、日期倒挂、字段校验失败
    /// - `EngineError::MissingShipmentAttribute`: Submit 时缺少 source_gbloc
    /// - GBL 序号相关错误（此时运单未修改）
    #[instrument(skip_all, fields(shipment_id = %shipment.shipment_id, from = %shipment.status, transition = %transition))]
    pub fn apply(
        &self,
        shipment: &mut Shipment,
        transition: ShipmentTransition,
        now: NaiveDateTime,
    ) -> EngineResult<()> {
        if let Err(e) = self.check(shipment, &transition) {
            warn!(error = %e, "状态转换被拒绝");
            return Err(e);
        }

        // 所有可能失败的步骤在写字段之前完成
        let gbl_number = match transition {
            ShipmentTransition::Submit => {
                let gbloc = shipment.source_gbloc.as_deref().unwrap_or_default();
                Some(self.gbl_assigner.assign(gbloc, now.date())?)
            }
            _ => None,
        };

        match transition {
            ShipmentTransition::Submit => {
                if shipment.book_date.is_none() {
                    shipment.book_date = Some(now.date());
                }
                shipment.gbl_number = gbl_number;
            }
            ShipmentTransition::Pack(date) => shipment.actual_pack_date = Some(date),
            ShipmentTransition::Transport(date) => shipment.actual_pickup_date = Some(date),
            ShipmentTransition::Deliver(date) => shipment.actual_delivery_date = Some(date),
            ShipmentTransition::Award
            | ShipmentTransition::Accept
            | ShipmentTransition::Approve
            | ShipmentTransition::Complete => {}
        }

        let from = shipment.status;
        shipment.status = transition.target();
        shipment.updated_at = now;

        info!(from = %from, to = %shipment.status, gbl_number = ?shipment.gbl_number, "运单状态转换");
        Ok(())
    }
}

fn invalid(shipment: &Shipment, transition: &ShipmentTransition, reason: String) -> EngineError {
    EngineError::InvalidTransition {
        shipment_id: shipment.shipment_id.clone(),
        from: shipment.status,
        requested: transition.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::units::Pound;
    use crate::engine::gbl::tests::InMemorySequencer;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn now() -> NaiveDateTime {
        d(2018, 6, 1).and_hms_opt(10, 0, 0).unwrap()
    }

    fn machine() -> ShipmentStateMachine {
        let assigner = GblNumberAssigner::new(Arc::new(InMemorySequencer::default()));
        ShipmentStateMachine::new(Arc::new(assigner))
    }

    fn draft(gbloc: &str) -> Shipment {
        let mut shipment = Shipment::new_draft("move-1", now());
        shipment.source_gbloc = Some(gbloc.to_string());
        shipment
    }

    fn all_transitions() -> Vec<ShipmentTransition> {
        vec![
            ShipmentTransition::Submit,
            ShipmentTransition::Award,
            ShipmentTransition::Accept,
            ShipmentTransition::Approve,
            ShipmentTransition::Pack(d(2018, 6, 10)),
            ShipmentTransition::Transport(d(2018, 6, 12)),
            ShipmentTransition::Deliver(d(2018, 6, 20)),
            ShipmentTransition::Complete,
        ]
    }

    #[test]
    fn test_full_lifecycle_advances_monotonically() {
        let sm = machine();
        let mut shipment = draft("GBO1");
        let mut previous = shipment.status;

        for transition in all_transitions() {
            sm.apply(&mut shipment, transition, now()).unwrap();
            assert!(shipment.status >= previous, "{} 后状态回退", transition);
            previous = shipment.status;
        }

        assert_eq!(shipment.status, ShipmentStatus::Completed);
        assert_eq!(shipment.book_date, Some(d(2018, 6, 1)));
        assert_eq!(shipment.gbl_number.as_deref(), Some("GBO1180000001"));
        assert_eq!(shipment.actual_pack_date, Some(d(2018, 6, 10)));
        assert_eq!(shipment.actual_pickup_date, Some(d(2018, 6, 12)));
        assert_eq!(shipment.actual_delivery_date, Some(d(2018, 6, 20)));
    }

    #[test]
    fn test_each_transition_rejected_from_every_other_state() {
        let sm = machine();
        let transitions = all_transitions();

        // 依次推进，在每个状态尝试所有非法转换
        let mut shipment = draft("GBO1");
        for legal in &transitions {
            for other in &transitions {
                if other.source() == shipment.status {
                    continue;
                }
                let before = shipment.clone();
                let err = sm.apply(&mut shipment, *other, now()).unwrap_err();
                assert!(matches!(err, EngineError::InvalidTransition { .. }));
                assert_eq!(shipment, before, "{} 失败后运单被修改", other);
            }
            sm.apply(&mut shipment, *legal, now()).unwrap();
        }
    }

    #[test]
    fn test_repeat_pack_is_rejected() {
        let sm = machine();
        let mut shipment = draft("GBO1");
        for t in &all_transitions()[..5] {
            sm.apply(&mut shipment, *t, now()).unwrap();
        }
        let before = shipment.clone();
        let err = sm
            .apply(&mut shipment, ShipmentTransition::Pack(d(2018, 6, 11)), now())
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition { from: ShipmentStatus::Approved, .. }
        ));
        assert_eq!(shipment, before);
    }

    #[test]
    fn test_submit_keeps_existing_book_date() {
        let sm = machine();
        let mut shipment = draft("GBO1");
        shipment.book_date = Some(d(2018, 5, 20));
        sm.apply(&mut shipment, ShipmentTransition::Submit, now()).unwrap();
        assert_eq!(shipment.book_date, Some(d(2018, 5, 20)));
    }

    #[test]
    fn test_submit_without_gbloc_leaves_shipment_untouched() {
        let sm = machine();
        let mut shipment = Shipment::new_draft("move-1", now());
        let before = shipment.clone();
        let err = sm.apply(&mut shipment, ShipmentTransition::Submit, now()).unwrap_err();
        assert!(matches!(err, EngineError::MissingShipmentAttribute { .. }));
        assert_eq!(shipment, before);
    }

    #[test]
    fn test_submit_invalid_shipment_is_rejected() {
        let sm = machine();
        let mut shipment = draft("GBO1");
        shipment.weight_estimate = Some(Pound(-3));
        assert!(matches!(
            sm.apply(&mut shipment, ShipmentTransition::Submit, now()),
            Err(EngineError::InvalidTransition { .. })
        ));
        assert!(shipment.gbl_number.is_none());
    }

    #[test]
    fn test_delivery_before_pickup_is_rejected() {
        let sm = machine();
        let mut shipment = draft("GBO1");
        for t in &all_transitions()[..6] {
            sm.apply(&mut shipment, *t, now()).unwrap();
        }
        assert!(sm
            .apply(&mut shipment, ShipmentTransition::Deliver(d(2018, 6, 11)), now())
            .is_err());
        assert_eq!(shipment.status, ShipmentStatus::InTransit);
    }

    #[test]
    fn test_available_transitions() {
        assert_eq!(available_transitions(ShipmentStatus::Draft), vec!["SUBMIT"]);
        assert_eq!(available_transitions(ShipmentStatus::Approved), vec!["PACK", "TRANSPORT"]);
        assert!(available_transitions(ShipmentStatus::Completed).is_empty());
    }
}
