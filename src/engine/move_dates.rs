// ==========================================
// 家庭物品搬迁核心 - 搬迁日期排期引擎
// ==========================================
// 职责: 由目标搬迁日、授权重量、运输距离计算五段日期窗口
// 输入: 目标日期 + 重量 + 距离 + 报到日 + 工作日历 + 规则表
// 输出: MoveDateWindow
// 红线: 打包日只取工作日；提货、运输、送达不排除周末与假日
// 红线: 天数规则来自外部表（ConfigManager），不硬编码在算法里
// ==========================================

use crate::domain::move_dates::MoveDateWindow;
use crate::domain::units::{Miles, Pound};
use crate::engine::calendar::WorkCalendar;
use crate::engine::error::{EngineError, EngineResult};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// 向前寻找打包工作日的最大回溯天数
const MAX_PACK_LOOKBACK_DAYS: i64 = 366;

/// 单个阶段（打包 / 运输）允许的最大天数
pub const MAX_PHASE_DAYS: i64 = 366;

// ==========================================
// PackDaysTable - 重量 → 打包天数
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackDaysEntry {
    pub min_weight_lbs: i64,
    pub days: i64,
}

/// 阶梯表：取 min_weight_lbs <= 重量 的最高一档
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackDaysTable {
    pub entries: Vec<PackDaysEntry>,
}

impl Default for PackDaysTable {
    fn default() -> Self {
        let entries = [(0, 1), (4_000, 2), (10_000, 3), (16_000, 4)]
            .into_iter()
            .map(|(min_weight_lbs, days)| PackDaysEntry { min_weight_lbs, days })
            .collect();
        Self { entries }
    }
}

impl PackDaysTable {
    pub fn validate(&self) -> EngineResult<()> {
        if self.entries.is_empty() {
            return Err(EngineError::InvalidInput("打包天数表为空".to_string()));
        }
        if let Some(bad) = self.entries.iter().find(|e| e.days < 0 || e.min_weight_lbs < 0) {
            return Err(EngineError::InvalidInput(format!(
                "打包天数表存在负值: min_weight_lbs={}, days={}",
                bad.min_weight_lbs, bad.days
            )));
        }
        Ok(())
    }

    pub fn lookup(&self, weight: Pound) -> EngineResult<i64> {
        self.entries
            .iter()
            .filter(|e| e.min_weight_lbs <= weight.0)
            .max_by_key(|e| e.min_weight_lbs)
            .map(|e| e.days)
            .ok_or_else(|| EngineError::InvalidInput(format!("打包天数表未覆盖重量 {}", weight)))
    }
}

// ==========================================
// TransitDaysTable - 重量 × 距离 → 运输天数
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitDaysEntry {
    pub min_weight_lbs: i64,
    pub max_distance_miles: i64,
    pub days: i64,
}

/// 先按重量选档，再取 max_distance_miles >= 距离 的最小一行；
/// 超出该档最大距离时，每多 overflow_step_miles 英里加 overflow_days_per_step 天
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitDaysTable {
    pub entries: Vec<TransitDaysEntry>,
    pub overflow_step_miles: i64,
    pub overflow_days_per_step: i64,
}

impl Default for TransitDaysTable {
    fn default() -> Self {
        let light = [(250, 7), (500, 9), (1000, 11), (1500, 13), (2000, 15), (2500, 17), (3000, 19)];
        let heavy = [(250, 5), (500, 6), (1000, 8), (1500, 10), (2000, 12), (2500, 14), (3000, 16)];

        let mut entries = Vec::new();
        for (min_weight_lbs, rows) in [(0, light), (8_000, heavy)] {
            for (max_distance_miles, days) in rows {
                entries.push(TransitDaysEntry {
                    min_weight_lbs,
                    max_distance_miles,
                    days,
                });
            }
        }

        Self {
            entries,
            overflow_step_miles: 500,
            overflow_days_per_step: 2,
        }
    }
}

impl TransitDaysTable {
    pub fn validate(&self) -> EngineResult<()> {
        if self.entries.is_empty() {
            return Err(EngineError::InvalidInput("运输天数表为空".to_string()));
        }
        if self.entries.iter().any(|e| e.days < 0 || e.max_distance_miles <= 0) {
            return Err(EngineError::InvalidInput("运输天数表存在非法行".to_string()));
        }
        if self.overflow_days_per_step < 0 {
            return Err(EngineError::InvalidInput("超距加天数不能为负".to_string()));
        }
        Ok(())
    }

    pub fn lookup(&self, weight: Pound, distance: Miles) -> EngineResult<i64> {
        let tier = self
            .entries
            .iter()
            .filter(|e| e.min_weight_lbs <= weight.0)
            .map(|e| e.min_weight_lbs)
            .max()
            .ok_or_else(|| EngineError::InvalidInput(format!("运输天数表未覆盖重量 {}", weight)))?;

        let mut rows: Vec<&TransitDaysEntry> = self
            .entries
            .iter()
            .filter(|e| e.min_weight_lbs == tier)
            .collect();
        rows.sort_by_key(|e| e.max_distance_miles);

        if let Some(row) = rows.iter().find(|e| distance.0 <= e.max_distance_miles) {
            return Ok(row.days);
        }

        // 超出最大距离：按步长外推
        let last = rows
            .last()
            .ok_or_else(|| EngineError::InvalidInput("运输天数表为空".to_string()))?;
        if self.overflow_step_miles <= 0 {
            return Err(EngineError::InvalidInput(format!(
                "距离 {} 超出运输天数表上限 {}mi 且未配置外推步长",
                distance, last.max_distance_miles
            )));
        }
        let excess = distance.0 - last.max_distance_miles;
        let steps = excess / self.overflow_step_miles
            + i64::from(excess % self.overflow_step_miles != 0);
        steps
            .checked_mul(self.overflow_days_per_step)
            .and_then(|extra| extra.checked_add(last.days))
            .ok_or_else(|| EngineError::InvalidInput(format!("距离 {} 外推运输天数溢出", distance)))
    }
}

// ==========================================
// MoveDateScheduler - 排期引擎
// ==========================================
pub struct MoveDateScheduler {
    calendar: WorkCalendar,
    pack_days: PackDaysTable,
    transit_days: TransitDaysTable,
}

impl MoveDateScheduler {
    pub fn new(calendar: WorkCalendar, pack_days: PackDaysTable, transit_days: TransitDaysTable) -> Self {
        Self {
            calendar,
            pack_days,
            transit_days,
        }
    }

    pub fn calendar(&self) -> &WorkCalendar {
        &self.calendar
    }

    /// 计算打包天数
    pub fn num_pack_days(&self, weight: Pound) -> EngineResult<i64> {
        self.pack_days.lookup(weight)
    }

    /// 计算运输天数
    pub fn num_transit_days(&self, weight: Pound, distance: Miles) -> EngineResult<i64> {
        self.transit_days.lookup(weight, distance)
    }

    /// 计算五段日期窗口
    ///
    /// # 参数
    /// - `target_move_date`: 目标搬迁日（即提货日）
    /// - `entitlement_weight`: 授权重量，必须 > 0
    /// - `transit_distance`: 运输距离，必须 > 0
    /// - `report_by_date`: 报到日，原样放入报到窗口
    ///
    /// # 错误
    /// - `EngineError::InvalidInput`: 重量或距离非正、规则表未覆盖、日历找不到足够工作日
    #[instrument(skip_all, fields(target = %target_move_date, weight = %entitlement_weight, distance = %transit_distance))]
    pub fn calculate(
        &self,
        target_move_date: NaiveDate,
        entitlement_weight: Pound,
        transit_distance: Miles,
        report_by_date: NaiveDate,
    ) -> EngineResult<MoveDateWindow> {
        if entitlement_weight.0 <= 0 {
            return Err(EngineError::InvalidInput(format!(
                "授权重量必须为正: {}",
                entitlement_weight
            )));
        }
        if transit_distance.0 <= 0 {
            return Err(EngineError::InvalidInput(format!(
                "运输距离必须为正: {}",
                transit_distance
            )));
        }

        let num_pack_days = self.num_pack_days(entitlement_weight)?;
        let num_transit_days = self.num_transit_days(entitlement_weight, transit_distance)?;
        debug!(num_pack_days, num_transit_days, "排期天数");
        for (phase, days) in [("打包", num_pack_days), ("运输", num_transit_days)] {
            if !(0..=MAX_PHASE_DAYS).contains(&days) {
                return Err(EngineError::InvalidInput(format!(
                    "{}天数 {} 超出范围 0..={}",
                    phase, days, MAX_PHASE_DAYS
                )));
            }
        }

        // 1. 打包：从目标日前一天倒推，只收工作日，结果升序
        let mut pack_days = Vec::with_capacity(num_pack_days as usize);
        let mut cursor = target_move_date;
        let mut looked_back = 0;
        while (pack_days.len() as i64) < num_pack_days {
            cursor -= Duration::days(1);
            looked_back += 1;
            if looked_back > MAX_PACK_LOOKBACK_DAYS {
                return Err(EngineError::InvalidInput(format!(
                    "{} 之前 {} 天内找不到 {} 个工作日",
                    target_move_date, MAX_PACK_LOOKBACK_DAYS, num_pack_days
                )));
            }
            if self.calendar.is_workday(cursor) {
                pack_days.push(cursor);
            }
        }
        pack_days.reverse();

        // 2. 提货：目标日当天
        let pickup_days = vec![target_move_date];

        // 3. 运输：提货次日起连续自然日
        let transit_days: Vec<NaiveDate> = (1..=num_transit_days)
            .map(|offset| target_move_date + Duration::days(offset))
            .collect();

        // 4. 送达：最后一个运输日（无运输日则为提货日）的次日
        let last_before_delivery = transit_days.last().copied().unwrap_or(target_move_date);
        let delivery_days = vec![last_before_delivery + Duration::days(1)];

        // 5. 报到：原样
        let report_days = vec![report_by_date];

        Ok(MoveDateWindow {
            pack_days,
            pickup_days,
            transit_days,
            delivery_days,
            report_days,
        })
    }
}
