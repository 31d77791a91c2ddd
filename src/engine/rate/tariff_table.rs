// ==========================================
// 运价来源与内存运价表
// ==========================================
// TariffSource: 引擎读取运价的唯一入口（仓储层或内存快照实现）
// TariffTable: 不可变快照，构造时校验同键同区间的生效窗口互不重叠
// ==========================================

use crate::domain::tariff::{TariffKey, TariffRateRecord};
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::error::RepositoryResult;
use chrono::NaiveDate;
use std::collections::HashMap;

/// 运价来源
pub trait TariffSource: Send + Sync {
    /// 返回 key 在 as_of 当日生效的全部记录（Zip3 映射不受日期限制）
    fn fetch_tariff_records(
        &self,
        key: &TariffKey,
        as_of: NaiveDate,
    ) -> RepositoryResult<Vec<TariffRateRecord>>;
}

/// 校验一批记录：窗口非空；同一区间键下窗口两两不重叠
pub fn validate_non_overlapping(records: &[TariffRateRecord]) -> EngineResult<()> {
    let mut by_bracket: HashMap<String, Vec<&TariffRateRecord>> = HashMap::new();

    for record in records {
        if let Some(window) = record.window() {
            if window.is_empty() {
                return Err(EngineError::InvalidInput(format!(
                    "生效区间为空: {} {}",
                    record.bracket_key(),
                    window
                )));
            }
        }
        by_bracket.entry(record.bracket_key()).or_default().push(record);
    }

    for (bracket, group) in &by_bracket {
        for (i, a) in group.iter().enumerate() {
            for b in &group[i + 1..] {
                let overlap = match (a.window(), b.window()) {
                    (Some(wa), Some(wb)) => wa.overlaps(&wb),
                    // 无日期记录（Zip3）重复即冲突
                    _ => true,
                };
                if overlap {
                    return Err(EngineError::OverlappingTariff(format!(
                        "{}: {:?} 与 {:?}",
                        bracket,
                        a.window(),
                        b.window()
                    )));
                }
            }
        }
    }

    Ok(())
}

// ==========================================
// TariffTable - 内存运价表
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct TariffTable {
    records: HashMap<TariffKey, Vec<TariffRateRecord>>,
}

impl TariffTable {
    /// 构造快照
    ///
    /// # 错误
    /// - `EngineError::OverlappingTariff`: 同一区间键存在重叠窗口
    /// - `EngineError::InvalidInput`: 存在空窗口
    pub fn new(records: Vec<TariffRateRecord>) -> EngineResult<Self> {
        validate_non_overlapping(&records)?;
        let mut by_key: HashMap<TariffKey, Vec<TariffRateRecord>> = HashMap::new();
        for record in records {
            by_key.entry(record.key()).or_default().push(record);
        }
        Ok(Self { records: by_key })
    }

    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn records_for(&self, key: &TariffKey) -> &[TariffRateRecord] {
        self.records.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl TariffSource for TariffTable {
    fn fetch_tariff_records(
        &self,
        key: &TariffKey,
        as_of: NaiveDate,
    ) -> RepositoryResult<Vec<TariffRateRecord>> {
        Ok(self
            .records_for(key)
            .iter()
            .filter(|r| r.is_effective_on(as_of))
            .cloned()
            .collect())
    }
}
