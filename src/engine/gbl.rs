// ==========================================
// 家庭物品搬迁核心 - GBL 号分配
// ==========================================
// 格式: <GBLOC><2 位财年><7 位补零序号>，例: GBO1 + 18 + 0000001
// 财年: 10 月 1 日起算入下一财年
// 红线: 序号的递增与读取由 GblSequencer 原子完成，引擎不持有计数状态
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{Datelike, NaiveDate};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::engine::error::{EngineError, EngineResult};

/// 序号位数
pub const GBL_SEQUENCE_WIDTH: usize = 7;

/// 序号上限（7 位）
pub const GBL_SEQUENCE_MAX: i64 = 9_999_999;

// ==========================================
// GblSequencer - 持久化序号源
// ==========================================

/// 按 (GBLOC, 财年) 原子递增的序号源
///
/// 由仓储层实现；实现方必须保证并发调用不会返回重复值
pub trait GblSequencer: Send + Sync {
    /// 递增并返回新序号（首次调用返回 1）
    fn next_sequence(&self, gbloc: &str, fiscal_year: i32) -> RepositoryResult<i64>;
}

/// 日期所属财年
pub fn fiscal_year(date: NaiveDate) -> i32 {
    if date.month() >= 10 {
        date.year() + 1
    } else {
        date.year()
    }
}

/// 拼装 GBL 号
pub fn format_gbl_number(gbloc: &str, fiscal_year: i32, sequence: i64) -> String {
    format!(
        "{}{:02}{:0width$}",
        gbloc,
        fiscal_year.rem_euclid(100),
        sequence,
        width = GBL_SEQUENCE_WIDTH
    )
}

// ==========================================
// GblNumberAssigner - GBL 号分配器
// ==========================================
pub struct GblNumberAssigner {
    sequencer: Arc<dyn GblSequencer>,
}

impl GblNumberAssigner {
    pub fn new(sequencer: Arc<dyn GblSequencer>) -> Self {
        Self { sequencer }
    }

    /// 为 GBLOC 分配下一个 GBL 号
    ///
    /// # 参数
    /// - `gbloc`: 起运地会计办公室代码（字母数字，不区分大小写）
    /// - `as_of`: 决定财年的日期
    ///
    /// # 错误
    /// - `EngineError::InvalidInput`: GBLOC 为空或含非法字符
    /// - `EngineError::GblSequenceExhausted`: 序号超过 7 位
    /// - `EngineError::ConcurrencyConflict`: 序号源锁等待超时
    #[instrument(skip(self))]
    pub fn assign(&self, gbloc: &str, as_of: NaiveDate) -> EngineResult<String> {
        let gbloc = normalize_gbloc(gbloc)?;
        let fy = fiscal_year(as_of);

        let sequence = self
            .sequencer
            .next_sequence(&gbloc, fy)
            .map_err(|e| match e {
                // 并发递增等锁超时
                RepositoryError::DatabaseQueryError(msg)
                    if msg.contains("database is locked") || msg.contains("busy") =>
                {
                    EngineError::ConcurrencyConflict(format!("GBL 序号递增冲突 {}/{}: {}", gbloc, fy, msg))
                }
                other => other.into(),
            })?;
        if !(1..=GBL_SEQUENCE_MAX).contains(&sequence) {
            return Err(EngineError::GblSequenceExhausted {
                gbloc,
                fiscal_year: fy,
                sequence,
            });
        }

        let gbl_number = format_gbl_number(&gbloc, fy, sequence);
        info!(gbl_number = %gbl_number, "分配 GBL 号");
        Ok(gbl_number)
    }
}

fn normalize_gbloc(gbloc: &str) -> EngineResult<String> {
    let trimmed = gbloc.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput("GBLOC 不能为空".to_string()));
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(EngineError::InvalidInput(format!("GBLOC 含非法字符: {}", trimmed)));
    }
    Ok(trimmed.to_ascii_uppercase())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// 内存序号源（测试用）
    #[derive(Default)]
    pub(crate) struct InMemorySequencer {
        counters: Mutex<HashMap<(String, i32), i64>>,
    }

    impl GblSequencer for InMemorySequencer {
        fn next_sequence(&self, gbloc: &str, fiscal_year: i32) -> RepositoryResult<i64> {
            let mut counters = self.counters.lock().unwrap();
            let counter = counters.entry((gbloc.to_string(), fiscal_year)).or_insert(0);
            *counter += 1;
            Ok(*counter)
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_fiscal_year_starts_in_october() {
        assert_eq!(fiscal_year(d(2018, 9, 30)), 2018);
        assert_eq!(fiscal_year(d(2018, 10, 1)), 2019);
    }

    #[test]
    fn test_sequence_increases_per_gbloc() {
        let assigner = GblNumberAssigner::new(Arc::new(InMemorySequencer::default()));
        let day = d(2018, 6, 1);

        let numbers: Vec<String> = (0..3).map(|_| assigner.assign("GBO1", day).unwrap()).collect();
        assert_eq!(numbers, vec!["GBO1180000001", "GBO1180000002", "GBO1180000003"]);

        // 其他 GBLOC 独立从 1 开始
        assert_eq!(assigner.assign("kkfa", day).unwrap(), "KKFA180000001");
    }

    #[test]
    fn test_new_fiscal_year_restarts_sequence() {
        let assigner = GblNumberAssigner::new(Arc::new(InMemorySequencer::default()));
        assert_eq!(assigner.assign("GBO1", d(2018, 9, 30)).unwrap(), "GBO1180000001");
        assert_eq!(assigner.assign("GBO1", d(2018, 10, 1)).unwrap(), "GBO1190000001");
    }

    #[test]
    fn test_blank_gbloc_is_rejected() {
        let assigner = GblNumberAssigner::new(Arc::new(InMemorySequencer::default()));
        assert!(matches!(
            assigner.assign("  ", d(2018, 6, 1)),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            assigner.assign("GB-1", d(2018, 6, 1)),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_exhausted_sequence() {
        struct Full;
        impl GblSequencer for Full {
            fn next_sequence(&self, _: &str, _: i32) -> RepositoryResult<i64> {
                Ok(GBL_SEQUENCE_MAX + 1)
            }
        }
        let assigner = GblNumberAssigner::new(Arc::new(Full));
        assert!(matches!(
            assigner.assign("GBO1", d(2018, 6, 1)),
            Err(EngineError::GblSequenceExhausted { .. })
        ));
    }

    #[test]
    fn test_locked_sequencer_is_concurrency_conflict() {
        struct Locked;
        impl GblSequencer for Locked {
            fn next_sequence(&self, _: &str, _: i32) -> RepositoryResult<i64> {
                Err(RepositoryError::DatabaseQueryError("database is locked".to_string()))
            }
        }
        let assigner = GblNumberAssigner::new(Arc::new(Locked));
        assert!(matches!(
            assigner.assign("GBO1", d(2018, 6, 1)),
            Err(EngineError::ConcurrencyConflict(_))
        ));
    }
}
