// ==========================================
// 家庭物品搬迁核心 - 搬迁日期窗口
// ==========================================
// 纯派生数据，本核心不持久化
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 五段有序、互不重叠的日期序列（均按时间升序）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveDateWindow {
    pub pack_days: Vec<NaiveDate>,
    pub pickup_days: Vec<NaiveDate>,
    pub transit_days: Vec<NaiveDate>,
    pub delivery_days: Vec<NaiveDate>,
    pub report_days: Vec<NaiveDate>,
}

impl MoveDateWindow {
    /// 搬运阶段（打包→送达）的全部日期，按阶段顺序
    pub fn movement_dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.pack_days
            .iter()
            .chain(self.pickup_days.iter())
            .chain(self.transit_days.iter())
            .chain(self.delivery_days.iter())
    }

    pub fn last_pack_day(&self) -> Option<NaiveDate> {
        self.pack_days.last().copied()
    }

    pub fn pickup_day(&self) -> Option<NaiveDate> {
        self.pickup_days.first().copied()
    }

    pub fn delivery_day(&self) -> Option<NaiveDate> {
        self.delivery_days.first().copied()
    }
}
