// ==========================================
// 家庭物品搬迁核心 - 工作日历
// ==========================================
// 职责: 判定某日是否为工作日（排除周末与联邦假日）
// 红线: 纯函数，只依赖日期本身与构造时给定的额外假日
// ==========================================
// 联邦假日: 元旦、马丁路德金日、总统日、阵亡将士纪念日、
//           六月节(2021 起)、独立日、劳动节、哥伦布日、
//           退伍军人节、感恩节、圣诞节
// 观察日: 落在周六前移到周五，落在周日顺延到周一
// ==========================================

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct WorkCalendar {
    observe_weekend_holidays: bool,
    extra_holidays: BTreeSet<NaiveDate>,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self::new(true, Vec::new())
    }
}

impl WorkCalendar {
    /// # 参数
    /// - `observe_weekend_holidays`: 周末假日是否顺延/前移到工作日
    /// - `extra_holidays`: 额外的非工作日（如临时停工日）
    pub fn new(observe_weekend_holidays: bool, extra_holidays: Vec<NaiveDate>) -> Self {
        Self {
            observe_weekend_holidays,
            extra_holidays: extra_holidays.into_iter().collect(),
        }
    }

    pub fn is_weekend(date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        if self.extra_holidays.contains(&date) {
            return true;
        }
        // 12 月 31 日可能是次年元旦的观察日
        let years = [date.year(), date.year() + 1];
        years
            .iter()
            .flat_map(|&y| federal_holidays(y))
            .any(|holiday| self.observed(holiday) == date)
    }

    /// 工作日 = 非周末且非假日
    pub fn is_workday(&self, date: NaiveDate) -> bool {
        !Self::is_weekend(date) && !self.is_holiday(date)
    }

    /// 某年的全部假日（按观察日，升序）
    pub fn holidays_in_year(&self, year: i32) -> Vec<NaiveDate> {
        let days: BTreeSet<NaiveDate> = [year - 1, year, year + 1]
            .iter()
            .flat_map(|&y| federal_holidays(y))
            .map(|h| self.observed(h))
            .chain(self.extra_holidays.iter().copied())
            .filter(|d| d.year() == year)
            .collect();
        days.into_iter().collect()
    }

    fn observed(&self, holiday: NaiveDate) -> NaiveDate {
        if !self.observe_weekend_holidays {
            return holiday;
        }
        match holiday.weekday() {
            Weekday::Sat => holiday - Duration::days(1),
            Weekday::Sun => holiday + Duration::days(1),
            _ => holiday,
        }
    }
}

/// 某年的联邦假日（法定日期，未做观察日调整）
fn federal_holidays(year: i32) -> Vec<NaiveDate> {
    let fixed = |month: u32, day: u32| NaiveDate::from_ymd_opt(year, month, day);
    let mut days = vec![
        fixed(1, 1),                                  // 元旦
        nth_weekday(year, 1, Weekday::Mon, 3),        // 马丁路德金日
        nth_weekday(year, 2, Weekday::Mon, 3),        // 总统日
        last_weekday(year, 5, Weekday::Mon),          // 阵亡将士纪念日
        fixed(7, 4),                                  // 独立日
        nth_weekday(year, 9, Weekday::Mon, 1),        // 劳动节
        nth_weekday(year, 10, Weekday::Mon, 2),       // 哥伦布日
        fixed(11, 11),                                // 退伍军人节
        nth_weekday(year, 11, Weekday::Thu, 4),       // 感恩节
        fixed(12, 25),                                // 圣诞节
    ];
    if year >= 2021 {
        days.push(fixed(6, 19)); // 六月节
    }
    days.into_iter().flatten().collect()
}

/// 某月第 n 个指定星期几
fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n as u8)
}

/// 某月最后一个指定星期几
fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let mut day = first_of_next - Duration::days(1);
    while day.weekday() != weekday {
        day -= Duration::days(1);
    }
    Some(day)
}
