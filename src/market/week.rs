//! 주간 경계 계산 (월요일 ~ 일요일, UTC 기준)
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 월요일(week_start) ~ 일요일(week_end) 주간 구간
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekWindow {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
}

impl WeekWindow {
    /// 주어진 날짜가 속한 주. 일요일은 직전 월요일의 주에 속한다
    pub fn containing(date: NaiveDate) -> Self {
        let offset = i64::from(date.weekday().num_days_from_monday());
        let week_start = date - Duration::days(offset);
        Self {
            week_start,
            week_end: week_start + Duration::days(6),
        }
    }

    /// 현재 시각이 속한 주 (UTC 날짜 기준)
    pub fn current(now: DateTime<Utc>) -> Self {
        Self::containing(now.date_naive())
    }

    pub fn previous(&self) -> Self {
        Self::containing(self.week_start - Duration::days(7))
    }

    pub fn next(&self) -> Self {
        Self::containing(self.week_start + Duration::days(7))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.week_start <= date && date <= self.week_end
    }

    /// 주간 단위 advisory lock 키
    pub fn lock_key(&self) -> i64 {
        const NAMESPACE: i64 = 0x4853_4300_0000_0000;
        NAMESPACE | i64::from(self.week_start.num_days_from_ce())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_start_is_always_monday_and_end_six_days_later() {
        let mut day = date(2023, 12, 1);
        while day < date(2025, 3, 1) {
            let week = WeekWindow::containing(day);
            assert_eq!(week.week_start.weekday(), Weekday::Mon, "{day}");
            assert_eq!(week.week_end - week.week_start, Duration::days(6));
            assert!(week.contains(day));
            day += Duration::days(1);
        }
    }

    #[test]
    fn every_day_of_a_week_shares_the_same_start() {
        let monday = date(2024, 6, 3);
        for offset in 0..7 {
            let week = WeekWindow::containing(monday + Duration::days(offset));
            assert_eq!(week.week_start, monday);
            assert_eq!(week.week_end, date(2024, 6, 9));
        }
    }

    #[test]
    fn sunday_belongs_to_preceding_monday() {
        let week = WeekWindow::containing(date(2024, 6, 9));
        assert_eq!(week.week_start, date(2024, 6, 3));
    }

    #[test]
    fn current_uses_utc_calendar_date() {
        let sunday_late = Utc.with_ymd_and_hms(2024, 6, 9, 23, 59, 59).unwrap();
        let monday_early = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap();
        assert_eq!(WeekWindow::current(sunday_late).week_start, date(2024, 6, 3));
        assert_eq!(WeekWindow::current(monday_early).week_start, date(2024, 6, 10));
    }

    #[test]
    fn previous_and_next_step_by_one_week() {
        let week = WeekWindow::containing(date(2024, 1, 3));
        assert_eq!(week.previous().week_start, date(2023, 12, 25));
        assert_eq!(week.next().week_start, date(2024, 1, 8));
        assert_ne!(week.lock_key(), week.next().lock_key());
    }
}
