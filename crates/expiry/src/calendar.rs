//! Expiry date arithmetic

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Computes weekly, monthly, and far-month expiries for one underlying
#[derive(Debug, Clone)]
pub struct ExpiryCalendar {
    /// Weekday contracts settle on
    settlement_day: Weekday,
    holidays: Vec<NaiveDate>,
}

impl ExpiryCalendar {
    pub fn new(settlement_day: Weekday, holidays: Vec<NaiveDate>) -> Self {
        Self {
            settlement_day,
            holidays,
        }
    }

    /// NIFTY-style calendar: Thursday settlement, no holidays
    pub fn weekly_thursday() -> Self {
        Self::new(Weekday::Thu, Vec::new())
    }

    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// Move an expiry back to the previous trading day while it sits on
    /// a holiday or weekend
    fn adjust(&self, mut date: NaiveDate) -> NaiveDate {
        while self.is_holiday(date)
            || date.weekday() == Weekday::Sat
            || date.weekday() == Weekday::Sun
        {
            date -= Duration::days(1);
        }
        date
    }

    /// Next weekly expiry on or after `from`
    pub fn next_weekly(&self, from: NaiveDate) -> NaiveDate {
        let mut date = from;
        while date.weekday() != self.settlement_day {
            date += Duration::days(1);
        }
        let adjusted = self.adjust(date);
        if adjusted < from {
            // Holiday adjustment pulled it before `from`; take next week's
            return self.next_weekly(date + Duration::days(1));
        }
        adjusted
    }

    /// Weekly expiry strictly after the given expiry
    pub fn weekly_after(&self, expiry: NaiveDate) -> NaiveDate {
        self.next_weekly(expiry + Duration::days(1))
    }

    /// Monthly expiry: last settlement weekday of the month, adjusted
    pub fn monthly(&self, year: i32, month: u32) -> Option<NaiveDate> {
        let first_next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        let mut date = first_next - Duration::days(1);
        while date.weekday() != self.settlement_day {
            date -= Duration::days(1);
        }
        Some(self.adjust(date))
    }

    /// Upcoming monthly expiries on or after `from`
    pub fn upcoming_monthlies(&self, from: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let mut result = Vec::with_capacity(count);
        let mut year = from.year();
        let mut month = from.month();
        while result.len() < count {
            if let Some(expiry) = self.monthly(year, month) {
                if expiry >= from {
                    result.push(expiry);
                }
            }
            month += 1;
            if month > 12 {
                month = 1;
                year += 1;
            }
        }
        result
    }

    /// The far-month expiry: `index` into the upcoming monthly list
    pub fn far_month(&self, from: NaiveDate, index: usize) -> Option<NaiveDate> {
        self.upcoming_monthlies(from, index + 1).get(index).copied()
    }
}
