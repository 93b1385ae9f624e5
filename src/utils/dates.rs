//! Calendar helpers for weekly runs, payment days and document formatting

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Day of month on which vendor bills are paid
pub const PAYMENT_DAY: u32 = 25;

/// The reporting week of a run: the 7 days before the run date
pub fn reporting_week(run_date: NaiveDate) -> (NaiveDate, NaiveDate) {
    (run_date - Duration::days(7), run_date - Duration::days(1))
}

/// The first Monday strictly after `date`
pub fn next_monday(date: NaiveDate) -> NaiveDate {
    let ahead = 7 - date.weekday().num_days_from_monday() as i64;
    date + Duration::days(ahead)
}

/// The next Monday at `time` that is not before `now`
pub fn next_scheduled_run(now: NaiveDateTime, time: NaiveTime) -> NaiveDateTime {
    let today = now.date();
    if today.weekday() == Weekday::Mon && now.time() <= time {
        return today.and_time(time);
    }
    next_monday(today).and_time(time)
}

/// Every Monday in `[start, end]`, in order
pub fn mondays_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut current = if start.weekday() == Weekday::Mon {
        start
    } else {
        next_monday(start)
    };
    let mut mondays = Vec::new();
    while current <= end {
        mondays.push(current);
        current += Duration::days(7);
    }
    mondays
}

/// The payment day of the month containing `date`
pub fn payment_day_of_month(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), PAYMENT_DAY)
}

/// The payment day falling inside `[start, end]`, if any
pub fn week_contains_payment_day(start: NaiveDate, end: NaiveDate) -> Option<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .find(|d| d.day() == PAYMENT_DAY)
}

/// First day of the month before the one containing `date`
pub fn previous_month_start(date: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if date.month() == 1 {
        (date.year() - 1, 12)
    } else {
        (date.year(), date.month() - 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// First day of the month after the one containing `date`
pub fn next_month_start(date: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Calendar months touched by `[start, end]`, both endpoints included
pub fn months_spanned(start: NaiveDate, end: NaiveDate) -> u32 {
    let months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32 + 1;
    months.max(0) as u32
}

/// Indian document date, e.g. `06 Jan 2026`
pub fn format_indian_date(date: NaiveDate) -> String {
    date.format("%d %b %Y").to_string()
}

/// Service period label, e.g. `01 Jan 2026 – 01 Apr 2026`
pub fn format_service_period(start: NaiveDate, end: NaiveDate) -> String {
    format!("{} – {}", format_indian_date(start), format_indian_date(end))
}

/// Month label used in bill descriptions, e.g. `February 2026`
pub fn format_month_year(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_next_scheduled_run() {
        let ten = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let at = |date: NaiveDate, h: u32| date.and_hms_opt(h, 0, 0).unwrap();

        assert_eq!(next_scheduled_run(at(d(2026, 1, 5), 9), ten), at(d(2026, 1, 5), 10));
        assert_eq!(next_scheduled_run(at(d(2026, 1, 5), 11), ten), at(d(2026, 1, 12), 10));
        assert_eq!(next_scheduled_run(at(d(2026, 1, 8), 9), ten), at(d(2026, 1, 12), 10));
    }

    #[test]
    fn test_next_monday() {
        assert_eq!(next_monday(d(2026, 1, 5)), d(2026, 1, 12));
        assert_eq!(next_monday(d(2026, 1, 7)), d(2026, 1, 12));
        assert_eq!(next_monday(d(2026, 1, 11)), d(2026, 1, 12));
    }

    #[test]
    fn test_mondays_in_range() {
        let mondays = mondays_in_range(d(2026, 1, 1), d(2026, 1, 31));
        assert_eq!(
            mondays,
            vec![d(2026, 1, 5), d(2026, 1, 12), d(2026, 1, 19), d(2026, 1, 26)]
        );
        assert!(mondays_in_range(d(2026, 1, 6), d(2026, 1, 11)).is_empty());
    }

    #[test]
    fn test_week_contains_payment_day() {
        assert_eq!(
            week_contains_payment_day(d(2026, 1, 19), d(2026, 1, 25)),
            Some(d(2026, 1, 25))
        );
        assert_eq!(week_contains_payment_day(d(2026, 1, 5), d(2026, 1, 11)), None);
    }

    #[test]
    fn test_month_boundaries() {
        assert_eq!(previous_month_start(d(2026, 1, 25)), Some(d(2025, 12, 1)));
        assert_eq!(next_month_start(d(2025, 12, 14)), Some(d(2026, 1, 1)));
        assert_eq!(payment_day_of_month(d(2026, 2, 3)), Some(d(2026, 2, 25)));
    }

    #[test]
    fn test_months_spanned() {
        assert_eq!(months_spanned(d(2026, 1, 1), d(2026, 4, 1)), 4);
        assert_eq!(months_spanned(d(2025, 11, 20), d(2026, 1, 5)), 3);
        assert_eq!(months_spanned(d(2026, 1, 1), d(2026, 1, 31)), 1);
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_indian_date(d(2026, 1, 6)), "06 Jan 2026");
        assert_eq!(
            format_service_period(d(2026, 1, 1), d(2026, 4, 1)),
            "01 Jan 2026 – 01 Apr 2026"
        );
        assert_eq!(format_month_year(d(2026, 2, 1)), "February 2026");
    }
}
