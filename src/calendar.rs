use chrono::{Datelike, Duration, NaiveDate};

/// Publish date of the ranking for `week` of `year`.
///
/// Week 1 starts on the Monday on or before January 4; rankings go out the
/// following Tuesday. Weeks past 52 roll into the next year unchecked.
pub fn release_date(year: i32, week: u32) -> Option<NaiveDate> {
    let jan_4 = NaiveDate::from_ymd_opt(year, 1, 4)?;
    let monday_week1 = jan_4.checked_sub_signed(Duration::days(
        jan_4.weekday().num_days_from_monday() as i64,
    ))?;
    let target_monday =
        monday_week1.checked_add_signed(Duration::weeks(week as i64 - 1))?;
    target_monday.checked_add_signed(Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    #[test]
    fn week_one_is_tuesday_after_iso_monday() {
        // 2021-01-04 is a Monday.
        assert_eq!(
            release_date(2021, 1),
            NaiveDate::from_ymd_opt(2021, 1, 5)
        );
        // 2026-01-04 is a Sunday, so week 1 starts 2025-12-29.
        assert_eq!(
            release_date(2026, 1),
            NaiveDate::from_ymd_opt(2025, 12, 30)
        );
    }

    #[test]
    fn every_week_lands_on_tuesday() {
        for year in 2019..=2027 {
            for week in 1..=53 {
                let date = release_date(year, week).unwrap();
                assert_eq!(date.weekday(), Weekday::Tue, "{year} w{week}");
            }
        }
    }

    #[test]
    fn week_53_rolls_into_next_year() {
        let date = release_date(2024, 53).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        let date = release_date(2023, 53).unwrap();
        assert_eq!(date.year(), 2024);
    }
}
