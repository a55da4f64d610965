use crate::model::{StreakPeriod, StreakSummary};
use chrono::{Duration, NaiveDate};

/// Groups sorted, distinct rank-1 dates into runs of consecutive days.
///
/// `snapshots` counts the dates themselves, so weekly snapshots each open
/// their own period while still adding one "week held".
pub fn rank_one_streaks(dates: &[NaiveDate]) -> StreakSummary {
    let Some((first, rest)) = dates.split_first() else {
        return StreakSummary::default();
    };

    let mut periods = Vec::new();
    let mut current = StreakPeriod {
        start: *first,
        end: *first,
    };
    for date in rest {
        if *date - current.end == Duration::days(1) {
            current.end = *date;
        } else {
            periods.push(current);
            current = StreakPeriod {
                start: *date,
                end: *date,
            };
        }
    }
    periods.push(current);

    StreakSummary {
        periods,
        snapshots: dates.len(),
    }
}

pub fn describe_period(index: usize, period: &StreakPeriod) -> String {
    if period.is_single_day() {
        format!("#{index}: {}", period.start.format("%Y-%m-%d"))
    } else {
        format!(
            "#{index}: {} to {}",
            period.start.format("%Y-%m-%d"),
            period.end.format("%Y-%m-%d")
        )
    }
}
