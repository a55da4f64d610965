use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of a weekly ranking snapshot, as persisted in the per-year CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingRecord {
    pub date: NaiveDate,
    pub week: u32,
    pub rank: u32,
    pub player_name: String,
    pub association: Option<String>,
    pub points: Option<u32>,
}

/// Identity of a single weekly publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Snapshot {
    pub week: u32,
    pub date: NaiveDate,
}

impl Snapshot {
    pub fn record(
        &self,
        rank: u32,
        player_name: String,
        association: Option<String>,
        points: Option<u32>,
    ) -> RankingRecord {
        RankingRecord {
            date: self.date,
            week: self.week,
            rank,
            player_name,
            association,
            points,
        }
    }
}

/// A ranking record plus the fields derived for the dashboard.
#[derive(Debug, Clone)]
pub struct DashboardRow {
    pub record: RankingRecord,
    pub clean_name: String,
    pub is_tracked: bool,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreakPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl StreakPeriod {
    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreakSummary {
    pub periods: Vec<StreakPeriod>,
    /// Distinct snapshot dates, reported as "weeks held".
    pub snapshots: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    pub source_key: String,
    pub year: i32,
    pub weeks_requested: usize,
    pub weeks_skipped: usize,
    pub pages_fetched: usize,
    pub pages_unavailable: usize,
    pub transport_errors: usize,
    pub records_parsed: usize,
    pub records_added: usize,
    pub total_records: usize,
}
