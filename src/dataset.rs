use crate::config::DashboardConfig;
use crate::model::{DashboardRow, RankingRecord, Snapshot};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

static PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(.*?\)").expect("parenthetical regex is valid"));

/// Ranking records ordered by (date, rank) with at most one record per
/// (date, rank).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    records: Vec<RankingRecord>,
}

impl Dataset {
    /// Normalises arbitrary records: first occurrence of each (date, rank)
    /// wins, then sorted.
    pub fn from_records(records: Vec<RankingRecord>) -> Self {
        let mut seen = HashSet::new();
        let mut records = records
            .into_iter()
            .filter(|record| seen.insert((record.date, record.rank)))
            .collect::<Vec<_>>();
        records.sort_by_key(|record| (record.date, record.rank));
        Self { records }
    }

    /// Folds `batch` into this dataset. Existing rows win on (date, rank)
    /// collisions.
    pub fn merge<I>(&self, batch: I) -> Self
    where
        I: IntoIterator<Item = RankingRecord>,
    {
        let combined = self.records.iter().cloned().chain(batch).collect();
        Self::from_records(combined)
    }

    pub fn contains_snapshot(&self, snapshot: &Snapshot) -> bool {
        self.records
            .iter()
            .any(|record| record.week == snapshot.week && record.date == snapshot.date)
    }

    pub fn records(&self) -> &[RankingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn retain_max_rank(self, max_rank: u32) -> Self {
        Self {
            records: self
                .records
                .into_iter()
                .filter(|record| record.rank <= max_rank)
                .collect(),
        }
    }
}

/// Strips every parenthetical group, e.g. `SUN Yingsha (CHN)` → `SUN Yingsha`.
pub fn clean_name(player_name: &str) -> String {
    PARENTHETICAL.replace_all(player_name, "").trim().to_string()
}

/// Dataset rows annotated for the dashboard, in dataset order.
pub fn dashboard_rows(dataset: &Dataset, config: &DashboardConfig) -> Vec<DashboardRow> {
    dataset
        .records()
        .iter()
        .map(|record| {
            let clean_name = clean_name(&record.player_name);
            let is_tracked = clean_name == config.tracked_player;
            let color = if is_tracked {
                config.tracked_player.clone()
            } else {
                config.others_label.clone()
            };
            DashboardRow {
                record: record.clone(),
                clean_name,
                is_tracked,
                color,
            }
        })
        .collect()
}

/// Sorted distinct dates on which the tracked player held rank 1.
pub fn rank_one_dates(rows: &[DashboardRow]) -> Vec<NaiveDate> {
    rows.iter()
        .filter(|row| row.is_tracked && row.record.rank == 1)
        .map(|row| row.record.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
