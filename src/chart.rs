use crate::config::DashboardConfig;
use crate::model::DashboardRow;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Animated ranked-bar chart description handed to an external renderer.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub x_range: [f64; 2],
    pub y_range: [f64; 2],
    pub color_map: BTreeMap<String, String>,
    pub frame_duration_ms: u64,
    pub transition_duration_ms: u64,
    pub frames: Vec<ChartFrame>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartFrame {
    pub date: NaiveDate,
    pub bars: Vec<ChartBar>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartBar {
    pub rank: u32,
    pub points: Option<u32>,
    pub player_name: String,
    pub association: Option<String>,
    pub color: String,
}

/// One frame per date, bars in rank order. Rows must already be sorted by
/// (date, rank).
pub fn assemble_chart(rows: &[DashboardRow], config: &DashboardConfig) -> ChartSpec {
    let mut frames: Vec<ChartFrame> = Vec::new();
    for row in rows {
        let bar = ChartBar {
            rank: row.record.rank,
            points: row.record.points,
            player_name: row.record.player_name.clone(),
            association: row.record.association.clone(),
            color: row.color.clone(),
        };
        match frames.last_mut() {
            Some(frame) if frame.date == row.record.date => frame.bars.push(bar),
            _ => frames.push(ChartFrame {
                date: row.record.date,
                bars: vec![bar],
            }),
        }
    }

    let max_points = rows
        .iter()
        .filter_map(|row| row.record.points)
        .max()
        .unwrap_or(0);

    let title = config.chart.title.clone().unwrap_or_else(|| {
        match (frames.first(), frames.last()) {
            (Some(first), Some(last)) => format!(
                "Women's world ranking ({}–{})",
                first.date.format("%Y-%m-%d"),
                last.date.format("%Y-%m-%d")
            ),
            _ => "Women's world ranking".to_string(),
        }
    });

    let color_map = BTreeMap::from([
        (
            config.tracked_player.clone(),
            config.chart.tracked_color.clone(),
        ),
        (
            config.others_label.clone(),
            config.chart.others_color.clone(),
        ),
    ]);

    ChartSpec {
        title,
        x_range: [0.5, config.max_rank as f64 + 0.5],
        y_range: [0.0, max_points as f64 * 1.1],
        color_map,
        frame_duration_ms: config.chart.frame_duration_ms,
        transition_duration_ms: config.chart.transition_duration_ms,
        frames,
    }
}
