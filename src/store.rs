use crate::dataset::Dataset;
use crate::model::RankingRecord;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Loads a per-year dataset. A missing file is an empty dataset.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    if !path.exists() {
        warn!(file = %path.display(), "dataset file not found; starting from empty dataset");
        return Ok(Dataset::default());
    }

    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read dataset {}", path.display()))?;
    let records = read_records(bytes.as_slice())
        .with_context(|| format!("failed to parse dataset {}", path.display()))?;
    debug!(file = %path.display(), records = records.len(), "dataset loaded");
    Ok(Dataset::from_records(records))
}

pub fn save_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create data directory {}", parent.display()))?;
    }

    let mut buffer = Vec::new();
    write_records(&mut buffer, dataset.records())?;
    std::fs::write(path, buffer)
        .with_context(|| format!("failed to write dataset {}", path.display()))?;
    Ok(())
}

pub fn read_records<R: Read>(mut reader: R) -> Result<Vec<RankingRecord>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes[..]);

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(body);

    let mut records = Vec::new();
    for (index, row) in csv_reader.deserialize::<CsvRow>().enumerate() {
        let row = row.with_context(|| format!("invalid csv row {}", index + 2))?;
        records.push(row.into());
    }
    Ok(records)
}

pub fn write_records<W: Write>(mut writer: W, records: &[RankingRecord]) -> Result<()> {
    writer.write_all(UTF8_BOM)?;
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    week: u32,
    rank: u32,
    player_name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    association: Option<String>,
    #[serde(default, deserialize_with = "lenient_points")]
    points: Option<u32>,
}

impl From<CsvRow> for RankingRecord {
    fn from(row: CsvRow) -> Self {
        RankingRecord {
            date: row.date,
            week: row.week,
            rank: row.rank,
            player_name: row.player_name,
            association: row.association,
            points: row.points,
        }
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}

/// Older files store points as floats (`12345.0`) when a column had gaps.
fn lenient_points<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    parse_points(&raw).map_err(serde::de::Error::custom)
}

fn parse_points(raw: &str) -> Result<Option<u32>, String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    if let Ok(value) = raw.parse::<u32>() {
        return Ok(Some(value));
    }
    match raw.parse::<f64>() {
        Ok(value) if value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 => {
            Ok(Some(value as u32))
        }
        _ => Err(format!("invalid points value {raw:?}")),
    }
}
