use crate::calendar::release_date;
use crate::chart::{ChartSpec, assemble_chart};
use crate::config::{
    DashboardConfig, find_source, load_dashboard_config, load_source_file, load_sources_from_dir,
};
use crate::dataset::{Dataset, dashboard_rows, rank_one_dates};
use crate::fetch::{FetchOutcome, PageFetcher};
use crate::model::{CrawlReport, DashboardRow, Snapshot, StreakPeriod};
use crate::parser::{PageParse, parse_document};
use crate::store::{load_dataset, save_dataset};
use crate::streak::{describe_period, rank_one_streaks};
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub config_dir: PathBuf,
    pub source: String,
    pub year: i32,
    pub from_week: u32,
    pub to_week: u32,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub dashboard_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ValidateOptions {
    pub config_dir: Option<PathBuf>,
    pub source_file: Option<PathBuf>,
    pub dashboard_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub tracked_player: String,
    pub records: usize,
    pub snapshots: usize,
    pub first_date: Option<NaiveDate>,
    pub latest_date: Option<NaiveDate>,
    pub weeks_at_no1: usize,
    pub periods: Vec<StreakPeriod>,
    pub period_lines: Vec<String>,
}

/// Fetches the requested weeks of one source for one year and folds the new
/// rows into that year's CSV. Weeks already present are not fetched again.
pub fn crawl_source(options: &CrawlOptions) -> Result<CrawlReport> {
    if options.from_week == 0 || options.from_week > options.to_week {
        bail!(
            "invalid week range {}..={}",
            options.from_week,
            options.to_week
        );
    }

    let source = find_source(&options.config_dir, &options.source)?;
    let mut report = CrawlReport {
        source_key: source.key().to_string(),
        year: options.year,
        weeks_requested: (options.to_week - options.from_week + 1) as usize,
        ..CrawlReport::default()
    };

    if !source.config.source.enabled {
        info!(source = %source.key(), "source disabled; skipping");
        return Ok(report);
    }

    let dataset_path = source.dataset_path(options.year)?;
    let existing = load_dataset(&dataset_path)?;
    info!(
        source = %source.key(),
        file = %dataset_path.display(),
        records = existing.len(),
        "crawl start"
    );

    let fetcher = PageFetcher::for_source(&source)?;
    let delay = Duration::from_millis(source.config.fetch.delay_ms);
    let cooldown = Duration::from_millis(source.config.fetch.cooldown_ms);
    let mut batch = Vec::new();

    for week in options.from_week..=options.to_week {
        let date = release_date(options.year, week)
            .with_context(|| format!("no release date for {} week {week}", options.year))?;
        let snapshot = Snapshot { week, date };

        if existing.contains_snapshot(&snapshot) {
            info!(source = %source.key(), week, %date, "week already present; skipping");
            report.weeks_skipped += 1;
            continue;
        }

        let file_name = source.config.file_name(options.year, week);
        let location = fetcher.location(date, &file_name)?;
        info!(source = %source.key(), week, %date, url = %location, "fetching week");

        match fetcher.fetch(&location) {
            Ok(FetchOutcome::Page(doc)) => {
                report.pages_fetched += 1;
                match parse_document(&doc, &snapshot, &source.config.extract) {
                    Ok(PageParse::Records(records)) => {
                        info!(week, records = records.len(), "week parsed");
                        report.records_parsed += records.len();
                        batch.extend(records);
                    }
                    Ok(PageParse::Unavailable(reason)) => {
                        warn!(week, url = %location, reason, "page has no ranking data; skipping");
                        report.pages_unavailable += 1;
                    }
                    Err(err) => {
                        warn!(week, url = %location, error = %format!("{err:#}"), "page parse failed; skipping");
                        report.pages_unavailable += 1;
                    }
                }
                pause(delay);
            }
            Ok(FetchOutcome::Unavailable { reason }) => {
                warn!(week, url = %location, %reason, "page not available; skipping");
                report.pages_unavailable += 1;
                pause(delay);
            }
            Err(err) => {
                warn!(week, url = %location, error = %format!("{err:#}"), "fetch failed; cooling down");
                report.transport_errors += 1;
                pause(cooldown);
            }
        }
    }

    let merged = existing.merge(batch);
    report.records_added = merged.len() - existing.len();
    report.total_records = merged.len();

    if options.dry_run {
        info!("dry run enabled; dataset not persisted");
    } else if report.records_added > 0 {
        save_dataset(&dataset_path, &merged)?;
        info!(
            file = %dataset_path.display(),
            added = report.records_added,
            total = report.total_records,
            "dataset written"
        );
    } else {
        info!("no new records to add");
    }

    Ok(report)
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}

/// Loads every configured yearly dataset into one dataset capped at
/// `max_rank`. Missing years are skipped.
pub fn load_dashboard_dataset(config: &DashboardConfig, dashboard_path: &Path) -> Result<Dataset> {
    let mut records = Vec::new();
    for path in config.data_paths(dashboard_path)? {
        if !path.exists() {
            warn!(file = %path.display(), "dataset file missing; skipping year");
            continue;
        }
        records.extend(load_dataset(&path)?.records().iter().cloned());
    }
    Ok(Dataset::from_records(records).retain_max_rank(config.max_rank))
}

fn load_dashboard(options: &DashboardOptions) -> Result<(DashboardConfig, Vec<DashboardRow>)> {
    let config = load_dashboard_config(&options.dashboard_path)?;
    let dataset = load_dashboard_dataset(&config, &options.dashboard_path)?;
    if dataset.is_empty() {
        bail!("no ranking data found for years {:?}", config.years);
    }
    let rows = dashboard_rows(&dataset, &config);
    Ok((config, rows))
}

pub fn summarize(options: &DashboardOptions) -> Result<DashboardSummary> {
    let (config, rows) = load_dashboard(options)?;

    let dates = rows
        .iter()
        .map(|row| row.record.date)
        .collect::<std::collections::BTreeSet<_>>();
    let streaks = rank_one_streaks(&rank_one_dates(&rows));
    let period_lines = streaks
        .periods
        .iter()
        .enumerate()
        .map(|(i, period)| describe_period(i + 1, period))
        .collect();

    Ok(DashboardSummary {
        tracked_player: config.tracked_player,
        records: rows.len(),
        snapshots: dates.len(),
        first_date: dates.first().copied(),
        latest_date: dates.last().copied(),
        weeks_at_no1: streaks.snapshots,
        periods: streaks.periods,
        period_lines,
    })
}

pub fn export_chart(options: &DashboardOptions, out_path: &Path) -> Result<ChartSpec> {
    let (config, rows) = load_dashboard(options)?;
    let spec = assemble_chart(&rows, &config);

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output dir {}", parent.display()))?;
    }
    let serialized = serde_json::to_string_pretty(&spec)?;
    std::fs::write(out_path, serialized)
        .with_context(|| format!("failed to write chart {}", out_path.display()))?;
    info!(
        file = %out_path.display(),
        frames = spec.frames.len(),
        "chart written"
    );

    Ok(spec)
}

pub fn validate_configs(options: &ValidateOptions) -> Result<Vec<String>> {
    let mut messages = Vec::new();

    if let Some(file) = &options.source_file {
        let source = load_source_file(file)?;
        messages.push(format!("OK: {} ({})", source.key(), file.display()));
    } else if let Some(dir) = &options.config_dir {
        for source in load_sources_from_dir(dir)? {
            messages.push(format!("OK: {} ({})", source.key(), source.path.display()));
        }
    } else {
        bail!("either --config-dir or --source-file must be provided");
    }

    if let Some(path) = &options.dashboard_path {
        load_dashboard_config(path)?;
        messages.push(format!("OK: dashboard ({})", path.display()));
    }

    Ok(messages)
}
