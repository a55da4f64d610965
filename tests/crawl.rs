use anyhow::Result;
use chrono::NaiveDate;
use ittf_rankings::dataset::Dataset;
use ittf_rankings::model::RankingRecord;
use ittf_rankings::pipeline::{CrawlOptions, ValidateOptions, crawl_source, validate_configs};
use ittf_rankings::store::{load_dataset, save_dataset};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

#[test]
fn crawl_writes_sorted_yearly_csv() -> Result<()> {
    let env = setup_fixture_env()?;

    let report = crawl_source(&env.options(2, 5))?;

    assert_eq!(report.weeks_requested, 4);
    assert_eq!(report.weeks_skipped, 0);
    assert_eq!(report.pages_fetched, 3);
    // week 4 has no archived file, week 5 has no table
    assert_eq!(report.pages_unavailable, 2);
    assert_eq!(report.transport_errors, 0);
    assert_eq!(report.records_parsed, 7);
    assert_eq!(report.records_added, 7);

    let csv_path = env.data_dir.join("women_2024.csv");
    let raw = fs::read(&csv_path)?;
    assert!(raw.starts_with(b"\xEF\xBB\xBF"));
    let text = String::from_utf8(raw[3..].to_vec())?;
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("date,week,rank,player_name,association,points")
    );
    assert_eq!(
        lines.next(),
        Some("2024-01-09,2,1,SUN Yingsha (CHN),CHN,9725")
    );

    let dataset = load_dataset(&csv_path)?;
    let records = dataset.records();
    assert_eq!(records.len(), 7);
    assert!(
        records
            .windows(2)
            .all(|w| (w[0].date, w[0].rank) < (w[1].date, w[1].rank))
    );

    let hayata_w2 = &records[2];
    assert_eq!(hayata_w2.player_name, "HAYATA Hina");
    assert_eq!(hayata_w2.association.as_deref(), Some("JPN"));
    assert_eq!(hayata_w2.points, None);

    let cheng = records.last().expect("week 3 rank 4");
    assert_eq!(cheng.date, date(2024, 1, 16));
    assert_eq!(cheng.week, 3);
    assert_eq!(cheng.rank, 4);
    assert_eq!(cheng.association, None);
    assert_eq!(cheng.points, Some(3500));

    Ok(())
}

#[test]
fn second_crawl_skips_present_weeks_and_adds_nothing() -> Result<()> {
    let env = setup_fixture_env()?;

    crawl_source(&env.options(2, 5))?;
    let csv_path = env.data_dir.join("women_2024.csv");
    let before = fs::read(&csv_path)?;

    let report = crawl_source(&env.options(2, 5))?;

    assert_eq!(report.weeks_skipped, 2);
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.pages_unavailable, 2);
    assert_eq!(report.records_added, 0);
    assert_eq!(report.total_records, 7);
    assert_eq!(fs::read(&csv_path)?, before);

    Ok(())
}

#[test]
fn crawl_keeps_existing_rows_for_present_weeks() -> Result<()> {
    let env = setup_fixture_env()?;
    let csv_path = env.data_dir.join("women_2024.csv");

    let seeded = RankingRecord {
        date: date(2024, 1, 9),
        week: 2,
        rank: 1,
        player_name: "SUN Yingsha".to_string(),
        association: Some("CHN".to_string()),
        points: Some(1),
    };
    save_dataset(&csv_path, &Dataset::from_records(vec![seeded.clone()]))?;

    let report = crawl_source(&env.options(2, 3))?;

    assert_eq!(report.weeks_skipped, 1);
    assert_eq!(report.records_added, 4);

    let dataset = load_dataset(&csv_path)?;
    assert_eq!(dataset.len(), 5);
    assert_eq!(dataset.records()[0], seeded);

    Ok(())
}

#[test]
fn dry_run_leaves_dataset_untouched() -> Result<()> {
    let env = setup_fixture_env()?;

    let mut options = env.options(2, 3);
    options.dry_run = true;
    let report = crawl_source(&options)?;

    assert_eq!(report.records_added, 7);
    assert!(!env.data_dir.join("women_2024.csv").exists());

    Ok(())
}

#[test]
fn disabled_source_is_not_crawled() -> Result<()> {
    let env = setup_fixture_env()?;

    let report = crawl_source(&CrawlOptions {
        source: "test.disabled".to_string(),
        ..env.options(2, 3)
    })?;

    assert_eq!(report.pages_fetched, 0);
    assert!(!env.data_dir.join("disabled_2024.csv").exists());

    Ok(())
}

#[test]
fn crawl_rejects_unknown_source_and_bad_week_range() -> Result<()> {
    let env = setup_fixture_env()?;

    let unknown = crawl_source(&CrawlOptions {
        source: "nope".to_string(),
        ..env.options(1, 2)
    });
    assert!(unknown.is_err());

    assert!(crawl_source(&env.options(0, 2)).is_err());
    assert!(crawl_source(&env.options(5, 2)).is_err());

    Ok(())
}

#[test]
fn validate_lists_sources_and_rejects_bad_config() -> Result<()> {
    let env = setup_fixture_env()?;

    let messages = validate_configs(&ValidateOptions {
        config_dir: Some(env.config_dir.clone()),
        source_file: None,
        dashboard_path: None,
    })?;
    assert_eq!(messages.len(), 3);
    assert!(messages[0].starts_with("OK: test.archive.html"));
    assert!(messages[1].starts_with("OK: test.archive.pdf"));

    let bad = env.config_dir.join("bad.toml");
    fs::write(
        &bad,
        r#"
[source]
key = "test.bad"
name = "Bad"

[fetch]
mode = "http"

[output]
csv_template = "out.csv"
"#,
    )?;
    let err = validate_configs(&ValidateOptions {
        config_dir: None,
        source_file: Some(bad),
        dashboard_path: None,
    })
    .expect_err("missing base_url and year placeholder must fail");
    assert!(format!("{err:#}").contains("fetch.base_url"));

    Ok(())
}

#[test]
fn validate_rejects_unparseable_row_selector() -> Result<()> {
    let env = setup_fixture_env()?;

    let bad = env.config_dir.join("bad-selector.toml");
    fs::write(
        &bad,
        r#"
[source]
key = "test.bad.selector"
name = "Bad selector"

[fetch]
mode = "file"
file_dir = "../pages"
file_name_template = "{{year}}_{{week}}_SEN_WS.html"

[extract]
format = "html"
row_selector = "tr[["

[output]
csv_template = "../data/bad_{{year}}.csv"
"#,
    )?;
    let err = validate_configs(&ValidateOptions {
        config_dir: None,
        source_file: Some(bad),
        dashboard_path: None,
    })
    .expect_err("unparseable selector must fail validation");
    assert!(format!("{err:#}").contains("extract.row_selector"));

    Ok(())
}

#[test]
fn pdf_text_archive_is_crawled_into_yearly_csv() -> Result<()> {
    let env = setup_fixture_env()?;

    let report = crawl_source(&env.pdf_options(2021, 7, 7))?;

    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.records_parsed, 2);
    assert_eq!(report.records_added, 2);

    let dataset = load_dataset(&env.data_dir.join("women_pdf_2021.csv"))?;
    assert_eq!(
        dataset.records(),
        &[
            RankingRecord {
                date: date(2021, 2, 16),
                week: 7,
                rank: 1,
                player_name: "CHEN Meng".to_string(),
                association: Some("CHN".to_string()),
                points: Some(12345),
            },
            RankingRecord {
                date: date(2021, 2, 16),
                week: 7,
                rank: 2,
                player_name: "SUN Yingsha".to_string(),
                association: Some("CHN".to_string()),
                points: Some(11000),
            },
        ]
    );

    Ok(())
}

#[test]
fn unreadable_week_is_counted_and_later_weeks_still_merge() -> Result<()> {
    let env = setup_fixture_env()?;
    // a directory where the week 8 file should be cannot be read
    fs::create_dir_all(env.pages_dir.join("WS-WR-2021.W8-v2.pdf"))?;

    let report = crawl_source(&env.pdf_options(2021, 7, 9))?;

    assert_eq!(report.weeks_requested, 3);
    assert_eq!(report.transport_errors, 1);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.pages_unavailable, 0);
    assert_eq!(report.records_parsed, 3);
    assert_eq!(report.records_added, 3);

    let dataset = load_dataset(&env.data_dir.join("women_pdf_2021.csv"))?;
    assert_eq!(dataset.len(), 3);
    let ito = dataset.records().last().expect("week 9 row");
    assert_eq!(ito.date, date(2021, 3, 2));
    assert_eq!(ito.week, 9);
    assert_eq!(ito.player_name, "ITO Mima");
    assert_eq!(ito.association.as_deref(), Some("JPN"));
    assert_eq!(ito.points, Some(9000));
    assert!(dataset.records().iter().all(|r| r.week != 8));

    Ok(())
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

struct FixtureEnv {
    config_dir: PathBuf,
    pages_dir: PathBuf,
    data_dir: PathBuf,
}

impl FixtureEnv {
    fn options(&self, from_week: u32, to_week: u32) -> CrawlOptions {
        CrawlOptions {
            config_dir: self.config_dir.clone(),
            source: "test.archive.html".to_string(),
            year: 2024,
            from_week,
            to_week,
            dry_run: false,
        }
    }

    fn pdf_options(&self, year: i32, from_week: u32, to_week: u32) -> CrawlOptions {
        CrawlOptions {
            source: "test.archive.pdf".to_string(),
            year,
            ..self.options(from_week, to_week)
        }
    }
}

fn setup_fixture_env() -> Result<FixtureEnv> {
    let temp = tempdir()?;
    let root = temp.keep();

    let fixture_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let config_dir = root.join("sources");
    copy_dir(&fixture_root.join("sources"), &config_dir)?;
    let pages_dir = root.join("pages");
    copy_dir(&fixture_root.join("pages"), &pages_dir)?;

    Ok(FixtureEnv {
        config_dir,
        pages_dir,
        data_dir: root.join("data"),
    })
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&src_path, &dst_path)?;
        } else {
            fs::copy(src_path, dst_path)?;
        }
    }

    Ok(())
}
