use anyhow::Result;
use clap::{Parser, Subcommand};
use ittf_rankings::pipeline::{
    CrawlOptions, DashboardOptions, ValidateOptions, crawl_source, export_chart, summarize,
    validate_configs,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "ittf-rankings",
    about = "Weekly ITTF women's ranking crawler and dashboard data builder"
)]
struct Cli {
    #[arg(long, default_value = "configs/sources")]
    config_dir: PathBuf,

    #[arg(long, default_value = "configs/dashboard.toml")]
    dashboard: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch weekly pages for one year and merge them into its CSV.
    Crawl {
        #[arg(long)]
        source: String,
        #[arg(long)]
        year: i32,
        #[arg(long, default_value_t = 1)]
        from_week: u32,
        #[arg(long, default_value_t = 52)]
        to_week: u32,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Print rank-1 streaks of the tracked player as JSON.
    Summary,
    /// Write the animated bar chart description.
    Chart {
        #[arg(long, default_value = "data/out/chart.json")]
        out: PathBuf,
    },
    Validate {
        #[arg(long)]
        source_file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl {
            source,
            year,
            from_week,
            to_week,
            dry_run,
        } => {
            let report = crawl_source(&CrawlOptions {
                config_dir: cli.config_dir,
                source,
                year,
                from_week,
                to_week,
                dry_run,
            })?;

            info!(
                source = %report.source_key,
                year = report.year,
                skipped = report.weeks_skipped,
                fetched = report.pages_fetched,
                unavailable = report.pages_unavailable,
                errors = report.transport_errors,
                parsed = report.records_parsed,
                added = report.records_added,
                total = report.total_records,
                "crawl summary"
            );
        }
        Commands::Summary => {
            let summary = summarize(&DashboardOptions {
                dashboard_path: cli.dashboard,
            })?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Chart { out } => {
            export_chart(
                &DashboardOptions {
                    dashboard_path: cli.dashboard,
                },
                &out,
            )?;
            info!("chart complete");
        }
        Commands::Validate { source_file } => {
            let messages = validate_configs(&ValidateOptions {
                config_dir: Some(cli.config_dir),
                source_file,
                dashboard_path: Some(cli.dashboard),
            })?;
            for line in messages {
                println!("{line}");
            }
        }
    }

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}
