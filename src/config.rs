use anyhow::{Context, Result, anyhow, bail};
use scraper::Selector;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub path: PathBuf,
    pub config: SourceConfig,
}

impl LoadedSource {
    pub fn key(&self) -> &str {
        &self.config.source.key
    }

    /// CSV file holding the dataset for `year`, resolved against the config file.
    pub fn dataset_path(&self, year: i32) -> Result<PathBuf> {
        let rendered = render_template(&self.config.output.csv_template, year, None);
        resolve_path(&self.path, Path::new(&rendered))
    }

    pub fn file_dir(&self) -> Result<Option<PathBuf>> {
        self.config
            .fetch
            .file_dir
            .as_deref()
            .map(|dir| resolve_path(&self.path, dir))
            .transpose()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub source: SourceMeta,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    pub output: OutputConfig,
}

impl SourceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.source.key.trim().is_empty() {
            bail!("source.key must not be empty");
        }
        if self.source.name.trim().is_empty() {
            bail!("source.name must not be empty");
        }

        match self.fetch.mode {
            FetchMode::Http => {
                if self.fetch.base_url.is_none() {
                    bail!("fetch.base_url is required for http mode");
                }
            }
            FetchMode::File => {
                if self.fetch.file_dir.is_none() {
                    bail!("fetch.file_dir is required for file mode");
                }
            }
        }

        for (name, template) in [
            ("fetch.file_name_template", &self.fetch.file_name_template),
            ("output.csv_template", &self.output.csv_template),
        ] {
            if !template.contains("{{year}}") {
                bail!("{name} must contain {{{{year}}}}");
            }
        }
        if !self.fetch.file_name_template.contains("{{week}}") {
            bail!("fetch.file_name_template must contain {{{{week}}}}");
        }

        if self.extract.max_rows == 0 {
            bail!("extract.max_rows must be greater than zero");
        }
        if self.extract.format == ExtractFormat::Html {
            if self.extract.row_selector.trim().is_empty() {
                bail!("extract.row_selector must not be empty for html extraction");
            }
            if let Err(err) = Selector::parse(&self.extract.row_selector) {
                bail!(
                    "invalid extract.row_selector {:?}: {err:?}",
                    self.extract.row_selector
                );
            }
        }

        Ok(())
    }

    pub fn file_name(&self, year: i32, week: u32) -> String {
        render_template(&self.fetch.file_name_template, year, Some(week))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceMeta {
    pub key: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    #[default]
    Http,
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default)]
    pub mode: FetchMode,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub file_dir: Option<PathBuf>,
    #[serde(default = "default_file_name_template")]
    pub file_name_template: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            mode: FetchMode::Http,
            base_url: None,
            file_dir: None,
            file_name_template: default_file_name_template(),
            timeout_secs: default_timeout_secs(),
            delay_ms: default_delay_ms(),
            cooldown_ms: default_cooldown_ms(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtractFormat {
    #[default]
    Html,
    PdfText,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    #[serde(default)]
    pub format: ExtractFormat,
    #[serde(default = "default_row_selector")]
    pub row_selector: String,
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
    #[serde(default = "default_max_rank")]
    pub max_rank: u32,
    #[serde(default = "default_skip_prefixes")]
    pub skip_prefixes: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            format: ExtractFormat::Html,
            row_selector: default_row_selector(),
            max_rows: default_max_rows(),
            max_rank: default_max_rank(),
            skip_prefixes: default_skip_prefixes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub csv_template: String,
}

/// Settings for the summary and chart views over all yearly datasets.
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_data_template")]
    pub data_template: String,
    #[serde(default = "default_years")]
    pub years: Vec<i32>,
    #[serde(default = "default_tracked_player")]
    pub tracked_player: String,
    #[serde(default = "default_others_label")]
    pub others_label: String,
    #[serde(default = "default_max_rank")]
    pub max_rank: u32,
    #[serde(default)]
    pub chart: ChartConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_template: default_data_template(),
            years: default_years(),
            tracked_player: default_tracked_player(),
            others_label: default_others_label(),
            max_rank: default_max_rank(),
            chart: ChartConfig::default(),
        }
    }
}

impl DashboardConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tracked_player.trim().is_empty() {
            bail!("tracked_player must not be empty");
        }
        if !self.data_template.contains("{{year}}") {
            bail!("data_template must contain {{{{year}}}}");
        }
        if self.years.is_empty() {
            bail!("years must list at least one year");
        }
        Ok(())
    }

    pub fn data_paths(&self, base: &Path) -> Result<Vec<PathBuf>> {
        self.years
            .iter()
            .map(|year| {
                let rendered = render_template(&self.data_template, *year, None);
                resolve_path(base, Path::new(&rendered))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_tracked_color")]
    pub tracked_color: String,
    #[serde(default = "default_others_color")]
    pub others_color: String,
    #[serde(default = "default_frame_ms")]
    pub frame_duration_ms: u64,
    #[serde(default = "default_transition_ms")]
    pub transition_duration_ms: u64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: None,
            tracked_color: default_tracked_color(),
            others_color: default_others_color(),
            frame_duration_ms: default_frame_ms(),
            transition_duration_ms: default_transition_ms(),
        }
    }
}

pub fn load_sources_from_dir(config_dir: &Path) -> Result<Vec<LoadedSource>> {
    if !config_dir.exists() {
        bail!("config dir does not exist: {}", config_dir.display());
    }

    let mut loaded = Vec::new();
    for entry in WalkDir::new(config_dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("toml") {
            continue;
        }
        loaded.push(load_source_file(path)?);
    }

    loaded.sort_by(|a, b| a.config.source.key.cmp(&b.config.source.key));
    Ok(loaded)
}

pub fn load_source_file(config_path: &Path) -> Result<LoadedSource> {
    let text = std::fs::read_to_string(config_path)
        .with_context(|| format!("failed to read source config: {}", config_path.display()))?;
    let config: SourceConfig = toml::from_str(&text)
        .with_context(|| format!("failed to parse toml in {}", config_path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid source config {}", config_path.display()))?;
    Ok(LoadedSource {
        path: config_path.to_path_buf(),
        config,
    })
}

pub fn find_source(config_dir: &Path, key: &str) -> Result<LoadedSource> {
    let sources = load_sources_from_dir(config_dir)?;
    let known = sources
        .iter()
        .map(|s| s.config.source.key.clone())
        .collect::<Vec<_>>();
    sources
        .into_iter()
        .find(|s| s.config.source.key == key)
        .ok_or_else(|| anyhow!("no source named {key} (known: {})", known.join(", ")))
}

/// Dashboard settings; a missing file yields the defaults.
pub fn load_dashboard_config(path: &Path) -> Result<DashboardConfig> {
    let config = if path.exists() {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dashboard config: {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse toml in {}", path.display()))?
    } else {
        DashboardConfig::default()
    };
    config
        .validate()
        .with_context(|| format!("invalid dashboard config {}", path.display()))?;
    Ok(config)
}

pub fn resolve_path(base_config_path: &Path, maybe_relative: &Path) -> Result<PathBuf> {
    if maybe_relative.is_absolute() {
        return Ok(maybe_relative.to_path_buf());
    }

    let parent = base_config_path.parent().ok_or_else(|| {
        anyhow!(
            "config has no parent directory: {}",
            base_config_path.display()
        )
    })?;

    Ok(parent.join(maybe_relative))
}

pub fn render_template(template: &str, year: i32, week: Option<u32>) -> String {
    let rendered = template.replace("{{year}}", &year.to_string());
    match week {
        Some(week) => rendered.replace("{{week}}", &week.to_string()),
        None => rendered,
    }
}

fn default_true() -> bool {
    true
}

fn default_file_name_template() -> String {
    "{{year}}_{{week}}_SEN_WS.html".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_delay_ms() -> u64 {
    1500
}

fn default_cooldown_ms() -> u64 {
    2000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_row_selector() -> String {
    "tr.rrow".to_string()
}

fn default_max_rows() -> usize {
    50
}

fn default_max_rank() -> u32 {
    50
}

fn default_skip_prefixes() -> Vec<String> {
    ["Rank", "WOMEN", "World", "ITTF", "Page"]
        .into_iter()
        .map(ToString::to_string)
        .collect()
}

fn default_data_template() -> String {
    "../data/ittf_women_{{year}}_rankings.csv".to_string()
}

fn default_years() -> Vec<i32> {
    (2021..=2025).collect()
}

fn default_tracked_player() -> String {
    "SUN Yingsha".to_string()
}

fn default_others_label() -> String {
    "Others".to_string()
}

fn default_tracked_color() -> String {
    "red".to_string()
}

fn default_others_color() -> String {
    "lightblue".to_string()
}

fn default_frame_ms() -> u64 {
    100
}

fn default_transition_ms() -> u64 {
    50
}
