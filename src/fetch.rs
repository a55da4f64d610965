use crate::config::{FetchMode, LoadedSource};
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub source_url: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Page(FetchedDocument),
    /// The week has no published page (non-200 status, missing archive file).
    Unavailable { reason: String },
}

/// Retrieves one weekly page at a time, either over HTTP or from a directory
/// of previously downloaded pages laid out by file name.
#[derive(Debug, Clone)]
pub enum PageFetcher {
    Http { client: Client, base_url: String },
    File { dir: PathBuf },
}

impl PageFetcher {
    pub fn for_source(source: &LoadedSource) -> Result<Self> {
        let fetch = &source.config.fetch;
        match fetch.mode {
            FetchMode::Http => {
                let mut headers = HeaderMap::new();
                headers.insert(
                    USER_AGENT,
                    HeaderValue::from_str(&fetch.user_agent)
                        .context("invalid fetch.user_agent header value")?,
                );
                let client = Client::builder()
                    .timeout(Duration::from_secs(fetch.timeout_secs))
                    .default_headers(headers)
                    .build()
                    .context("failed to build reqwest client")?;
                let base_url = fetch
                    .base_url
                    .clone()
                    .context("fetch.base_url missing for http mode")?;
                Ok(Self::Http { client, base_url })
            }
            FetchMode::File => {
                let dir = source
                    .file_dir()?
                    .context("fetch.file_dir missing for file mode")?;
                Ok(Self::File { dir })
            }
        }
    }

    /// Where the page for `file_name`, published on `release`, lives.
    pub fn location(&self, release: NaiveDate, file_name: &str) -> Result<String> {
        match self {
            Self::Http { base_url, .. } => Ok(page_url(base_url, release, file_name)?.to_string()),
            Self::File { dir } => Ok(dir.join(file_name).display().to_string()),
        }
    }

    /// Transport failures are errors; a page that simply is not there is
    /// `FetchOutcome::Unavailable`.
    pub fn fetch(&self, location: &str) -> Result<FetchOutcome> {
        match self {
            Self::Http { client, .. } => {
                let resp = client
                    .get(location)
                    .send()
                    .with_context(|| format!("request to {location} failed"))?;
                let status = resp.status();
                if !status.is_success() {
                    return Ok(FetchOutcome::Unavailable {
                        reason: format!("status {status}"),
                    });
                }
                let body = resp
                    .bytes()
                    .with_context(|| format!("failed to read body from {location}"))?
                    .to_vec();
                debug!(url = %location, bytes = body.len(), "fetched page");
                Ok(FetchOutcome::Page(FetchedDocument {
                    source_url: location.to_string(),
                    body,
                }))
            }
            Self::File { .. } => {
                let path = PathBuf::from(location);
                if !path.exists() {
                    return Ok(FetchOutcome::Unavailable {
                        reason: format!("no archived file {}", path.display()),
                    });
                }
                let body = std::fs::read(&path)
                    .with_context(|| format!("failed to read archived page {}", path.display()))?;
                debug!(file = %path.display(), bytes = body.len(), "loaded archived page");
                Ok(FetchOutcome::Page(FetchedDocument {
                    source_url: format!("file://{}", path.display()),
                    body,
                }))
            }
        }
    }
}

/// `{base_url}/{YYYY}/{MM}/{file_name}`, using the release date's year and month.
pub fn page_url(base_url: &str, release: NaiveDate, file_name: &str) -> Result<Url> {
    let mut url = Url::parse(base_url).with_context(|| format!("invalid base_url {base_url}"))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| anyhow!("base_url cannot carry a path: {base_url}"))?;
        segments
            .pop_if_empty()
            .push(&release.format("%Y").to_string())
            .push(&release.format("%m").to_string())
            .push(file_name);
    }
    Ok(url)
}
