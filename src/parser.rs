use crate::association::extract_association;
use crate::config::{ExtractConfig, ExtractFormat};
use crate::fetch::FetchedDocument;
use crate::model::{RankingRecord, Snapshot};
use anyhow::{Context, Result, anyhow};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, warn};

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("digit regex is valid"));

/// Outcome of reading one table row or text line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowParse {
    Record(RankingRecord),
    Skip(SkipReason),
}

impl RowParse {
    pub fn into_record(self) -> Option<RankingRecord> {
        match self {
            RowParse::Record(record) => Some(record),
            RowParse::Skip(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Blank,
    Header,
    TooFewCells(usize),
    TooFewTokens(usize),
    NoRank,
    MissingName,
    InvalidPoints(String),
    RankAboveCap(u32),
    Malformed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Blank => write!(f, "blank line"),
            SkipReason::Header => write!(f, "header or footer line"),
            SkipReason::TooFewCells(n) => write!(f, "only {n} cells"),
            SkipReason::TooFewTokens(n) => write!(f, "only {n} tokens"),
            SkipReason::NoRank => write!(f, "no rank"),
            SkipReason::MissingName => write!(f, "no player name"),
            SkipReason::InvalidPoints(raw) => write!(f, "invalid points {raw:?}"),
            SkipReason::RankAboveCap(rank) => write!(f, "rank {rank} above cap"),
            SkipReason::Malformed(err) => write!(f, "malformed row: {err}"),
        }
    }
}

/// Records parsed from one weekly page, or why the page holds none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageParse {
    Records(Vec<RankingRecord>),
    Unavailable(&'static str),
}

pub fn parse_document(
    doc: &FetchedDocument,
    snapshot: &Snapshot,
    extract: &ExtractConfig,
) -> Result<PageParse> {
    match extract.format {
        ExtractFormat::Html => parse_html_document(&doc.body, snapshot, extract),
        ExtractFormat::PdfText => Ok(parse_pdf_document(doc, snapshot, extract)),
    }
}

pub fn parse_html_document(
    body: &[u8],
    snapshot: &Snapshot,
    extract: &ExtractConfig,
) -> Result<PageParse> {
    let html_text = String::from_utf8_lossy(body);
    let parsed = Html::parse_document(&html_text);

    let table_selector =
        Selector::parse("table").map_err(|err| anyhow!("failed to parse table selector: {err:?}"))?;
    let row_selector = Selector::parse(&extract.row_selector)
        .map_err(|err| anyhow!("invalid row_selector {}: {err:?}", extract.row_selector))?;

    let Some(table) = parsed.select(&table_selector).next() else {
        return Ok(PageParse::Unavailable("no table"));
    };
    let rows = table.select(&row_selector).collect::<Vec<_>>();
    if rows.is_empty() {
        return Ok(PageParse::Unavailable("no data rows"));
    }

    let mut records = Vec::new();
    for (index, row) in rows.into_iter().take(extract.max_rows).enumerate() {
        match parse_html_row(row, snapshot, extract.max_rank) {
            RowParse::Record(record) => records.push(record),
            RowParse::Skip(reason @ SkipReason::Malformed(_)) => {
                warn!(week = snapshot.week, row = index, %reason, "row skipped");
            }
            RowParse::Skip(reason) => {
                debug!(week = snapshot.week, row = index, %reason, "row skipped");
            }
        }
    }

    Ok(PageParse::Records(records))
}

/// Reads one `<tr>`: rank, player, association cell, points.
pub fn parse_html_row(row: ElementRef<'_>, snapshot: &Snapshot, max_rank: u32) -> RowParse {
    try_html_row(row, snapshot, max_rank)
        .unwrap_or_else(|err| RowParse::Skip(SkipReason::Malformed(format!("{err:#}"))))
}

fn try_html_row(row: ElementRef<'_>, snapshot: &Snapshot, max_rank: u32) -> Result<RowParse> {
    let cells = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "td")
        .collect::<Vec<_>>();
    if cells.len() < 4 {
        return Ok(RowParse::Skip(SkipReason::TooFewCells(cells.len())));
    }

    let rank_text = cell_text(cells[0]);
    let Some(rank_digits) = DIGIT_RUN.find(&rank_text) else {
        return Ok(RowParse::Skip(SkipReason::NoRank));
    };
    let rank = rank_digits
        .as_str()
        .parse::<u32>()
        .with_context(|| format!("rank {:?}", rank_digits.as_str()))?;
    if rank > max_rank {
        return Ok(RowParse::Skip(SkipReason::RankAboveCap(rank)));
    }

    let player_name = cell_text(cells[1]);
    let association = extract_association(cells[2]);

    let points_digits = cell_text(cells[3])
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>();
    let points = if points_digits.is_empty() {
        None
    } else {
        Some(
            points_digits
                .parse::<u32>()
                .with_context(|| format!("points {points_digits:?}"))?,
        )
    };

    Ok(RowParse::Record(snapshot.record(
        rank,
        player_name,
        association,
        points,
    )))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

pub fn parse_pdf_document(
    doc: &FetchedDocument,
    snapshot: &Snapshot,
    extract: &ExtractConfig,
) -> PageParse {
    let pages = match pdf_extract::extract_text_from_mem_by_pages(&doc.body) {
        Ok(pages) => pages,
        Err(err) => {
            warn!(
                url = %doc.source_url,
                error = %err,
                "pdf text extraction failed; falling back to utf8 decode"
            );
            vec![String::from_utf8_lossy(&doc.body).to_string()]
        }
    };

    if pages.iter().all(|page| page.trim().is_empty()) {
        return PageParse::Unavailable("no text");
    }
    PageParse::Records(parse_pdf_pages(&pages, snapshot, extract))
}

/// Parses extracted PDF text page by page, stopping once `max_rows`
/// records are collected.
pub fn parse_pdf_pages<S: AsRef<str>>(
    pages: &[S],
    snapshot: &Snapshot,
    extract: &ExtractConfig,
) -> Vec<RankingRecord> {
    let mut records = Vec::new();

    'pages: for (page, page_text) in pages.iter().enumerate() {
        for line in page_text.as_ref().lines() {
            if records.len() >= extract.max_rows {
                break 'pages;
            }
            match parse_pdf_line(line, snapshot, extract) {
                RowParse::Record(record) => records.push(record),
                RowParse::Skip(SkipReason::Blank) => {}
                RowParse::Skip(reason) => {
                    debug!(week = snapshot.week, page, line = line.trim(), %reason, "line skipped");
                }
            }
        }
    }

    records
}

/// Reads `rank name... association points` from one text line.
pub fn parse_pdf_line(line: &str, snapshot: &Snapshot, extract: &ExtractConfig) -> RowParse {
    let line = line.trim();
    if line.is_empty() {
        return RowParse::Skip(SkipReason::Blank);
    }
    if extract
        .skip_prefixes
        .iter()
        .any(|prefix| line.starts_with(prefix.as_str()))
    {
        return RowParse::Skip(SkipReason::Header);
    }

    let tokens = line.split_whitespace().collect::<Vec<_>>();
    if tokens.len() < 3 {
        return RowParse::Skip(SkipReason::TooFewTokens(tokens.len()));
    }

    let Ok(rank) = tokens[0].parse::<u32>() else {
        return RowParse::Skip(SkipReason::NoRank);
    };
    if rank > extract.max_rank {
        return RowParse::Skip(SkipReason::RankAboveCap(rank));
    }

    let n = tokens.len();
    let player_name = tokens[1..n - 2].join(" ");
    if player_name.is_empty() {
        return RowParse::Skip(SkipReason::MissingName);
    }
    let association = tokens[n - 2].to_string();
    let points_raw = tokens[n - 1].replace(',', "");
    let Ok(points) = points_raw.parse::<u32>() else {
        return RowParse::Skip(SkipReason::InvalidPoints(tokens[n - 1].to_string()));
    };

    RowParse::Record(snapshot.record(rank, player_name, Some(association), Some(points)))
}
