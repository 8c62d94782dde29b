//! The pipeline module sequences one chapter through navigation, extraction,
//! persistence, summarization and clean-up, and shapes each outcome into the
//! JSON payload printed by the CLI.

use log::{error, info};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

use crate::browser::{ChromiumSession, PageDriver};
use crate::chapter::{read_chapter, remove_chapter, write_chapter};
use crate::config::ScrapeSettings;
use crate::error::{ChapterError, ErrorKind, Result};
use crate::extract::{SelectorChain, extract_chapter};
use crate::load::{normalize_chapter_url, open_chapter};
use crate::summarize::{SummarizeContext, format_for_display, summarize_chapter};

/// Progress of one request through the pipeline.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    Navigated,
    Extracted,
    Persisted,
    Summarized,
    Cleaned,
    Completed,
}

impl fmt::Display for Stage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Navigated => "navigated",
            Self::Extracted => "extracted",
            Self::Persisted => "persisted",
            Self::Summarized => "summarized",
            Self::Cleaned => "cleaned",
            Self::Completed => "completed",
        };
        formatter.write_str(name)
    }
}

/// A pipeline failure together with the last stage that was reached.
#[derive(Debug)]
pub struct Failed {
    pub stage: Stage,
    pub error: ChapterError,
}

impl Failed {
    /// Whether the failure happened before the chapter artifact was written,
    /// i.e. inside the scraping half of the pipeline.
    #[must_use]
    pub fn during_scrape(&self) -> bool {
        self.stage < Stage::Persisted
    }
}

impl fmt::Display for Failed {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "failed after {}: {}", self.stage, self.error)
    }
}

impl std::error::Error for Failed {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct ScrapeOutput {
    pub title: String,
    pub filename: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct SummaryOutput {
    pub summary: String,
    pub file_path: PathBuf,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct RunOutput {
    pub message: String,
    pub title: String,
    pub summary: String,
}

/// Error payload printed instead of a result.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct ErrorPayload {
    pub error: String,
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

impl From<&ChapterError> for ErrorPayload {
    fn from(error: &ChapterError) -> Self {
        Self {
            error: error.to_string(),
            kind: error.kind(),
            status: error.status(),
            stage: None,
            traceback: None,
        }
    }
}

impl From<&Failed> for ErrorPayload {
    fn from(failed: &Failed) -> Self {
        Self {
            stage: Some(failed.stage),
            ..Self::from(&failed.error)
        }
    }
}

struct Tracker {
    stage: Stage,
}

impl Tracker {
    fn new() -> Self {
        info!("Stage: {}", Stage::Received);
        Self {
            stage: Stage::Received,
        }
    }

    fn advance(&mut self, stage: Stage) {
        info!("Stage: {} -> {stage}", self.stage);
        self.stage = stage;
    }

    fn fail(&self, error: ChapterError) -> Failed {
        error!("Failed after {}: {error}", self.stage);
        Failed {
            stage: self.stage,
            error,
        }
    }
}

/// Scrapes a chapter from an already open page and persists it.
async fn scrape_tracked(
    page: &dyn PageDriver,
    url: &Url,
    settings: &ScrapeSettings,
    chain: &SelectorChain,
    tracker: &mut Tracker,
) -> std::result::Result<ScrapeOutput, Failed> {
    open_chapter(page, url, &settings.load)
        .await
        .map_err(|e| tracker.fail(e))?;
    tracker.advance(Stage::Navigated);

    let chapter = extract_chapter(page, chain)
        .await
        .map_err(|e| tracker.fail(e))?;
    tracker.advance(Stage::Extracted);

    let filename = write_chapter(&settings.uploads_dir, &chapter).map_err(|e| tracker.fail(e))?;
    tracker.advance(Stage::Persisted);

    Ok(ScrapeOutput {
        title: chapter.title,
        filename,
    })
}

/// Scrapes the chapter at `url` from an already open page and writes the
/// chapter artifact.
///
/// # Errors
///
/// Returns navigation, extraction and I/O failures with the stage reached.
pub async fn scrape_page(
    page: &dyn PageDriver,
    url: &Url,
    settings: &ScrapeSettings,
    chain: &SelectorChain,
) -> std::result::Result<ScrapeOutput, Failed> {
    let mut tracker = Tracker::new();
    scrape_tracked(page, url, settings, chain, &mut tracker).await
}

/// Validates `raw_url`, launches a browser, scrapes the chapter and writes
/// the chapter artifact. The browser is closed on every path.
///
/// # Errors
///
/// Returns [`ChapterError::Input`] before launching anything if the URL is
/// unusable, and browser, navigation, extraction or I/O failures after.
pub async fn scrape(
    raw_url: &str,
    settings: &ScrapeSettings,
    chain: &SelectorChain,
) -> std::result::Result<ScrapeOutput, Failed> {
    let mut tracker = Tracker::new();
    let url = normalize_chapter_url(raw_url, &settings.target_domain).map_err(|e| tracker.fail(e))?;
    info!("Starting scraping for URL: {url}");

    let session = ChromiumSession::launch(settings)
        .await
        .map_err(|e| tracker.fail(e))?;
    let result = scrape_tracked(&session, &url, settings, chain, &mut tracker).await;
    session.close().await;
    result
}

/// Summarizes a previously persisted chapter artifact. The artifact is left
/// in place.
///
/// # Errors
///
/// Returns [`ChapterError::Input`] for a missing or unusable filename and
/// remote-service errors from the summarization API.
pub async fn summarize_file(
    uploads_dir: &Path,
    filename: &str,
    ctx: &SummarizeContext<'_>,
) -> Result<SummaryOutput> {
    info!("Summarizing file: {filename}");
    let (file_path, request) = read_chapter(uploads_dir, filename)?;
    let summary =
        summarize_chapter(ctx, &request.chapter_title, &request.chapter_text).await?;
    info!("Generated summary of length: {} characters", summary.chars().count());

    Ok(SummaryOutput {
        summary: format_for_display(&summary),
        file_path,
    })
}

/// Summarizes a scraped chapter and deletes its artifact once a summary exists.
///
/// If summarization fails the artifact stays on disk.
///
/// # Errors
///
/// Returns the summarization failure with [`Stage::Persisted`] as the stage.
pub async fn finish(
    scraped: ScrapeOutput,
    uploads_dir: &Path,
    ctx: &SummarizeContext<'_>,
) -> std::result::Result<RunOutput, Failed> {
    let mut tracker = Tracker {
        stage: Stage::Persisted,
    };
    let summarized = summarize_file(uploads_dir, &scraped.filename, ctx)
        .await
        .map_err(|e| tracker.fail(e))?;
    tracker.advance(Stage::Summarized);

    remove_chapter(&summarized.file_path);
    tracker.advance(Stage::Cleaned);

    info!("Successfully scraped chapter: {}", scraped.title);
    tracker.advance(Stage::Completed);
    Ok(RunOutput {
        message: "Scraping and summarization complete!".to_owned(),
        title: scraped.title,
        summary: summarized.summary,
    })
}

/// Runs the full pipeline for one URL.
///
/// # Errors
///
/// Returns the first failure together with the stage that was reached.
pub async fn run(
    raw_url: &str,
    settings: &ScrapeSettings,
    chain: &SelectorChain,
    ctx: &SummarizeContext<'_>,
) -> std::result::Result<RunOutput, Failed> {
    let scraped = scrape(raw_url, settings, chain).await?;
    finish(scraped, &settings.uploads_dir, ctx).await
}
