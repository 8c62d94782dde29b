//! Error taxonomy shared by the scraping and summarization halves of the tool.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Every failure a scrape or summarize invocation can surface to its caller.
#[derive(Debug, Error)]
pub enum ChapterError {
    /// Missing or unusable URL or filename.
    #[error("{0}")]
    Input(String),

    /// Both navigation attempts failed.
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// No selector candidate produced usable paragraphs.
    #[error("Could not extract content from this page.")]
    Extraction,

    /// The summarization API answered with a non-success status.
    #[error("Summarization API error: {status}")]
    RemoteStatus { status: u16, body: String },

    /// The summarization API could not be reached or answered garbage.
    #[error("Failed to summarize: {0}")]
    RemoteTransport(String),

    #[error("No summary generated from API")]
    EmptySummary,

    /// The headless browser could not be launched or driven.
    #[error("Browser error: {0}")]
    Browser(String),

    /// The invocation ran past its overall time budget.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification written into every error payload.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    Navigation,
    Extraction,
    RemoteService,
    Browser,
    Timeout,
    Io,
}

impl ChapterError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input(_) => ErrorKind::Input,
            Self::Navigation(_) => ErrorKind::Navigation,
            Self::Extraction => ErrorKind::Extraction,
            Self::RemoteStatus { .. } | Self::RemoteTransport(_) | Self::EmptySummary => {
                ErrorKind::RemoteService
            }
            Self::Browser(_) => ErrorKind::Browser,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// HTTP status reported by the summarization API, if that is what failed.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ChapterError>;
