//! A [`PageDriver`] over a saved HTML document, for running the selector
//! engine offline against captured pages.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector as ScraperSelector};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::browser::{PageDriver, WaitUntil};
use crate::error::{ChapterError, Result};

/// Static page: navigation is a no-op and the document never grows.
#[derive(Clone, Debug)]
pub struct HtmlSnapshot {
    html: String,
}

impl HtmlSnapshot {
    #[must_use]
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    /// Loads a snapshot from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ChapterError::Io`] if the file cannot be read.
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(std::fs::read_to_string(path)?))
    }

    fn select_texts(&self, selector: &str, limit: usize) -> Result<Vec<String>> {
        let parsed = ScraperSelector::parse(selector)
            .map_err(|e| ChapterError::Browser(format!("invalid selector {selector}: {e}")))?;
        let document = Html::parse_document(&self.html);
        Ok(document
            .select(&parsed)
            .take(limit)
            .map(|element| text_content(&element))
            .collect())
    }
}

/// Concatenated descendant text, like the DOM's `textContent`.
fn text_content(element: &ElementRef<'_>) -> String {
    element.text().collect()
}

#[async_trait]
impl PageDriver for HtmlSnapshot {
    async fn navigate(&self, _url: &Url, _wait: WaitUntil, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn first_text(&self, selector: &str) -> Result<Option<String>> {
        Ok(self.select_texts(selector, 1)?.into_iter().next())
    }

    async fn all_texts(&self, selector: &str) -> Result<Vec<String>> {
        self.select_texts(selector, usize::MAX)
    }

    async fn scroll_height(&self) -> Result<u64> {
        Ok(0)
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        Ok(())
    }
}
