//! The extract module resolves a chapter's title and body paragraphs from a
//! rendered page by walking ordered chains of selector strategies.

use log::{info, warn};

use crate::browser::PageDriver;
use crate::chapter::ExtractedChapter;
use crate::constants::{
    GENERIC_PARAGRAPH_SELECTOR, PARAGRAPH_SELECTORS, TITLE_SELECTORS, UNTITLED_CHAPTER,
};
use crate::error::{ChapterError, Result};

/// Titles that match a heading selector but are site navigation, not a chapter.
const PLACEHOLDER_TITLES: &[&str] = &["browse"];
const MIN_TITLE_CHARS: usize = 3;
/// A container must yield more than this many paragraphs to count as the body.
const MIN_BODY_PARAGRAPHS: usize = 5;
/// The generic fallback keeps only blocks longer than this, to skip UI chrome.
const MIN_GENERIC_CHARS: usize = 20;

/// One way of locating body paragraphs, tried in priority order.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ParagraphStrategy {
    /// Paragraphs inside a known container, accepted when there are more than
    /// `more_than` of them.
    Container { selector: String, more_than: usize },
    /// Any paragraph-like element longer than `min_chars`, accepted when at
    /// least one survives.
    Generic { selector: String, min_chars: usize },
}

impl ParagraphStrategy {
    #[must_use]
    pub fn selector(&self) -> &str {
        match self {
            Self::Container { selector, .. } | Self::Generic { selector, .. } => selector,
        }
    }

    /// Cleans raw element texts into paragraphs and decides whether this
    /// strategy accepts them. `None` means "try the next strategy".
    #[must_use]
    pub fn evaluate(&self, texts: Vec<String>) -> Option<Vec<String>> {
        match self {
            Self::Container { more_than, .. } => {
                let paragraphs: Vec<String> =
                    texts.iter().filter_map(|text| clean_paragraph(text)).collect();
                (paragraphs.len() > *more_than).then_some(paragraphs)
            }
            Self::Generic { min_chars, .. } => {
                let paragraphs: Vec<String> = texts
                    .iter()
                    .map(|text| text.trim())
                    .filter(|text| text.chars().count() > *min_chars)
                    .filter_map(clean_paragraph)
                    .collect();
                (!paragraphs.is_empty()).then_some(paragraphs)
            }
        }
    }
}

/// Ordered title and paragraph strategies for one site.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SelectorChain {
    pub titles: Vec<String>,
    pub paragraphs: Vec<ParagraphStrategy>,
}

impl Default for SelectorChain {
    fn default() -> Self {
        let mut paragraphs: Vec<ParagraphStrategy> = PARAGRAPH_SELECTORS
            .iter()
            .map(|selector| ParagraphStrategy::Container {
                selector: (*selector).to_owned(),
                more_than: MIN_BODY_PARAGRAPHS,
            })
            .collect();
        paragraphs.push(ParagraphStrategy::Generic {
            selector: GENERIC_PARAGRAPH_SELECTOR.to_owned(),
            min_chars: MIN_GENERIC_CHARS,
        });

        Self {
            titles: TITLE_SELECTORS.iter().map(|s| (*s).to_owned()).collect(),
            paragraphs,
        }
    }
}

/// Whether a trimmed heading text is plausible as a chapter title.
#[must_use]
pub fn is_plausible_title(text: &str) -> bool {
    let lowered = text.to_lowercase();
    text.chars().count() > MIN_TITLE_CHARS && !PLACEHOLDER_TITLES.contains(&lowered.as_str())
}

/// Collapses every whitespace run, line breaks included, into one space.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trims a paragraph, dropping a trailing `+` marker. Text that is empty
/// after the strip yields `None`.
#[must_use]
pub fn clean_paragraph(text: &str) -> Option<String> {
    let text = text.trim();
    let text = text.strip_suffix('+').map_or(text, str::trim);
    (!text.is_empty()).then(|| text.to_owned())
}

/// Returns the first plausible title among `selectors`, or the untitled sentinel.
///
/// A selector that fails to query is logged and skipped.
pub async fn resolve_title(page: &dyn PageDriver, selectors: &[String]) -> String {
    for selector in selectors {
        info!("Trying title selector: {selector}");
        match page.first_text(selector).await {
            Ok(Some(text)) => {
                let candidate = collapse_whitespace(&text);
                if is_plausible_title(&candidate) {
                    info!("Found title with selector {selector}: {candidate}");
                    return candidate;
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Error with title selector {selector}: {e}"),
        }
    }

    info!("No title selector matched, using \"{UNTITLED_CHAPTER}\"");
    UNTITLED_CHAPTER.to_owned()
}

/// Returns the paragraphs of the first strategy that accepts its matches.
///
/// # Errors
///
/// Returns [`ChapterError::Extraction`] if every strategy, including the
/// generic fallback, comes up empty.
pub async fn resolve_paragraphs(
    page: &dyn PageDriver,
    strategies: &[ParagraphStrategy],
) -> Result<Vec<String>> {
    for strategy in strategies {
        let selector = strategy.selector();
        info!("Trying paragraph selector: {selector}");
        let texts = match page.all_texts(selector).await {
            Ok(texts) => texts,
            Err(e) => {
                warn!("Error with paragraph selector {selector}: {e}");
                continue;
            }
        };

        let matched = texts.len();
        match strategy.evaluate(texts) {
            Some(paragraphs) => {
                info!("Using selector {selector}, found {} paragraphs", paragraphs.len());
                return Ok(paragraphs);
            }
            None => info!("Selector {selector} matched {matched} elements, not enough"),
        }
    }

    warn!("No content found on the page");
    Err(ChapterError::Extraction)
}

/// Extracts the title and body of the chapter currently loaded in `page`.
///
/// # Errors
///
/// Returns [`ChapterError::Extraction`] if no paragraphs could be found.
pub async fn extract_chapter(
    page: &dyn PageDriver,
    chain: &SelectorChain,
) -> Result<ExtractedChapter> {
    let title = resolve_title(page, &chain.titles).await;
    let paragraphs = resolve_paragraphs(page, &chain.paragraphs).await?;
    info!("Extracted {} paragraphs", paragraphs.len());
    Ok(ExtractedChapter::new(title, paragraphs))
}
