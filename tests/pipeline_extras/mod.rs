#![allow(dead_code)]

use async_trait::async_trait;
use chapter_digest::browser::{PageDriver, WaitUntil};
use chapter_digest::error::{ChapterError, Result};
use chapter_digest::summarize::{ChatCompletion, ChatRequest};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;

#[macro_export]
macro_rules! assert_summaries {
    (
        $(
            $test_name:ident : response => $response:expr, result => $result:expr
        ),+ $(,)?
    ) => {
        $(
            #[tokio::test]
            async fn $test_name() {
                let config = chapter_digest::config::SummarizerConfig::default();
                let client = StubChatClient::new($response);
                let context = chapter_digest::summarize::SummarizeContext {
                    client: &client,
                    config: &config,
                    prompt_template: None,
                };
                let result = chapter_digest::summarize::summarize_chapter(&context, "Title", "Text")
                    .await
                    .expect("Expected successful processing.");

                assert_that(&result).is_equal_to($result.to_owned());
            }
        )+
    }
}

/// Answers every request with the same canned content and keeps the requests.
pub(crate) struct StubChatClient {
    response_content: String,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl StubChatClient {
    pub fn new(response_content: impl Into<String>) -> Self {
        StubChatClient {
            response_content: response_content.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn last_request(&self) -> ChatRequest {
        self.requests
            .lock()
            .expect("Stub mutex poisoned")
            .last()
            .cloned()
            .expect("Expected at least one request.")
    }
}

#[async_trait]
impl ChatCompletion for StubChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.requests
            .lock()
            .expect("Stub mutex poisoned")
            .push(request.clone());
        Ok(self.response_content.clone())
    }
}

/// A fake page whose DOM answers and scroll heights are scripted up front.
#[derive(Default)]
pub(crate) struct ScriptedPage {
    failing_navigations: usize,
    titles: HashMap<String, String>,
    paragraphs: HashMap<String, Vec<String>>,
    broken_selectors: HashSet<String>,
    heights: Mutex<VecDeque<u64>>,
    last_height: Mutex<u64>,
    pub navigations: Mutex<Vec<WaitUntil>>,
    pub scrolls: Mutex<usize>,
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first `count` navigation attempts fail.
    pub fn failing_navigations(mut self, count: usize) -> Self {
        self.failing_navigations = count;
        self
    }

    pub fn title(mut self, selector: &str, text: &str) -> Self {
        self.titles.insert(selector.to_owned(), text.to_owned());
        self
    }

    pub fn paragraphs(mut self, selector: &str, texts: Vec<String>) -> Self {
        self.paragraphs.insert(selector.to_owned(), texts);
        self
    }

    pub fn broken(mut self, selector: &str) -> Self {
        self.broken_selectors.insert(selector.to_owned());
        self
    }

    /// Successive `scroll_height` answers; the last one repeats once exhausted.
    pub fn heights(self, heights: &[u64]) -> Self {
        *self.heights.lock().expect("Heights mutex poisoned") = heights.iter().copied().collect();
        self
    }

    pub fn navigation_attempts(&self) -> Vec<WaitUntil> {
        self.navigations.lock().expect("Navigation mutex poisoned").clone()
    }

    pub fn scroll_count(&self) -> usize {
        *self.scrolls.lock().expect("Scroll mutex poisoned")
    }

    fn check(&self, selector: &str) -> Result<()> {
        if self.broken_selectors.contains(selector) {
            return Err(ChapterError::Browser(format!("invalid selector {selector}")));
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for ScriptedPage {
    async fn navigate(&self, _url: &Url, wait: WaitUntil, timeout: Duration) -> Result<()> {
        let mut navigations = self.navigations.lock().expect("Navigation mutex poisoned");
        navigations.push(wait);
        if navigations.len() <= self.failing_navigations {
            return Err(ChapterError::Navigation(format!("timed out after {timeout:?}")));
        }
        Ok(())
    }

    async fn first_text(&self, selector: &str) -> Result<Option<String>> {
        self.check(selector)?;
        Ok(self.titles.get(selector).cloned())
    }

    async fn all_texts(&self, selector: &str) -> Result<Vec<String>> {
        self.check(selector)?;
        Ok(self.paragraphs.get(selector).cloned().unwrap_or_default())
    }

    async fn scroll_height(&self) -> Result<u64> {
        let mut last = self.last_height.lock().expect("Height mutex poisoned");
        if let Some(next) = self.heights.lock().expect("Heights mutex poisoned").pop_front() {
            *last = next;
        }
        Ok(*last)
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        *self.scrolls.lock().expect("Scroll mutex poisoned") += 1;
        Ok(())
    }
}

/// `count` distinct paragraphs of reasonable length.
pub fn numbered_paragraphs(count: usize) -> Vec<String> {
    (1..=count)
        .map(|n| format!("Paragraph {n} of the chapter, long enough to read."))
        .collect()
}

/// A fresh, empty directory removed when the returned guard drops.
pub fn scratch_dir() -> TempDir {
    tempfile::tempdir().expect("Expected scratch dir to be creatable.")
}

pub fn chapter_url() -> Url {
    Url::parse("https://www.wattpad.com/123456-chapter-one").expect("Expected a valid URL.")
}
