//! The browser capability used by the loader and the selector engine, plus its
//! headless Chromium implementation.

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use futures::{Stream, StreamExt};
use log::{debug, error, info};
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

use crate::config::ScrapeSettings;
use crate::error::{ChapterError, Result};

const READY_STATE_POLL: Duration = Duration::from_millis(100);

/// How long a navigation waits before it is considered done.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WaitUntil {
    /// Initial DOM construction only.
    DomContentLoaded,
    /// The full `load` event.
    Load,
}

/// Minimal set of page operations the scraping pipeline relies on.
///
/// # Errors
///
/// Query failures (bad selector, detached DOM) surface as
/// [`ChapterError::Browser`] so callers can decide whether to skip the
/// candidate or abort. Navigation failures and expired waits surface as
/// [`ChapterError::Navigation`].
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigates to `url`, failing if `wait` is not reached within `timeout`.
    async fn navigate(&self, url: &Url, wait: WaitUntil, timeout: Duration) -> Result<()>;

    /// Text content of the first element matching `selector`.
    async fn first_text(&self, selector: &str) -> Result<Option<String>>;

    /// Text content of every element matching `selector`, in document order.
    async fn all_texts(&self, selector: &str) -> Result<Vec<String>>;

    /// Current `document.body.scrollHeight`.
    async fn scroll_height(&self) -> Result<u64>;

    /// Scrolls the viewport to the current bottom of the document.
    async fn scroll_to_bottom(&self) -> Result<()>;
}

/// Polls the browser event stream until it ends and returns how many events
/// were seen. Errors are logged and polling continues.
async fn drain_events<S, T, E>(events: &mut S) -> usize
where
    S: Stream<Item = std::result::Result<T, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut seen = 0;
    while let Some(event) = events.next().await {
        seen += 1;
        if let Err(e) = event {
            debug!("Browser handler error: {e}");
        }
    }
    seen
}

/// A headless Chromium process with a single open tab.
///
/// Must be released with [`ChromiumSession::close`] on every exit path.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    /// Launches Chromium and opens a blank tab sized to the configured viewport.
    ///
    /// # Errors
    ///
    /// Returns [`ChapterError::Browser`] if the browser cannot be configured,
    /// started, or asked for a new tab.
    pub async fn launch(settings: &ScrapeSettings) -> Result<Self> {
        let (width, height) = settings.viewport;
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .window_size(width, height)
            .request_timeout(settings.load.operation_timeout);
        if !settings.headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| ChapterError::Browser(format!("browser config: {e}")))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ChapterError::Browser(format!("browser launch failed: {e}")))?;

        let handler = tokio::spawn(async move {
            drain_events(&mut handler).await;
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_error) = browser.close().await {
                    error!("Error closing browser after failed tab creation: {close_error}");
                }
                handler.abort();
                return Err(ChapterError::Browser(format!("new page failed: {e}")));
            }
        };

        info!("Launched headless browser ({width}x{height})");
        Ok(Self {
            browser,
            page,
            handler,
        })
    }

    /// Closes the tab and the browser process. Failures are logged only.
    pub async fn close(mut self) {
        if let Err(e) = self.page.close().await {
            error!("Error closing page: {e}");
        }
        if let Err(e) = self.browser.close().await {
            error!("Error closing browser: {e}");
        }
        if let Err(e) = self.browser.wait().await {
            error!("Error waiting for browser exit: {e}");
        }
        self.handler.abort();
        info!("Browser resources cleaned up");
    }

    async fn navigate_dom_content_loaded(&self, url: &Url) -> Result<()> {
        let response = self
            .page
            .execute(NavigateParams::new(url.as_str()))
            .await
            .map_err(|e| ChapterError::Navigation(e.to_string()))?;
        if let Some(error_text) = &response.result.error_text {
            return Err(ChapterError::Navigation(error_text.clone()));
        }

        loop {
            let state: String = self.evaluate("document.readyState").await?;
            debug!("document.readyState = {state}");
            if state != "loading" {
                return Ok(());
            }
            tokio::time::sleep(READY_STATE_POLL).await;
        }
    }

    async fn evaluate<T: serde::de::DeserializeOwned>(&self, script: &str) -> Result<T> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| ChapterError::Browser(e.to_string()))?
            .into_value()
            .map_err(|e| ChapterError::Browser(e.to_string()))
    }
}

/// Quotes `selector` as a JavaScript string literal.
fn js_string(selector: &str) -> Result<String> {
    serde_json::to_string(selector).map_err(|e| ChapterError::Browser(e.to_string()))
}

#[async_trait]
impl PageDriver for ChromiumSession {
    async fn navigate(&self, url: &Url, wait: WaitUntil, timeout: Duration) -> Result<()> {
        let attempt = async {
            match wait {
                WaitUntil::DomContentLoaded => self.navigate_dom_content_loaded(url).await,
                WaitUntil::Load => self
                    .page
                    .goto(url.as_str())
                    .await
                    .map(|_| ())
                    .map_err(|e| ChapterError::Navigation(e.to_string())),
            }
        };

        tokio::time::timeout(timeout, attempt)
            .await
            .map_err(|_| ChapterError::Navigation(format!("timed out after {timeout:?}")))?
    }

    async fn first_text(&self, selector: &str) -> Result<Option<String>> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); return el ? [el.textContent ?? ''] : []; }})()",
            js_string(selector)?
        );
        let texts: Vec<String> = self.evaluate(&script).await?;
        Ok(texts.into_iter().next())
    }

    async fn all_texts(&self, selector: &str) -> Result<Vec<String>> {
        let script = format!(
            "Array.from(document.querySelectorAll({}), el => el.textContent ?? '')",
            js_string(selector)?
        );
        self.evaluate(&script).await
    }

    async fn scroll_height(&self) -> Result<u64> {
        self.evaluate("document.body.scrollHeight").await
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.page
            .evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await
            .map(|_| ())
            .map_err(|e| ChapterError::Browser(e.to_string()))
    }
}
