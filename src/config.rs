//! Typed settings injected into each stage instead of process-wide globals.

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DEFAULT_ENDPOINT, DEFAULT_MODEL, TARGET_DOMAIN};

/// Navigation and content-materialization timings.
#[derive(Clone, Debug)]
pub struct LoadSettings {
    /// First navigation attempt, waiting for DOM construction only.
    pub dom_timeout: Duration,
    /// Fallback navigation attempt, waiting for the full load event.
    pub load_timeout: Duration,
    /// Pause after navigation for client-side scripts to start.
    pub settle: Duration,
    /// Pause after each scroll step.
    pub scroll_interval: Duration,
    /// Extra pause before confirming that the height stopped growing.
    pub confirm_interval: Duration,
    /// Hard cap on scroll steps regardless of convergence.
    pub max_scrolls: usize,
    /// Overall budget for the scroll phase.
    pub materialize_budget: Duration,
    /// Timeout for individual browser protocol requests.
    pub operation_timeout: Duration,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            dom_timeout: Duration::from_secs(30),
            load_timeout: Duration::from_secs(45),
            settle: Duration::from_secs(3),
            scroll_interval: Duration::from_millis(500),
            confirm_interval: Duration::from_millis(1000),
            max_scrolls: 15,
            materialize_budget: Duration::from_secs(60),
            operation_timeout: Duration::from_secs(60),
        }
    }
}

/// Everything the scrape operation needs besides the URL.
#[derive(Clone, Debug)]
pub struct ScrapeSettings {
    pub load: LoadSettings,
    /// Directory chapter artifacts are written to.
    pub uploads_dir: PathBuf,
    /// Substring the chapter URL's host must contain.
    pub target_domain: String,
    pub viewport: (u32, u32),
    pub headless: bool,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            load: LoadSettings::default(),
            uploads_dir: PathBuf::from("uploads"),
            target_domain: TARGET_DOMAIN.to_owned(),
            viewport: (1280, 800),
            headless: true,
        }
    }
}

/// Chat-completion endpoint, credentials and request shaping.
#[derive(Clone, Debug)]
pub struct SummarizerConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    /// Input ceiling in estimated tokens; longer chapters are cut.
    pub max_input_tokens: usize,
    /// `max_tokens` sent with every request.
    pub output_token_cap: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_owned(),
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            max_input_tokens: 5000,
            output_token_cap: 1000,
            temperature: 0.7,
            timeout: Duration::from_secs(60),
        }
    }
}
