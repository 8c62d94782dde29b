//! chapter-digest is a CLI tool that scrapes a single web-novel chapter with a
//! headless browser and summarizes it with an LLM.
//!
//! The tool has four commands:
//! 1. `scrape` - Extracts a chapter and saves it to the uploads directory
//! 2. `summarize` - Summarizes a previously saved chapter
//! 3. `run` - Scrapes, summarizes and removes the saved chapter in one go
//! 4. `extract` - Runs the selector chains against a saved HTML page
//!
//! Every command prints exactly one JSON document on stdout; logs go to stderr.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use env_logger::Builder;
use log::{LevelFilter, error, info};
use serde::Serialize;
use serde_json::{Value, json};

use chapter_digest::{
    ChapterError, SelectorChain,
    config::{LoadSettings, ScrapeSettings, SummarizerConfig},
    constants::{
        API_KEY_ENV_NAME, DEFAULT_ENDPOINT, DEFAULT_MODEL, ENDPOINT_ENV_NAME, MODEL_ENV_NAME,
    },
    extract_chapter,
    pipeline::{self, ErrorPayload, Failed},
    snapshot::HtmlSnapshot,
    summarize::{HttpChatClient, SummarizeContext},
};

/// Upper bound on a whole scrape or run invocation.
const PROCESS_BUDGET: Duration = Duration::from_secs(300);

/// A CLI tool to scrape a web-novel chapter and summarize it with an LLM
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The command to execute
    #[command(subcommand)]
    command: Command,

    #[arg(long, short, action = clap::ArgAction::Count, help = "Output v(v...)erbosity: error (0), warn (1), info (2), debug (3), trace (4)", global = true, default_value_t = 2)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape a chapter and save it to the uploads directory
    Scrape {
        /// The chapter URL to scrape
        url: String,
        #[command(flatten)]
        browser: BrowserArgs,
    },
    /// Summarize a chapter previously saved by `scrape`
    Summarize {
        /// Name of the chapter file inside the uploads directory
        filename: String,
        /// Directory the chapter files live in
        #[arg(long, default_value = "uploads")]
        uploads: PathBuf,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Scrape a chapter, summarize it and remove the saved file
    Run {
        /// The chapter URL to scrape
        url: String,
        #[command(flatten)]
        browser: BrowserArgs,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Run the selector chains against a saved HTML page
    Extract {
        /// Path to the saved HTML page
        html_file: PathBuf,
    },
}

#[derive(Args)]
struct BrowserArgs {
    /// Directory to save chapter files to
    #[arg(long, default_value = "uploads")]
    uploads: PathBuf,
    /// Maximum number of scroll steps while loading lazy content
    #[arg(long, default_value_t = 15)]
    max_scrolls: usize,
    /// Show the browser window instead of running headless
    #[arg(long)]
    headed: bool,
}

#[derive(Args)]
struct ModelArgs {
    /// API key for the chat-completion endpoint
    #[arg(long, env = API_KEY_ENV_NAME, hide_env_values = true)]
    api_key: Option<String>,
    /// Model identifier to request
    #[arg(long, env = MODEL_ENV_NAME, default_value = DEFAULT_MODEL)]
    model: String,
    /// Chat-completion endpoint URL
    #[arg(long, env = ENDPOINT_ENV_NAME, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
    /// Input ceiling in estimated tokens; longer chapters are truncated
    #[arg(long, default_value_t = 5000)]
    max_input_tokens: usize,
    /// Maximum tokens the model may generate
    #[arg(long, default_value_t = 1000)]
    max_tokens: u32,
    /// Sampling temperature
    #[arg(long, default_value_t = 0.7)]
    temperature: f32,
    /// Path to a prompt template with {title} and {text} placeholders
    #[arg(long, short = 'p')]
    prompt_file: Option<PathBuf>,
}

impl BrowserArgs {
    fn settings(&self) -> ScrapeSettings {
        ScrapeSettings {
            load: LoadSettings {
                max_scrolls: self.max_scrolls,
                ..LoadSettings::default()
            },
            uploads_dir: self.uploads.clone(),
            headless: !self.headed,
            ..ScrapeSettings::default()
        }
    }
}

impl ModelArgs {
    fn config(&self) -> Result<SummarizerConfig, ChapterError> {
        let api_key = self
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ChapterError::Input(format!("{API_KEY_ENV_NAME} is not set")))?;

        Ok(SummarizerConfig {
            api_key,
            model: self.model.clone(),
            endpoint: self.endpoint.clone(),
            max_input_tokens: self.max_input_tokens,
            output_token_cap: self.max_tokens,
            temperature: self.temperature,
            ..SummarizerConfig::default()
        })
    }

    fn prompt_template(&self) -> Result<Option<String>, ChapterError> {
        match &self.prompt_file {
            Some(file) => fs::read_to_string(file).map(Some).map_err(|e| {
                ChapterError::Input(format!("Failed to read prompt file {}: {e}", file.display()))
            }),
            None => Ok(None),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    Builder::new()
        .filter_level(match cli.verbose {
            0 => LevelFilter::Error,
            1 => LevelFilter::Warn,
            2 => LevelFilter::Info,
            3 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        })
        .init();

    let outcome = match cli.command {
        Command::Scrape { url, browser } => handle_scrape_command(&url, &browser).await,
        Command::Summarize {
            filename,
            uploads,
            model,
        } => handle_summarize_command(&filename, uploads, &model).await,
        Command::Run {
            url,
            browser,
            model,
        } => handle_run_command(&url, &browser, &model).await,
        Command::Extract { html_file } => handle_extract_command(html_file).await,
    };

    match outcome {
        Ok(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Err(payload) => {
            println!("{}", to_json(&payload));
            ExitCode::FAILURE
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| json!({ "error": e.to_string() }))
}

fn timed_out() -> ErrorPayload {
    error!("Gave up after {PROCESS_BUDGET:?}");
    ErrorPayload::from(&ChapterError::Timeout(PROCESS_BUDGET))
}

/// Error payload with the full cause chain attached as a traceback.
fn traced(failed: Failed) -> ErrorPayload {
    let payload = ErrorPayload::from(&failed);
    let traceback = format!("{:?}", anyhow::Error::new(failed));
    ErrorPayload {
        traceback: Some(traceback),
        ..payload
    }
}

async fn handle_scrape_command(url: &str, browser: &BrowserArgs) -> Result<Value, ErrorPayload> {
    let settings = browser.settings();
    let chain = SelectorChain::default();
    let scraped = tokio::time::timeout(PROCESS_BUDGET, pipeline::scrape(url, &settings, &chain))
        .await
        .map_err(|_| timed_out())?
        .map_err(traced)?;

    info!("Returning result: {} -> {}", scraped.title, scraped.filename);
    Ok(to_json(&scraped))
}

async fn handle_summarize_command(
    filename: &str,
    uploads: PathBuf,
    model: &ModelArgs,
) -> Result<Value, ErrorPayload> {
    let fail = |e: ChapterError| ErrorPayload::from(&e);
    let config = model.config().map_err(fail)?;
    let prompt_template = model.prompt_template().map_err(fail)?;
    let client = HttpChatClient::new(&config).map_err(fail)?;
    let ctx = SummarizeContext {
        client: &client,
        config: &config,
        prompt_template: prompt_template.as_deref(),
    };

    let summarized = pipeline::summarize_file(&uploads, filename, &ctx)
        .await
        .map_err(fail)?;
    Ok(to_json(&summarized))
}

async fn handle_run_command(
    url: &str,
    browser: &BrowserArgs,
    model: &ModelArgs,
) -> Result<Value, ErrorPayload> {
    let fail = |e: ChapterError| ErrorPayload::from(&e);
    let config = model.config().map_err(fail)?;
    let prompt_template = model.prompt_template().map_err(fail)?;
    let client = HttpChatClient::new(&config).map_err(fail)?;
    let ctx = SummarizeContext {
        client: &client,
        config: &config,
        prompt_template: prompt_template.as_deref(),
    };

    let settings = browser.settings();
    let chain = SelectorChain::default();
    let completed = tokio::time::timeout(PROCESS_BUDGET, pipeline::run(url, &settings, &chain, &ctx))
        .await
        .map_err(|_| timed_out())?
        .map_err(|failed| {
            if failed.during_scrape() {
                traced(failed)
            } else {
                ErrorPayload::from(&failed)
            }
        })?;
    Ok(to_json(&completed))
}

async fn handle_extract_command(html_file: PathBuf) -> Result<Value, ErrorPayload> {
    let fail = |e: ChapterError| ErrorPayload::from(&e);
    let snapshot = HtmlSnapshot::from_file(&html_file).map_err(fail)?;
    let chapter = extract_chapter(&snapshot, &SelectorChain::default())
        .await
        .map_err(fail)?;
    Ok(json!({
        "title": chapter.title,
        "paragraphs": chapter.paragraphs,
    }))
}
