//! The summarize module turns chapter text into a token-budgeted prompt, sends
//! it to a chat-completion API and cleans up the returned summary.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::SummarizerConfig;
use crate::constants::{DEFAULT_PROMPT_TEMPLATE, SYSTEM_PROMPT, THINK_STRIPPER};
use crate::error::{ChapterError, Result};
use crate::normalize::normalize;

static THINK_STRIPPER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(THINK_STRIPPER).expect("Failed to compile THINK_STRIPPER regex"));

/// Rough characters-per-token ratio used for budgeting.
pub const CHARS_PER_TOKEN: usize = 4;

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_owned(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_owned(),
            content: content.into(),
        }
    }
}

/// Body of a chat-completion request.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Anything that can answer a chat-completion request with the first
/// completion's text.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// # Errors
    ///
    /// Returns a remote-service error if the request fails or is rejected.
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

/// OpenAI-compatible chat-completion client (Groq by default).
pub struct HttpChatClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpChatClient {
    /// Builds a client bounded by the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ChapterError::RemoteTransport`] if the HTTP client cannot be built.
    pub fn new(config: &SummarizerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChapterError::RemoteTransport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ChatCompletion for HttpChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        info!("Sending request to {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ChapterError::RemoteTransport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!("Summarization API error: {status} - {body}");
            return Err(ChapterError::RemoteStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ChapterError::RemoteTransport(format!("invalid response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ChapterError::RemoteTransport("response contained no choices".to_owned()))
    }
}

/// Shared data for summarization requests.
pub struct SummarizeContext<'a> {
    /// Chat-completion backend to send requests to
    pub client: &'a dyn ChatCompletion,
    pub config: &'a SummarizerConfig,
    /// Prompt template with `{title}` and `{text}` placeholders
    pub prompt_template: Option<&'a str>,
}

/// Estimated token count of `text`.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}

/// Cuts `text` to `max_tokens * CHARS_PER_TOKEN` characters when its estimate
/// exceeds `max_tokens`. The cut ignores word and sentence boundaries.
#[must_use]
pub fn fit_to_budget(text: &str, max_tokens: usize) -> String {
    let estimated = estimate_tokens(text);
    info!("Estimated token count: {estimated}");
    if estimated <= max_tokens {
        return text.to_owned();
    }

    warn!("Text too long ({estimated} est. tokens), truncating to ~{max_tokens} tokens");
    let truncated: String = text.chars().take(max_tokens * CHARS_PER_TOKEN).collect();
    info!("Truncated text to {} characters", truncated.chars().count());
    truncated
}

/// Builds the chat messages for one chapter.
#[must_use]
pub fn build_messages(template: &str, title: &str, text: &str) -> Vec<ChatMessage> {
    let prompt = template.replace("{title}", title).replace("{text}", text);
    let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];
    if !template.contains("{text}") {
        messages.push(ChatMessage::user(text));
    }
    messages
}

/// Summarizes one chapter.
///
/// The text is normalized and cut to the input budget before prompting;
/// reasoning blocks are removed from the answer.
///
/// # Errors
///
/// Returns a remote-service error if the API call fails or the answer is empty.
pub async fn summarize_chapter(
    ctx: &SummarizeContext<'_>,
    title: &str,
    text: &str,
) -> Result<String> {
    info!("Summarizing: {title}");
    let text = fit_to_budget(&normalize(text), ctx.config.max_input_tokens);
    let template = ctx.prompt_template.unwrap_or(DEFAULT_PROMPT_TEMPLATE);

    let request = ChatRequest {
        model: ctx.config.model.clone(),
        messages: build_messages(template, title, &text),
        temperature: ctx.config.temperature,
        max_tokens: ctx.config.output_token_cap,
    };

    let response = ctx.client.complete(&request).await?;
    let summary = THINK_STRIPPER_REGEX
        .replace_all(&response, "")
        .trim()
        .to_owned();
    if summary.is_empty() {
        return Err(ChapterError::EmptySummary);
    }

    debug!("Summary: {summary}");
    info!("Received summary, length: {} characters", summary.chars().count());
    Ok(summary)
}

/// Converts blank-line paragraph breaks into explicit markers for display.
#[must_use]
pub fn format_for_display(summary: &str) -> String {
    summary.replace("\n\n", "<br><br>")
}
