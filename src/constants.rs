pub const API_KEY_ENV_NAME: &str = "GROQ_API_KEY";
pub const MODEL_ENV_NAME: &str = "CHAPTER_DIGEST_MODEL";
pub const ENDPOINT_ENV_NAME: &str = "CHAPTER_DIGEST_ENDPOINT";

pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";

/// Only chapter URLs whose host contains this string are scraped.
pub const TARGET_DOMAIN: &str = "wattpad.com";

pub const UNTITLED_CHAPTER: &str = "Untitled Chapter";
pub const CHAPTER_FILE_EXTENSION: &str = "txt";
pub const MAX_FILENAME_CHARS: usize = 50;

/// Title candidates, generic headings first.
pub const TITLE_SELECTORS: &[&str] = &[
    "h1",
    "h1.h5",
    "h2.font-semibold",
    "h1[data-part-title]",
    ".story-parts-title h1",
    ".story-info__title",
    ".part-title",
    ".part-header__title",
];

/// Paragraph container candidates, most specific first.
pub const PARAGRAPH_SELECTORS: &[&str] = &[
    "pre p",
    ".page-content p",
    ".story-parts__part p",
    ".page-read p",
    ".reader-text p",
    "[data-page-number] p",
    "[role=\"article\"] p",
    ".panel-reading p",
];

pub const GENERIC_PARAGRAPH_SELECTOR: &str = "p, .p";

pub(crate) const THINK_STRIPPER: &str = r"<think>[\s\S]*</think>\s*";

pub(crate) const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that provides high-quality summaries of fiction content.";

pub(crate) const DEFAULT_PROMPT_TEMPLATE: &str = r#"This is a chapter of a web-novel story. Read the entire chapter carefully and summarize it in a story format.

IMPORTANT: Pay special attention to character names, places, and key terms exactly as they appear in the original text. Do not substitute or change any proper nouns. Maintain all character relationships and dynamics exactly as presented.

Ensure the summary is a rich, immersive retelling that mirrors the original narrative while maintaining its tone, style, and pacing in a seamless flow.

The summary must be approximately 1000-1500 words long, preserving the authenticity of the original chapter.

Do not introduce any new storylines, subplots, or additional details that are not in the original text.

Output only the summary. No introductory or concluding remarks, no explanations about word count, and no analysis.

Chapter Title: {title}

Chapter Content:
{text}"#;
