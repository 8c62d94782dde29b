//! The chapter_digest library scrapes a single web-novel chapter with headless
//! Chromium and produces an abridged narrative summary of it through a
//! chat-completion API.

pub mod browser;
pub mod chapter;
pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod load;
pub mod normalize;
pub mod pipeline;
pub mod snapshot;
pub mod summarize;

pub use error::{ChapterError, ErrorKind};
pub use extract::{SelectorChain, extract_chapter};
pub use normalize::normalize;
pub use pipeline::{run, scrape, summarize_file};
