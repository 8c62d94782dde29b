//! The chapter module holds the extracted chapter and the text artifact it is
//! handed over in between the scrape and summarize operations.

use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{CHAPTER_FILE_EXTENSION, MAX_FILENAME_CHARS};
use crate::error::{ChapterError, Result};

const FORBIDDEN_FILENAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// A chapter pulled out of a rendered page.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ExtractedChapter {
    pub title: String,
    /// Never empty for a successfully extracted chapter.
    pub paragraphs: Vec<String>,
    /// Paragraphs joined by a single newline.
    pub raw_text: String,
}

impl ExtractedChapter {
    #[must_use]
    pub fn new(title: String, paragraphs: Vec<String>) -> Self {
        let raw_text = paragraphs.join("\n");
        Self {
            title,
            paragraphs,
            raw_text,
        }
    }
}

/// Title and body read back from a chapter artifact.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SummaryRequest {
    pub chapter_title: String,
    pub chapter_text: String,
}

impl SummaryRequest {
    /// Splits artifact content into the title (first line) and the body.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut lines = content.split('\n');
        let chapter_title = lines.next().unwrap_or_default().trim().to_owned();
        let chapter_text = lines.collect::<Vec<_>>().join("\n").trim().to_owned();
        Self {
            chapter_title,
            chapter_text,
        }
    }
}

/// Strips characters that are invalid in filenames and caps the length.
#[must_use]
pub fn sanitize_filename(title: &str) -> String {
    title
        .chars()
        .filter(|c| !FORBIDDEN_FILENAME_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect()
}

/// Artifact filename for a chapter title.
#[must_use]
pub fn chapter_filename(title: &str) -> String {
    format!("{}.{CHAPTER_FILE_EXTENSION}", sanitize_filename(title))
}

/// Writes the chapter artifact into `dir` and returns its filename.
///
/// The file holds the title, a blank line, then the raw text.
///
/// # Errors
///
/// Returns [`ChapterError::Io`] if the directory or file cannot be written.
pub fn write_chapter(dir: &Path, chapter: &ExtractedChapter) -> Result<String> {
    fs::create_dir_all(dir)?;
    let filename = chapter_filename(&chapter.title);
    let path = dir.join(&filename);

    info!("Saving content to file: {}", path.display());
    fs::write(&path, format!("{}\n\n{}", chapter.title, chapter.raw_text))?;
    Ok(filename)
}

/// Resolves a caller-supplied artifact name inside `dir`.
///
/// # Errors
///
/// Returns [`ChapterError::Input`] for empty names, names that would escape
/// `dir`, and files that do not exist.
pub fn resolve_chapter_path(dir: &Path, filename: &str) -> Result<PathBuf> {
    let not_found = || ChapterError::Input(format!("File not found: {filename}"));
    if filename.trim().is_empty() {
        return Err(ChapterError::Input("No filename provided".to_owned()));
    }
    if filename.contains(['/', '\\']) || filename == "." || filename == ".." {
        return Err(not_found());
    }

    let path = dir.join(filename);
    if path.is_file() {
        Ok(path)
    } else {
        Err(not_found())
    }
}

/// Reads a chapter artifact back.
///
/// # Errors
///
/// Returns [`ChapterError::Input`] if the name is unusable or the file is
/// missing, and [`ChapterError::Io`] if it cannot be read.
pub fn read_chapter(dir: &Path, filename: &str) -> Result<(PathBuf, SummaryRequest)> {
    let path = resolve_chapter_path(dir, filename)?;
    let content = fs::read_to_string(&path)?;
    info!("Read file content, length: {} characters", content.chars().count());
    Ok((path, SummaryRequest::parse(&content)))
}

/// Deletes a chapter artifact. Failures are logged and otherwise ignored.
pub fn remove_chapter(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => info!("Successfully deleted file: {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("File not found for deletion: {}", path.display());
        }
        Err(e) => warn!("Failed to delete file {}: {e}", path.display()),
    }
}
