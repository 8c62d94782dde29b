use crate::pipeline_extras::{
    ScriptedPage, StubChatClient, chapter_url, numbered_paragraphs, scratch_dir,
};
use chapter_digest::ChapterError;
use chapter_digest::chapter::{ExtractedChapter, read_chapter, write_chapter};
use chapter_digest::config::{ScrapeSettings, SummarizerConfig};
use chapter_digest::extract::SelectorChain;
use chapter_digest::pipeline::{
    ScrapeOutput, Stage, finish, scrape, scrape_page, summarize_file,
};
use async_trait::async_trait;
use chapter_digest::summarize::{ChatCompletion, ChatRequest, HttpChatClient, SummarizeContext};
use spectral::assert_that;
use std::path::{Path, PathBuf};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

mod pipeline_extras;

/// Deletes the artifact while the summary is being produced, so the final
/// cleanup finds nothing to remove.
struct VanishingArtifactClient {
    artifact: PathBuf,
}

#[async_trait]
impl ChatCompletion for VanishingArtifactClient {
    async fn complete(&self, _request: &ChatRequest) -> chapter_digest::error::Result<String> {
        std::fs::remove_file(&self.artifact)?;
        Ok("A short retelling.".to_owned())
    }
}

fn settings_in(dir: &Path) -> ScrapeSettings {
    ScrapeSettings {
        uploads_dir: dir.to_path_buf(),
        ..ScrapeSettings::default()
    }
}

fn long_summary() -> String {
    let paragraph = "Mara watched the tide retreat from the lighthouse gallery. ".repeat(45);
    [paragraph.trim(), paragraph.trim(), paragraph.trim()].join("\n\n")
}

#[tokio::test]
async fn foreign_url_is_rejected_before_launch() {
    let scratch = scratch_dir();
    let dir = scratch.path();
    let failed = scrape(
        "example.com/story/123/chapter",
        &settings_in(dir),
        &SelectorChain::default(),
    )
    .await
    .expect_err("Expected the URL to be rejected.");

    assert!(matches!(failed.error, ChapterError::Input(_)));
    assert_that(&failed.stage).is_equal_to(Stage::Received);
    assert!(
        std::fs::read_dir(dir)
            .expect("Expected scratch dir to be readable.")
            .next()
            .is_none()
    );
}

#[tokio::test(start_paused = true)]
async fn successful_run_persists_summarizes_and_cleans_up() {
    let scratch = scratch_dir();
    let dir = scratch.path();
    let page = ScriptedPage::new()
        .title("h1", "Browse")
        .title("h1.h5", "Chapter One: Arrival")
        .paragraphs("pre p", numbered_paragraphs(3))
        .paragraphs(".page-content p", numbered_paragraphs(12))
        .heights(&[800, 1600, 1600, 1600]);

    let scraped = scrape_page(&page, &chapter_url(), &settings_in(dir), &SelectorChain::default())
        .await
        .expect("Expected the chapter to be scraped.");
    assert_that(&scraped).is_equal_to(ScrapeOutput {
        title: "Chapter One: Arrival".to_owned(),
        filename: "Chapter One Arrival.txt".to_owned(),
    });

    let artifact = dir.join(&scraped.filename);
    let content = std::fs::read_to_string(&artifact).expect("Expected the artifact to exist.");
    let lines: Vec<&str> = content.split('\n').collect();
    assert_that(&lines.len()).is_equal_to(14);
    let owned: Vec<String> = lines.iter().map(|line| (*line).to_owned()).collect();
    assert_that(&owned.first().cloned()).is_equal_to(Some("Chapter One: Arrival".to_owned()));
    assert_that(&owned.get(1).cloned()).is_equal_to(Some(String::new()));
    assert_that(&owned.into_iter().skip(2).collect::<Vec<_>>())
        .is_equal_to(numbered_paragraphs(12));

    let config = SummarizerConfig::default();
    let client = StubChatClient::new(long_summary());
    let ctx = SummarizeContext {
        client: &client,
        config: &config,
        prompt_template: None,
    };
    let completed = finish(scraped, dir, &ctx)
        .await
        .expect("Expected the run to complete.");

    assert_that(&completed.title).is_equal_to("Chapter One: Arrival".to_owned());
    assert!(completed.summary.contains("<br><br>"));
    assert!(!completed.summary.contains("\n\n"));
    let words = long_summary().split_whitespace().count();
    assert!((1000..=1500).contains(&words), "{words} words");
    assert!(!artifact.exists());
}

#[tokio::test]
async fn rate_limited_summary_keeps_the_artifact() {
    let scratch = scratch_dir();
    let dir = scratch.path();
    let chapter = ExtractedChapter::new("Chapter Two".to_owned(), numbered_paragraphs(8));
    let filename = write_chapter(dir, &chapter).expect("Expected the artifact to be written.");

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;
    let config = SummarizerConfig {
        api_key: "test-key".to_owned(),
        endpoint: format!("{}/openai/v1/chat/completions", server.uri()),
        ..SummarizerConfig::default()
    };
    let client = HttpChatClient::new(&config).expect("Expected client to build.");
    let ctx = SummarizeContext {
        client: &client,
        config: &config,
        prompt_template: None,
    };

    let scraped = ScrapeOutput {
        title: chapter.title.clone(),
        filename: filename.clone(),
    };
    let failed = finish(scraped, dir, &ctx)
        .await
        .expect_err("Expected summarization to fail.");

    assert_that(&failed.error.status()).is_equal_to(Some(429));
    assert_that(&failed.stage).is_equal_to(Stage::Persisted);
    assert!(dir.join(&filename).exists());
}

#[tokio::test(start_paused = true)]
async fn extraction_failure_writes_nothing() {
    let scratch = scratch_dir();
    let dir = scratch.path();
    let page = ScriptedPage::new()
        .title("h1", "Chapter Three: Silence")
        .paragraphs("p, .p", vec!["Vote".to_owned(), "Share".to_owned()]);

    let failed = scrape_page(&page, &chapter_url(), &settings_in(dir), &SelectorChain::default())
        .await
        .expect_err("Expected extraction to fail.");

    assert!(matches!(failed.error, ChapterError::Extraction));
    assert_that(&failed.stage).is_equal_to(Stage::Navigated);
    assert!(
        std::fs::read_dir(dir)
            .expect("Expected scratch dir to be readable.")
            .next()
            .is_none()
    );
}

#[test]
fn artifact_round_trips_title_and_body() {
    let scratch = scratch_dir();
    let dir = scratch.path();
    let chapter = ExtractedChapter::new(
        "Part 4: \"Home?\"".to_owned(),
        vec!["She came back.".to_owned(), "Nobody noticed...".to_owned()],
    );
    let filename = write_chapter(dir, &chapter).expect("Expected the artifact to be written.");
    assert_that(&filename).is_equal_to("Part 4 Home.txt".to_owned());

    let (_, request) = read_chapter(dir, &filename).expect("Expected the artifact to be read.");
    assert_that(&request.chapter_title).is_equal_to(chapter.title.clone());
    assert_that(&request.chapter_text).is_equal_to(chapter.raw_text.clone());
}

#[tokio::test]
async fn summarize_rejects_missing_and_escaping_names() {
    let scratch = scratch_dir();
    let dir = scratch.path();
    let config = SummarizerConfig::default();
    let client = StubChatClient::new("Summary.");
    let ctx = SummarizeContext {
        client: &client,
        config: &config,
        prompt_template: None,
    };

    for name in ["", "missing.txt", "../secret.txt", "nested/file.txt"] {
        let result = summarize_file(dir, name, &ctx).await;
        assert!(
            matches!(result, Err(ChapterError::Input(_))),
            "{name:?} should be rejected"
        );
    }
    assert!(client.requests.lock().expect("Stub mutex poisoned").is_empty());
}

#[tokio::test]
async fn summarize_leaves_the_artifact_in_place() {
    let scratch = scratch_dir();
    let dir = scratch.path();
    let chapter = ExtractedChapter::new("Chapter Five".to_owned(), numbered_paragraphs(6));
    let filename = write_chapter(dir, &chapter).expect("Expected the artifact to be written.");

    let config = SummarizerConfig::default();
    let client = StubChatClient::new("One.\n\nTwo.");
    let ctx = SummarizeContext {
        client: &client,
        config: &config,
        prompt_template: None,
    };
    let summarized = summarize_file(dir, &filename, &ctx)
        .await
        .expect("Expected a summary.");

    assert_that(&summarized.summary).is_equal_to("One.<br><br>Two.".to_owned());
    assert_that(&summarized.file_path).is_equal_to(dir.join(&filename));
    assert!(summarized.file_path.exists());
}

#[tokio::test]
async fn failed_cleanup_does_not_fail_the_run() {
    let scratch = scratch_dir();
    let dir = scratch.path();
    let chapter = ExtractedChapter::new("Chapter Six".to_owned(), numbered_paragraphs(6));
    let filename = write_chapter(dir, &chapter).expect("Expected the artifact to be written.");

    let config = SummarizerConfig::default();
    let client = VanishingArtifactClient {
        artifact: dir.join(&filename),
    };
    let ctx = SummarizeContext {
        client: &client,
        config: &config,
        prompt_template: None,
    };
    let scraped = ScrapeOutput {
        title: chapter.title.clone(),
        filename,
    };
    let completed = finish(scraped, dir, &ctx)
        .await
        .expect("Expected the run to complete despite the missing artifact.");

    assert_that(&completed.title).is_equal_to("Chapter Six".to_owned());
    assert_that(&completed.summary).is_equal_to("A short retelling.".to_owned());
}
