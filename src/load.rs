//! The load module validates chapter URLs, navigates to them with a fallback
//! wait strategy, and scrolls the page until lazily loaded content stops
//! appearing.

use log::{info, warn};
use url::Url;

use crate::browser::{PageDriver, WaitUntil};
use crate::config::LoadSettings;
use crate::error::{ChapterError, Result};

/// Outcome of the scroll phase.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Materialization {
    pub initial_height: u64,
    pub final_height: u64,
    pub scrolls: usize,
    /// False when the scroll cap was hit while the page was still growing.
    pub converged: bool,
}

/// Turns user input into a chapter URL on the target site.
///
/// A missing scheme is filled in with `https://`.
///
/// # Errors
///
/// Returns [`ChapterError::Input`] if the input is empty, does not parse as a
/// URL, or its host does not contain `target_domain`.
pub fn normalize_chapter_url(raw: &str, target_domain: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ChapterError::Input("No URL provided!".to_owned()));
    }

    let lowered = raw.to_ascii_lowercase();
    let with_scheme = if lowered.starts_with("http://") || lowered.starts_with("https://") {
        raw.to_owned()
    } else {
        format!("https://{raw}")
    };

    let invalid = || ChapterError::Input(format!("Please enter a valid {target_domain} URL"));
    let url = Url::parse(&with_scheme).map_err(|_| invalid())?;
    match url.host_str() {
        Some(host) if host.contains(target_domain) => Ok(url),
        _ => Err(invalid()),
    }
}

/// Navigates to `url` and waits until the page content has materialized.
///
/// # Errors
///
/// Returns [`ChapterError::Navigation`] if both navigation attempts fail or the
/// scroll phase exceeds its budget, and propagates browser query failures.
pub async fn open_chapter(
    page: &dyn PageDriver,
    url: &Url,
    settings: &LoadSettings,
) -> Result<Materialization> {
    navigate(page, url, settings).await?;

    tokio::time::sleep(settings.settle).await;
    info!("Waited for page initialization");

    tokio::time::timeout(settings.materialize_budget, materialize(page, settings))
        .await
        .map_err(|_| {
            ChapterError::Navigation(format!(
                "page content did not settle within {:?}",
                settings.materialize_budget
            ))
        })?
}

/// Navigates with a short DOM-ready wait, retrying once with the load event.
///
/// # Errors
///
/// Returns [`ChapterError::Navigation`] carrying the second attempt's cause if
/// both attempts fail.
pub async fn navigate(page: &dyn PageDriver, url: &Url, settings: &LoadSettings) -> Result<()> {
    info!("Navigating to: {url}");
    match page
        .navigate(url, WaitUntil::DomContentLoaded, settings.dom_timeout)
        .await
    {
        Ok(()) => {
            info!("Page loaded (domcontentloaded)");
            Ok(())
        }
        Err(first) => {
            warn!("Initial page load failed: {first}, trying with longer timeout");
            page.navigate(url, WaitUntil::Load, settings.load_timeout)
                .await
                .map_err(|second| match second {
                    ChapterError::Navigation(cause) => ChapterError::Navigation(cause),
                    other => ChapterError::Navigation(other.to_string()),
                })?;
            info!("Page loaded (load event)");
            Ok(())
        }
    }
}

/// Scrolls to the bottom repeatedly until the document height stops growing.
///
/// An unchanged height is confirmed once after a longer pause before the loop
/// stops; `max_scrolls` bounds the loop either way.
///
/// # Errors
///
/// Propagates failures from the page driver.
pub async fn materialize(page: &dyn PageDriver, settings: &LoadSettings) -> Result<Materialization> {
    info!("Scrolling through page to load all content...");
    let initial_height = page.scroll_height().await?;
    let mut current_height = initial_height;
    let mut scrolls = 0;
    let mut converged = false;

    while scrolls < settings.max_scrolls {
        scrolls += 1;
        page.scroll_to_bottom().await?;
        tokio::time::sleep(settings.scroll_interval).await;

        let last_height = current_height;
        current_height = page.scroll_height().await?;
        info!(
            "Scroll {scrolls}: height {current_height} (change: {})",
            i128::from(current_height) - i128::from(last_height)
        );

        if current_height == last_height {
            tokio::time::sleep(settings.confirm_interval).await;
            let confirmed_height = page.scroll_height().await?;
            if confirmed_height == current_height {
                info!("No height change after waiting, ending scroll");
                converged = true;
                break;
            }
            current_height = confirmed_height;
        }
    }

    info!("Scrolling complete. Page height changed from {initial_height} to {current_height}");
    Ok(Materialization {
        initial_height,
        final_height: current_height,
        scrolls,
        converged,
    })
}
