//! Episode detail: publish date, panel count and the caption above the
//! disclaimer.
//!
//! Every failure (both origins unreachable, no publish-date element) collapses
//! to [`EpisodeDetail::empty`]. Nothing here returns an error.

use scraper::{Html, Selector};

use crate::config::SiteConfig;
use crate::fetcher::Fetcher;
use crate::models::EpisodeDetail;

/// Opening words of the fiction disclaimer printed under every caption.
pub const DISCLAIMER_SENTINEL: &str = "※本コンテンツはフィクションであり";

const PUBLISH_DATE_SELECTOR: &str = "p.publish-date";
const RESOURCE_IMAGE_SELECTOR: &str = "div.img-wrap-w > img.resource";
const PARAGRAPH_SELECTOR: &str = "p";

/// What the episode page itself says, before any image probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodePage {
    pub datetime: String,
    pub resource_images: u32,
    pub caption: String,
}

pub async fn get_episode_detail(
    fetcher: &dyn Fetcher,
    site: &SiteConfig,
    doc_id: u64,
) -> EpisodeDetail {
    let Some(html) = fetch_episode_page(fetcher, site, doc_id).await else {
        tracing::debug!(doc_id, "Episode page unreachable over both origins");
        return EpisodeDetail::empty();
    };

    let Some(page) = parse_episode_page(&html) else {
        tracing::debug!(doc_id, "Episode page has no publish date");
        return EpisodeDetail::empty();
    };

    let images = if page.resource_images > 0 {
        page.resource_images
    } else {
        // Older pages predate the resource-image markup.
        count_numbered_images(fetcher, site, doc_id).await
    };

    EpisodeDetail {
        datetime: page.datetime,
        images,
        message: page.caption,
    }
}

/// Primary origin first, then one retry over the fallback origin.
async fn fetch_episode_page(fetcher: &dyn Fetcher, site: &SiteConfig, doc_id: u64) -> Option<String> {
    for url in site.episode_urls(doc_id) {
        match fetcher.fetch_text(&url).await {
            Ok(html) => return Some(html),
            Err(e) => tracing::debug!(doc_id, url = %url, error = %e, "Episode page fetch failed"),
        }
    }
    None
}

/// Probe `01.png`, `02.png`, … until the first miss.
async fn count_numbered_images(fetcher: &dyn Fetcher, site: &SiteConfig, doc_id: u64) -> u32 {
    let mut count = 0;
    for index in 1..=site.max_probe_images {
        if fetcher.fetch(&site.numbered_image_url(doc_id, index)).await.is_err() {
            break;
        }
        count += 1;
    }
    count
}

/// Returns `None` when the page carries no publish-date element.
pub fn parse_episode_page(html: &str) -> Option<EpisodePage> {
    let date_selector = Selector::parse(PUBLISH_DATE_SELECTOR).ok()?;
    let image_selector = Selector::parse(RESOURCE_IMAGE_SELECTOR).ok()?;
    let paragraph_selector = Selector::parse(PARAGRAPH_SELECTOR).ok()?;

    let document = Html::parse_document(html);

    let datetime = document
        .select(&date_selector)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();

    let resource_images = document.select(&image_selector).count() as u32;

    let paragraphs: Vec<String> = document
        .select(&paragraph_selector)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .collect();

    Some(EpisodePage {
        datetime,
        resource_images,
        caption: extract_caption(&paragraphs),
    })
}

/// The block of non-empty paragraphs directly above the first disclaimer
/// paragraph, in reading order, joined by blank lines. The walk stops at an
/// empty paragraph and never reaches the first paragraph of the page.
pub fn extract_caption(paragraphs: &[String]) -> String {
    let Some(sentinel) = paragraphs.iter().position(|p| p.contains(DISCLAIMER_SENTINEL)) else {
        return String::new();
    };

    let mut block: Vec<&str> = paragraphs
        .get(1..sentinel)
        .unwrap_or(&[])
        .iter()
        .rev()
        .take_while(|p| !p.is_empty())
        .map(String::as_str)
        .collect();
    block.reverse();
    block.join("\n\n")
}
