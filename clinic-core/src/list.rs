//! Episode list: walks the yearly index pages in ascending order.

use regex::Regex;
use scraper::{Html, Selector};

use crate::config::SiteConfig;
use crate::fetcher::Fetcher;
use crate::models::EpisodeSummary;

const ITEM_SELECTOR: &str = "div#main li.item.comic.clinic";
const LINK_SELECTOR: &str = "p.title > a";

/// Fetch every index page from `first_year` on and concatenate the episodes
/// oldest first. The first unreachable year ends the walk.
pub async fn list_episodes(fetcher: &dyn Fetcher, site: &SiteConfig) -> Vec<EpisodeSummary> {
    let mut episodes = Vec::new();

    for year in site.first_year..=site.last_year {
        let url = site.index_url(year);
        let html = match fetcher.fetch_text(&url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::debug!(year, error = %e, "No index page, stopping");
                break;
            }
        };

        let page = parse_index_page(&html, site);
        tracing::debug!(year, count = page.len(), "Parsed index page");
        episodes.extend(page);
    }

    tracing::info!(count = episodes.len(), "Episode list assembled");
    episodes
}

/// Parse one index page into chronological order (the site lists newest first).
pub fn parse_index_page(html: &str, site: &SiteConfig) -> Vec<EpisodeSummary> {
    let (Ok(item_selector), Ok(link_selector)) =
        (Selector::parse(ITEM_SELECTOR), Selector::parse(LINK_SELECTOR))
    else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut page = Vec::new();

    for item in document.select(&item_selector) {
        let Some(link) = item.select(&link_selector).next() else {
            continue;
        };
        let Some(doc_id) = link.value().attr("href").and_then(parse_doc_id) else {
            tracing::debug!("Skipping list item without an episode link");
            continue;
        };
        if site.is_excluded(doc_id) {
            continue;
        }

        page.push(EpisodeSummary {
            title: link.text().collect::<String>().trim().to_string(),
            doc_id,
        });
    }

    page.reverse();
    page
}

/// The last run of digits directly before `.html` in an episode URL.
pub fn parse_doc_id(href: &str) -> Option<u64> {
    let re = Regex::new(r"(\d+)\.html").ok()?;
    re.captures_iter(href)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
