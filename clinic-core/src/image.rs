//! Panel image resolver.
//!
//! The site named its image files inconsistently over the years, so each
//! request walks `SiteConfig::image_patterns` in order and keeps the first hit.

use bytes::Bytes;

use crate::config::SiteConfig;
use crate::fetcher::Fetcher;

/// Bytes of the first candidate that answers, or empty bytes if none do.
pub async fn get_image(
    fetcher: &dyn Fetcher,
    site: &SiteConfig,
    doc_id: u64,
    image_index: u32,
) -> Bytes {
    for url in site.image_candidates(doc_id, image_index) {
        match fetcher.fetch(&url).await {
            Ok(bytes) => {
                tracing::debug!(doc_id, image_index, url = %url, "Image resolved");
                return bytes;
            }
            Err(e) => tracing::trace!(url = %url, error = %e, "Image candidate missed"),
        }
    }

    tracing::debug!(doc_id, image_index, "No image candidate matched");
    Bytes::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::MemoryFetcher;

    #[tokio::test]
    async fn test_get_image_first_candidate_wins() {
        let site = SiteConfig::with_base_url("http://x");
        let candidates = site.image_candidates(1050123, 1);
        let fetcher = MemoryFetcher::new()
            .with(candidates[0].clone(), vec![1u8])
            .with(candidates[2].clone(), vec![3u8]);

        let bytes = get_image(&fetcher, &site, 1050123, 1).await;
        assert_eq!(&bytes[..], &[1u8]);
        assert_eq!(fetcher.requests(), vec![candidates[0].clone()]);
    }

    #[tokio::test]
    async fn test_get_image_walks_candidates_in_order() {
        let site = SiteConfig::with_base_url("http://x");
        let candidates = site.image_candidates(1050123, 10);
        // only the `{idx}a.png` and `.jpg` variants exist; the former must win
        let fetcher = MemoryFetcher::new()
            .with(candidates[6].clone(), b"png".to_vec())
            .with(candidates[7].clone(), b"jpg".to_vec());

        let bytes = get_image(&fetcher, &site, 1050123, 10).await;
        assert_eq!(&bytes[..], b"png");
        assert_eq!(fetcher.requests(), candidates[..7].to_vec());
        assert!(fetcher.requests()[6].ends_with("/10a.png"));
    }

    #[tokio::test]
    async fn test_get_image_all_missing_is_empty() {
        let site = SiteConfig::with_base_url("http://x");
        let fetcher = MemoryFetcher::new();

        let bytes = get_image(&fetcher, &site, 1050123, 2).await;
        assert!(bytes.is_empty());
        assert_eq!(fetcher.requests(), site.image_candidates(1050123, 2));
    }
}
