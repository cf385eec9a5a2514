//! Mirror service: the cache store in front of the extractors.
//!
//! The episode list is always scraped fresh; details and images go through the
//! store first and are fetched from the publisher only on a miss.

use std::sync::Arc;

use bytes::Bytes;
use clinic_core::{
    detail, image, list, CacheStore, EpisodeDetail, EpisodeSummary, Fetcher, SiteConfig,
    StoreError,
};

pub struct Mirror {
    fetcher: Arc<dyn Fetcher>,
    site: SiteConfig,
    store: CacheStore,
}

impl Mirror {
    pub fn new(fetcher: Arc<dyn Fetcher>, site: SiteConfig, store: CacheStore) -> Self {
        Self {
            fetcher,
            site,
            store,
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub async fn episodes(&self) -> Vec<EpisodeSummary> {
        list::list_episodes(self.fetcher.as_ref(), &self.site).await
    }

    pub async fn episode_detail(&self, doc_id: u64) -> Result<EpisodeDetail, StoreError> {
        let fetcher: &dyn Fetcher = self.fetcher.as_ref();
        let site = &self.site;
        self.store
            .get_or_compute_detail(doc_id, move |id| detail::get_episode_detail(fetcher, site, id))
            .await
    }

    /// Image bytes for a 1-based index. Index 0 never exists and is answered
    /// with empty bytes without touching the store or the network.
    pub async fn episode_image(&self, doc_id: u64, image_index: u32) -> Result<Bytes, StoreError> {
        if image_index == 0 {
            return Ok(Bytes::new());
        }

        let fetcher: &dyn Fetcher = self.fetcher.as_ref();
        let site = &self.site;
        self.store
            .get_or_compute_image(doc_id, image_index, move |id, index| {
                image::get_image(fetcher, site, id, index)
            })
            .await
    }
}
