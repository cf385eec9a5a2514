use serde::{Deserialize, Serialize};

/// One entry of the episode list, in chronological position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub title: String,
    pub doc_id: u64,
}

/// Per-episode metadata. An empty `datetime` means the page was missing or
/// unreadable; see [`EpisodeDetail::empty`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeDetail {
    pub datetime: String,
    pub images: u32,
    pub message: String,
}

impl EpisodeDetail {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.datetime.is_empty()
    }
}
