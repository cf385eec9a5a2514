pub mod config;
pub mod db;
pub mod detail;
pub mod error;
pub mod fetcher;
pub mod image;
pub mod list;
pub mod models;
pub mod site;
pub mod store;

pub use config::{ClinicConfig, SiteConfig};
pub use error::ClinicError;
pub use fetcher::{FetchError, Fetcher, HttpFetcher};
pub use models::{EpisodeDetail, EpisodeSummary};
pub use store::{CacheStore, StoreError};
