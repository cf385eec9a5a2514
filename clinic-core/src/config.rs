use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClinicConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:clinic.db".to_string(),
            max_connections: 4,
        }
    }
}

/// When `read_only` is set the store neither creates its schema nor writes
/// computed results back; it serves whatever a prebuilt database holds.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CacheConfig {
    #[serde(default)]
    pub read_only: bool,
}

/// Fixed layout of the publisher's site. Defaults are the live values.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SiteConfig {
    /// Primary origin, used for every request.
    pub base_url: String,
    /// Origin retried once when an episode page fails over the primary one.
    pub fallback_base_url: String,
    pub first_year: u16,
    pub last_year: u16,
    pub excluded_ids: Vec<u64>,
    /// Candidate image file names, tried in order. `{idx}` is the two-digit
    /// index, `{idx_a}` the same index with every `0` replaced by `a`.
    pub image_patterns: Vec<String>,
    pub max_probe_images: u32,
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dc.watch.impress.co.jp".to_string(),
            fallback_base_url: "http://dc.watch.impress.co.jp".to_string(),
            first_year: 2017,
            last_year: 2029,
            excluded_ids: vec![1191350],
            image_patterns: [
                "{idx}.png",
                "{idx_a}.png",
                "a{idx}.png",
                "x{idx}.png",
                "y{idx}.png",
                "z{idx}.png",
                "{idx}a.png",
                "{idx}.jpg",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            max_probe_images: 99,
            user_agent: concat!("clinic-mirror/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_seconds: 30,
        }
    }
}

impl SiteConfig {
    /// Site config with both origins pointed at `base_url` (mock servers, mirrors).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            fallback_base_url: base_url.clone(),
            base_url,
            ..Self::default()
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5042,
        }
    }
}

impl ClinicConfig {
    /// Load from a TOML file (optional) layered under `CLINIC__*` environment
    /// variables, e.g. `CLINIC__DATABASE__URL`.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("CLINIC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_image_patterns_order() {
        let site = SiteConfig::default();
        assert_eq!(site.image_patterns.first().map(String::as_str), Some("{idx}.png"));
        assert_eq!(site.image_patterns.last().map(String::as_str), Some("{idx}.jpg"));
        assert_eq!(site.image_patterns.len(), 8);
    }

    #[test]
    fn test_with_base_url_overrides_both_origins() {
        let site = SiteConfig::with_base_url("http://127.0.0.1:9999");
        assert_eq!(site.base_url, "http://127.0.0.1:9999");
        assert_eq!(site.fallback_base_url, "http://127.0.0.1:9999");
        assert_eq!(site.excluded_ids, vec![1191350]);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = ClinicConfig::load("does-not-exist-clinic.toml").expect("defaults");
        assert_eq!(config.http.port, 5042);
        assert!(!config.cache.read_only);
        assert_eq!(config.site.first_year, 2017);
    }

    #[test]
    fn test_load_partial_sections_keep_defaults() {
        let path = std::env::temp_dir().join("clinic-config-partial-test.toml");
        std::fs::write(
            &path,
            "[site]\nfirst_year = 2019\n\n[cache]\nread_only = true\n\n[http]\nport = 8080\n",
        )
        .unwrap();

        let config = ClinicConfig::load(path.to_str().unwrap()).expect("config");
        assert_eq!(config.site.first_year, 2019);
        assert_eq!(config.site.last_year, 2029);
        assert_eq!(config.site.image_patterns.len(), 8);
        assert!(config.cache.read_only);
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.http.host, "127.0.0.1");

        std::fs::remove_file(&path).ok();
    }
}
