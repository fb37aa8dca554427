//! Configuration loading and management

use crate::core::{ConfigError, PriceRange, RetryPolicy};
use crate::core::query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, SortKey};
use crate::shop::grid::GridLayout;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding [`ApiConfig::base_url`]
pub const ENV_API_URL: &str = "STOREFRONT_API_URL";

/// Environment variable overriding [`ApiConfig::api_token`]
pub const ENV_API_TOKEN: &str = "STOREFRONT_API_TOKEN";

/// Environment variable overriding [`GeocoderConfig::base_url`]
pub const ENV_GEOCODER_URL: &str = "STOREFRONT_GEOCODER_URL";

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the REST backend, without trailing slash
    pub base_url: String,

    /// Master API token sent with every request, if any
    pub api_token: Option<String>,

    /// Per-request timeout of the HTTP client
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_token: None,
            timeout_secs: 30,
        }
    }
}

/// Catalog browsing behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub page_size: usize,
    pub ordering: SortKey,

    /// Bounds of the price slider
    pub price_domain: PriceRange,

    /// Quiet period before a price change is emitted
    pub debounce_ms: u64,

    /// How long fetched pages are reused without refetching
    pub stale_after_secs: u64,

    pub retry: RetryPolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            ordering: SortKey::MenuOrder,
            price_domain: PriceRange::default(),
            debounce_ms: 300,
            stale_after_secs: 30,
            retry: RetryPolicy::default(),
        }
    }
}

impl CatalogConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

/// Geocoding service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// Nominatim-compatible endpoint
    pub base_url: String,

    /// Nominatim requires an identifying user agent
    pub user_agent: String,

    /// Restrict forward searches to these ISO country codes
    pub country_codes: Vec<String>,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("storefront/", env!("CARGO_PKG_VERSION")).to_string(),
            country_codes: Vec::new(),
        }
    }
}

/// Complete client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    pub api: ApiConfig,
    pub catalog: CatalogConfig,
    pub grid: GridLayout,
    pub geocoder: GeocoderConfig,
}

impl StorefrontConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
            message: format!("{}: {}", path, e),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Load {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function
    ///
    /// Empty values are ignored so an exported but blank variable does not
    /// wipe a configured URL.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_API_URL) {
            self.api.base_url = url;
        }
        if let Some(token) = get(ENV_API_TOKEN) {
            self.api.api_token = Some(token);
        }
        if let Some(url) = get(ENV_GEOCODER_URL) {
            self.geocoder.base_url = url;
        }
    }

    /// Reject values the client cannot work with
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let invalid = |field: &str, message: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            message: message.to_string(),
        };

        if self.api.base_url.trim().is_empty() {
            return Err(invalid("api.base_url", "must not be empty"));
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(invalid("api.base_url", "must be an http(s) URL"));
        }
        if self.catalog.page_size == 0 || self.catalog.page_size > MAX_PAGE_SIZE {
            return Err(invalid(
                "catalog.page_size",
                &format!("must be between 1 and {}", MAX_PAGE_SIZE),
            ));
        }
        let domain = self.catalog.price_domain;
        if !domain.min.is_finite() || !domain.max.is_finite() || domain.min > domain.max {
            return Err(invalid("catalog.price_domain", "min must not exceed max"));
        }
        if self.catalog.retry.max_attempts == 0 {
            return Err(invalid("catalog.retry.max_attempts", "must be at least 1"));
        }
        self.grid
            .validate()
            .map_err(|message| invalid("grid.breakpoints", &message))?;
        Ok(())
    }

    /// Backend base URL without trailing slash
    pub fn api_base(&self) -> &str {
        self.api.base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = StorefrontConfig::default();

        assert_eq!(config.catalog.page_size, 12);
        assert_eq!(config.catalog.ordering, SortKey::MenuOrder);
        assert_eq!(config.catalog.debounce(), Duration::from_millis(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_serialization() {
        let config = StorefrontConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();

        let parsed = StorefrontConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.api.base_url, config.api.base_url);
        assert_eq!(parsed.catalog.ordering, config.catalog.ordering);
        assert_eq!(parsed.grid, config.grid);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_URL, "https://shop.example.com/"),
            (ENV_API_TOKEN, "master-token"),
            (ENV_GEOCODER_URL, "  "),
        ]);
        let mut config = StorefrontConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api_base(), "https://shop.example.com");
        assert_eq!(config.api.api_token.as_deref(), Some("master-token"));
        assert_eq!(
            config.geocoder.base_url,
            GeocoderConfig::default().base_url
        );
    }
}
