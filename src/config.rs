//! Configuration for a search session.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes:
//!
//! ```
//! use geofacet::config::GeofacetConfig;
//!
//! let config: GeofacetConfig = serde_json::from_str(
//!     r#"{ "service": { "app_id": "APP", "api_key": "KEY" }, "max_values_per_facet": 10 }"#,
//! ).unwrap();
//! assert_eq!(config.service.index_name, "restaurants");
//! assert_eq!(config.max_values_per_facet, 10);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::distance::GeoPoint;
use crate::error::{GeofacetError, Result};
use crate::facet::FacetRegistry;

/// New York City, used until a geolocation source resolves.
pub const DEFAULT_USER_LOCATION: GeoPoint = GeoPoint {
    lat: 40.7127281,
    lng: -74.0060152,
};

/// Keeps facet lists short enough for the sidebar.
pub const DEFAULT_MAX_VALUES_PER_FACET: usize = 7;

pub const DEFAULT_DEVICE_TIMEOUT_MS: u64 = 10_000;

pub const DEFAULT_IP_LOOKUP_URL: &str = "https://ipapi.co/json/";

pub const APP_ID_ENV: &str = "GEOFACET_APP_ID";
pub const API_KEY_ENV: &str = "GEOFACET_API_KEY";
pub const INDEX_NAME_ENV: &str = "GEOFACET_INDEX_NAME";
pub const IP_LOOKUP_URL_ENV: &str = "GEOFACET_IP_LOOKUP_URL";

/// Connection settings for the hosted search service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub app_id: String,
    pub api_key: String,
    pub index_name: String,
    /// Overrides `https://{app_id}-dsn.algolia.net`.
    pub host: Option<String>,
    /// Client-side request timeout. `None` keeps the transport default.
    pub request_timeout_ms: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            app_id: String::new(),
            api_key: String::new(),
            index_name: "restaurants".to_string(),
            host: None,
            request_timeout_ms: None,
        }
    }
}

impl ServiceConfig {
    /// Base URL of the search host.
    pub fn base_url(&self) -> String {
        match &self.host {
            Some(host) => host.trim_end_matches('/').to_string(),
            None => format!("https://{}-dsn.algolia.net", self.app_id.to_lowercase()),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

/// Settings for the two geolocation sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    /// Maximum wait for the device position.
    pub device_timeout_ms: u64,
    pub ip_lookup_url: String,
    pub enable_ip_lookup: bool,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        GeolocationConfig {
            device_timeout_ms: DEFAULT_DEVICE_TIMEOUT_MS,
            ip_lookup_url: DEFAULT_IP_LOOKUP_URL.to_string(),
            enable_ip_lookup: true,
        }
    }
}

impl GeolocationConfig {
    pub fn device_timeout(&self) -> Duration {
        Duration::from_millis(self.device_timeout_ms)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeofacetConfig {
    pub service: ServiceConfig,
    /// Facets in display order.
    pub facets: FacetRegistry,
    pub max_values_per_facet: usize,
    pub hits_per_page: Option<usize>,
    /// Location used until geolocation resolves, or for good if it never does.
    pub default_location: GeoPoint,
    pub geolocation: GeolocationConfig,
}

impl Default for GeofacetConfig {
    fn default() -> Self {
        GeofacetConfig {
            service: ServiceConfig::default(),
            facets: FacetRegistry::restaurants(),
            max_values_per_facet: DEFAULT_MAX_VALUES_PER_FACET,
            hits_per_page: None,
            default_location: DEFAULT_USER_LOCATION,
            geolocation: GeolocationConfig::default(),
        }
    }
}

impl GeofacetConfig {
    /// Load and validate a JSON config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: GeofacetConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `GEOFACET_*` environment overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup; empty values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(app_id) = get(APP_ID_ENV) {
            self.service.app_id = app_id;
        }
        if let Some(api_key) = get(API_KEY_ENV) {
            self.service.api_key = api_key;
        }
        if let Some(index_name) = get(INDEX_NAME_ENV) {
            self.service.index_name = index_name;
        }
        if let Some(url) = get(IP_LOOKUP_URL_ENV) {
            self.geolocation.ip_lookup_url = url;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.service.index_name.trim().is_empty() {
            return Err(GeofacetError::invalid_config("index name must not be empty"));
        }
        if self.max_values_per_facet == 0 {
            return Err(GeofacetError::invalid_config(
                "max_values_per_facet must be positive",
            ));
        }
        if self.hits_per_page == Some(0) {
            return Err(GeofacetError::invalid_config("hits_per_page must be positive"));
        }
        if !self.default_location.is_valid() {
            return Err(GeofacetError::invalid_config(format!(
                "default location {} is out of range",
                self.default_location
            )));
        }
        if self.geolocation.device_timeout_ms == 0 {
            return Err(GeofacetError::invalid_config(
                "device geolocation timeout must be positive",
            ));
        }
        Ok(())
    }
}
