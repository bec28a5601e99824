use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Livedesk configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fabric: FabricConfig,
    pub site: SiteConfig,
    pub poller: PollerConfig,
    pub logging: LoggingConfig,
}

/// Connection to the fabric bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricConfig {
    /// Bridge endpoint receiving `{id, method, params}` envelopes
    pub bridge_url: String,
    pub auth_token: Option<String>,
    /// Base URL of the player app used to build embed links
    pub display_app_url: Option<String>,
    /// Network name, e.g. `"main"` or `"demo"`
    pub environment: String,
    pub request_timeout_seconds: u64,
    /// Attempts for idempotent reads, including the first
    pub read_retries: usize,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            bridge_url: "http://localhost:8008/bridge".to_string(),
            auth_token: None,
            display_app_url: None,
            environment: "main".to_string(),
            request_timeout_seconds: 30,
            read_retries: 3,
        }
    }
}

impl FabricConfig {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Tenant site object holding the stream listing and ladder profiles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub library_id: String,
    pub object_id: String,
    /// Access group granted manage rights on created objects
    pub access_group: Option<String>,
    /// Content type applied to newly created stream objects
    pub stream_content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    pub browse_interval_seconds: u64,
    pub monitor_interval_seconds: u64,
    pub concurrency: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            browse_interval_seconds: 60,
            monitor_interval_seconds: 15,
            concurrency: 15,
        }
    }
}

impl PollerConfig {
    #[must_use]
    pub const fn browse_interval(&self) -> Duration {
        Duration::from_secs(self.browse_interval_seconds)
    }

    #[must_use]
    pub const fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `"json"` or `"pretty"`
    pub format: String,
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

impl Config {
    /// Build the configuration from defaults, then `config_file` when it
    /// exists, then `LIVEDESK_*` variables, later sources overriding earlier
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // LIVEDESK_FABRIC__BRIDGE_URL, LIVEDESK_POLLER__CONCURRENCY, ...
        builder = builder.add_source(
            Environment::with_prefix("LIVEDESK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Check the configuration, collecting every problem found
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if url::Url::parse(&self.fabric.bridge_url).is_err() {
            errors.push(format!("fabric.bridge_url is not a valid URL: {}", self.fabric.bridge_url));
        }
        if let Some(app_url) = &self.fabric.display_app_url {
            if url::Url::parse(app_url).is_err() {
                errors.push(format!("fabric.display_app_url is not a valid URL: {app_url}"));
            }
        }
        if self.fabric.request_timeout_seconds == 0 {
            errors.push("fabric.request_timeout_seconds must be greater than 0".to_string());
        }
        if self.fabric.read_retries == 0 {
            errors.push("fabric.read_retries must be at least 1".to_string());
        }

        if self.site.library_id.is_empty() {
            errors.push("site.library_id is required".to_string());
        } else if !self.site.library_id.starts_with("ilib") {
            errors.push(format!("site.library_id must start with \"ilib\": {}", self.site.library_id));
        }
        if self.site.object_id.is_empty() {
            errors.push("site.object_id is required".to_string());
        } else if !self.site.object_id.starts_with("iq__") {
            errors.push(format!("site.object_id must start with \"iq__\": {}", self.site.object_id));
        }

        if self.poller.browse_interval_seconds == 0 || self.poller.monitor_interval_seconds == 0 {
            errors.push("poller intervals must be greater than 0".to_string());
        }
        if self.poller.concurrency == 0 {
            errors.push("poller.concurrency must be greater than 0".to_string());
        }

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "logging.format must be \"json\" or \"pretty\": {}",
                self.logging.format
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
