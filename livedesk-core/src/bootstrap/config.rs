//! Configuration loading

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::Config;

fn existing(path: &str) -> Option<String> {
    Path::new(path).exists().then(|| path.to_string())
}

/// Load and validate configuration.
///
/// Config file search order:
/// 1. `explicit` (a command-line flag); it must exist
/// 2. `LIVEDESK_CONFIG_PATH` environment variable
/// 3. `./config.yaml`
/// 4. `/etc/livedesk/config.yaml`
/// 5. Environment variables only
///
/// `LIVEDESK_*` environment variables override file values in every case.
pub fn load_config(explicit: Option<&str>) -> Result<Config> {
    let config_path = match explicit {
        Some(path) => {
            anyhow::ensure!(Path::new(path).exists(), "Config file {path} does not exist");
            Some(path.to_string())
        }
        None => std::env::var("LIVEDESK_CONFIG_PATH")
            .ok()
            .and_then(|p| existing(&p))
            .or_else(|| existing("config.yaml"))
            .or_else(|| existing("/etc/livedesk/config.yaml")),
    };

    let config = match &config_path {
        Some(path) => {
            eprintln!("Loading config from {path}");
            Config::load(Some(path.as_str())).with_context(|| format!("Failed to load {path}"))?
        }
        None => {
            eprintln!("No config file found, using environment variables");
            Config::from_env().context("Failed to read configuration from environment")?
        }
    };

    if let Err(errors) = config.validate() {
        for error in &errors {
            tracing::error!("Config validation error: {}", error);
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s): {}",
            errors.len(),
            errors.join("; ")
        ));
    }

    info!("Configuration loaded and validated successfully");
    info!("Fabric bridge: {}", config.fabric.bridge_url);
    info!("Site object: {} in {}", config.site.object_id, config.site.library_id);

    Ok(config)
}
