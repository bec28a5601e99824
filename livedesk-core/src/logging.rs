use std::str::FromStr;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::{
    fmt::{format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::LoggingConfig;

/// Set up the global subscriber from [`LoggingConfig`].
///
/// `RUST_LOG` wins over the configured level. Without a log file, output
/// goes to stderr since stdout carries command output.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = Level::from_str(config.level.trim())
        .map_err(|_| anyhow::anyhow!("Invalid log level: {}", config.level))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let to_file = config.file_path.is_some();
    let writer = match &config.file_path {
        Some(path) => {
            let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(Arc::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let layer = if config.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_line_number(true)
            .with_writer(writer)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_ansi(!to_file)
            .with_writer(writer)
            .boxed()
    };

    tracing_subscriber::registry().with(filter).with(layer).try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        for name in ["trace", "DEBUG", "Info", "warn", "error"] {
            assert!(Level::from_str(name).is_ok(), "{name}");
        }
        assert!(Level::from_str("loud").is_err());
    }

    #[test]
    fn test_init_rejects_bad_level() {
        let config = LoggingConfig {
            level: "loud".to_string(),
            ..LoggingConfig::default()
        };
        assert!(init_logging(&config).is_err());
    }
}
