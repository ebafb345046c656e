//! tracing subscriber setup for gdpilot

use anyhow::{anyhow, Result};
use gdpilot_core::LoggingConfig;
use std::io;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Level used when neither RUST_LOG, the config nor -v say otherwise
const DEFAULT_LEVEL: &str = "warn";

/// Filter directive: RUST_LOG wins, then -v flags, then the config file
fn filter_directive(config: Option<&LoggingConfig>, verbose: u8) -> String {
    if let Ok(env) = std::env::var(EnvFilter::DEFAULT_ENV) {
        if !env.trim().is_empty() {
            return env;
        }
    }

    let level = match verbose {
        0 => config.map(|c| c.level.as_str()).unwrap_or(DEFAULT_LEVEL),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // Third-party crates stay at warn unless RUST_LOG says otherwise
    format!("warn,gdpilot={level},gdpilot_core={level}")
}

/// Install the global subscriber; logs go to stderr so stdout stays scriptable
pub fn init_logging(config: Option<&LoggingConfig>, verbose: u8) -> Result<()> {
    let filter = EnvFilter::try_new(filter_directive(config, verbose))
        .map_err(|e| anyhow!("Invalid log filter: {}", e))?;
    let format = config.map(|c| c.format.as_str()).unwrap_or("compact");

    let registry = tracing_subscriber::registry().with(filter);
    let result = if format == "pretty" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(io::stderr),
            )
            .try_init()
    };

    result.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
