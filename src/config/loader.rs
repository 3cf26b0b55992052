//! Configuration Loader — File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters, and
//! providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns a detailed error if the file can't be read, TOML parsing
/// fails, or a validation rule is violated.
pub fn load_config(path: &str) -> Result<AppConfig> {
    let path = Path::new(path);

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;

    info!(
        service = %config.service.name,
        health_port = config.service.health_port,
        crypto_pairs = config.sources.crypto_pairs.len(),
        "Configuration loaded successfully"
    );

    Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig =
        toml::from_str(content).with_context(|| "Failed to parse config.toml")?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
    anyhow::ensure!(
        config.http.timeout_seconds > 0,
        "HTTP timeout_seconds must be positive"
    );

    for (name, url) in [
        ("equities_base_url", &config.sources.equities_base_url),
        (
            "quote_center_base_url",
            &config.sources.quote_center_base_url,
        ),
        ("crypto_base_url", &config.sources.crypto_base_url),
        ("fx_rest_url", &config.sources.fx_rest_url),
        ("fx_ws_url", &config.sources.fx_ws_url),
    ] {
        anyhow::ensure!(!url.is_empty(), "Source URL {name} must not be empty");
    }

    anyhow::ensure!(
        !config.sources.fx_target_currency.is_empty(),
        "fx_target_currency must not be empty"
    );
    anyhow::ensure!(
        !config.sources.fx_ws_pair.is_empty(),
        "fx_ws_pair must not be empty"
    );
    anyhow::ensure!(
        !config.sources.crypto_pairs.is_empty(),
        "At least one crypto pair must be configured"
    );

    for (name, interval_ms) in [
        ("polling.equities_ms", config.polling.equities_ms),
        ("polling.gold_ms", config.polling.gold_ms),
        ("polling.silver_ms", config.polling.silver_ms),
        ("polling.crypto_ms", config.polling.crypto_ms),
        ("polling.fx_fallback_ms", config.polling.fx_fallback_ms),
        ("failover.debounce_ms", config.failover.debounce_ms),
    ] {
        anyhow::ensure!(interval_ms > 0, "{name} must be positive, got {interval_ms}");
    }

    Ok(())
}
