// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sso-session project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use std::collections::HashSet;

use anyhow::{Context, Result};
use log::debug;
use url::Url;

use super::{Config, CONFIG_SCHEMA};

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./sso-session --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Validates the configuration against rules the JSON schema cannot express.
///
/// # Validation Rules
///
/// - **Broker**: URL parses with an http(s) scheme, realm and client id are not blank
/// - **Resource**: endpoint is an absolute http(s) URL, timeout is not zero
/// - **Routes**: every path starts with `/` and no path appears twice
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    config
        .broker
        .validate()
        .context("Invalid broker section")?;

    let endpoint = Url::parse(&config.resource.endpoint).with_context(|| {
        format!(
            "Resource endpoint is not a valid URL: {}",
            config.resource.endpoint
        )
    })?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        anyhow::bail!(
            "Resource endpoint must use http or https: {}",
            config.resource.endpoint
        );
    }

    if config.resource.timeout_secs == 0 {
        anyhow::bail!("Resource timeout must be at least one second");
    }

    let mut seen = HashSet::new();
    for route in &config.routes {
        if !route.path.starts_with('/') {
            anyhow::bail!("Route path must start with '/': {}", route.path);
        }
        if !seen.insert(route.path.as_str()) {
            anyhow::bail!("Duplicate route path: {}", route.path);
        }
    }

    Ok(())
}
