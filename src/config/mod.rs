// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sso-session project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the session client
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema before it is deserialized.
//!
//! ## Configuration Structure
//!
//! - `broker`: where the identity broker lives and how this client registers
//! - `session`: boot policy, refresh threshold, render blocking
//! - `resource`: downstream resource API endpoint
//! - `routes`: ordered route table used by the route guard
//!
//! ## Usage
//!
//! ```no_run
//! use sso_session::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some("https://sso.example.org/".to_string()), // Broker URL
//!     None,                                         // Realm
//!     Some("first.example.org".to_string()),        // Client id
//!     None,                                         // Resource endpoint
//!     Some(600),                                    // Refresh threshold
//! );
//!
//! println!("Realm: {}", config.broker.realm);
//! ```

pub mod broker;
pub mod resource;
pub mod session;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::guard::Route;

pub use broker::BrokerConfig;
pub use resource::ResourceConfig;
pub use session::{OnLoad, SessionConfig};
pub use utils::{output_config_schema, validate_specific_rules};

/// JSON schema every configuration file is validated against
pub(crate) const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Root configuration structure.
///
/// Every section falls back to its default when absent, so a file that only
/// names the broker is a complete configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Identity broker connection settings
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Session controller and route guard behaviour
    #[serde(default)]
    pub session: SessionConfig,

    /// Downstream resource API
    #[serde(default)]
    pub resource: ResourceConfig,

    /// Ordered route table; the first exact path match wins
    #[serde(default = "default_routes")]
    pub routes: Vec<Route>,
}

fn default_routes() -> Vec<Route> {
    vec![
        Route::new("/", "Home", false),
        Route::new("/public", "Public", false),
        Route::new("/profile", "Profile", true),
        Route::new("/course", "Course", true),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            session: SessionConfig::default(),
            resource: ResourceConfig::default(),
            routes: default_routes(),
        }
    }
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with default values. A file that fails
    /// schema or rule validation leaves a `*.sample.yaml` next to it and
    /// returns an error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        let config = match Self::from_yaml_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration error in {}: {:#}", path.display(), err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(err.context(format!(
                    "Invalid configuration file {}",
                    path.display()
                )));
            }
        };

        Ok(config)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value =
            serde_yml::from_str(contents).context("Failed to parse YAML configuration")?;

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value)
            .context("Failed to convert YAML to JSON for validation")?;

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)
            .context("Failed to compile JSON schema")?;

        debug!("Validating configuration against schema");
        if let Err(error) = validator.validate(&json_value) {
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config =
            serde_yml::from_str(contents).context("Failed to deserialize configuration")?;

        validate_specific_rules(&config)?;
        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Validate the configuration as it is in memory
    pub fn validate(&self) -> Result<()> {
        let json_value =
            serde_json::to_value(self).context("Failed to serialize configuration")?;
        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)
            .context("Failed to compile JSON schema")?;
        if let Err(error) = validator.validate(&json_value) {
            anyhow::bail!("Configuration validation failed: {}", error);
        }
        validate_specific_rules(self)
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only the values that are provided override the loaded configuration.
    ///
    /// # Parameters
    ///
    /// * `broker_url` - Base URL of the identity broker
    /// * `realm` - Broker realm
    /// * `client_id` - Client identifier registered with the broker
    /// * `endpoint` - Downstream resource endpoint
    /// * `min_validity_secs` - Refresh threshold in seconds
    pub fn apply_args(
        &mut self,
        broker_url: Option<String>,
        realm: Option<String>,
        client_id: Option<String>,
        endpoint: Option<String>,
        min_validity_secs: Option<u64>,
    ) {
        if let Some(url) = broker_url {
            debug!("Overriding broker url from command line: {}", url);
            self.broker.url = url;
        }
        if let Some(realm) = realm {
            debug!("Overriding realm from command line: {}", realm);
            self.broker.realm = realm;
        }
        if let Some(client_id) = client_id {
            debug!("Overriding client id from command line: {}", client_id);
            self.broker.client_id = client_id;
        }
        if let Some(endpoint) = endpoint {
            debug!("Overriding resource endpoint from command line: {}", endpoint);
            self.resource.endpoint = endpoint;
        }
        if let Some(secs) = min_validity_secs {
            debug!("Overriding refresh threshold from command line: {}s", secs);
            self.session.min_validity_secs = secs;
        }
    }
}
