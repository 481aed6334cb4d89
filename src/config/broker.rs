// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sso-session project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Identity broker configuration
//!
//! Describes where the external identity broker lives and how this client
//! registers with it. These are the three values every broker adapter needs
//! (`url`, `realm`, `client_id`) plus the redirect parameters used to build
//! login and logout URLs.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::BrokerError;

/// Connection settings for the identity broker.
///
/// # Example
///
/// ```
/// use sso_session::config::BrokerConfig;
///
/// let broker = BrokerConfig {
///     url: "https://sso.example.org/".to_string(),
///     realm: "demo-sso-realm".to_string(),
///     client_id: "first.example.org".to_string(),
///     ..BrokerConfig::default()
/// };
/// assert_eq!(
///     broker.realm_url().unwrap().as_str(),
///     "https://sso.example.org/realms/demo-sso-realm/"
/// );
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Base URL of the broker, e.g. `https://sso.example.org/`
    pub url: String,

    /// Realm (tenant) the client belongs to
    pub realm: String,

    /// Public client identifier registered with the broker
    pub client_id: String,

    /// Where the broker sends the user back after login and logout
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Space separated scopes requested at login
    #[serde(default = "default_scope")]
    pub scope: String,
}

fn default_redirect_uri() -> String {
    "http://localhost:3000/".to_string()
}

fn default_scope() -> String {
    "openid profile email".to_string()
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/".to_string(),
            realm: "demo-sso-realm".to_string(),
            client_id: "react-app".to_string(),
            redirect_uri: default_redirect_uri(),
            scope: default_scope(),
        }
    }
}

impl BrokerConfig {
    /// Check that the three mandatory values are usable.
    pub fn validate(&self) -> Result<(), BrokerError> {
        if self.realm.trim().is_empty() {
            return Err(BrokerError::InvalidConfig("realm is empty".to_string()));
        }
        if self.client_id.trim().is_empty() {
            return Err(BrokerError::InvalidConfig("client_id is empty".to_string()));
        }
        let url = self.base_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BrokerError::InvalidConfig(format!(
                "unsupported broker url scheme: {}",
                url.scheme()
            )));
        }
        Ok(())
    }

    /// Parsed broker base URL, always ending with a slash so that joins
    /// append instead of replacing the last segment.
    pub fn base_url(&self) -> Result<Url, BrokerError> {
        let mut raw = self.url.trim().to_string();
        if raw.is_empty() {
            return Err(BrokerError::InvalidConfig("url is empty".to_string()));
        }
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|e| BrokerError::InvalidConfig(format!("url {}: {}", self.url, e)))
    }

    /// `<url>/realms/<realm>/`
    pub fn realm_url(&self) -> Result<Url, BrokerError> {
        self.base_url()?
            .join(&format!("realms/{}/", self.realm))
            .map_err(|e| BrokerError::InvalidConfig(e.to_string()))
    }

    /// OpenID discovery document of the realm
    pub fn discovery_url(&self) -> Result<Url, BrokerError> {
        self.realm_url()?
            .join(".well-known/openid-configuration")
            .map_err(|e| BrokerError::InvalidConfig(e.to_string()))
    }
}
