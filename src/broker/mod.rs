// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sso-session project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Identity broker seam
//!
//! The broker is the external collaborator that owns the identity protocol:
//! redirect based login and logout, token issuance and token refresh. This
//! crate never speaks that protocol on its own behalf; the
//! [`SessionController`](crate::session::SessionController) drives whatever
//! [`IdentityBroker`] it is given.
//!
//! [`KeycloakBroker`] is the adapter for a Keycloak realm. Tests and
//! embedders can supply their own implementation.

pub mod keycloak;
pub mod navigator;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::session::Claims;

pub use keycloak::{KeycloakBroker, TokenSet};
pub use navigator::{ConsoleNavigator, Navigator, RecordingNavigator};

/// Contract of an external identity broker client.
///
/// The asynchronous methods are the suspend points of the session; the
/// synchronous accessors report what the broker currently holds and are
/// read by the controller right after `init` and `refresh`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityBroker: Send + Sync {
    /// Connect to the broker. Resolves to `true` when an existing valid
    /// credential was found.
    async fn init(&self, config: &BrokerConfig) -> Result<bool, BrokerError>;

    /// Start the login redirect. Control leaves the application.
    async fn login(&self) -> Result<(), BrokerError>;

    /// Forget the credential and start the sign-out redirect.
    async fn logout(&self) -> Result<(), BrokerError>;

    /// Obtain a new token if the current one expires within `min_validity`.
    /// Resolves to `true` when a new token was issued.
    async fn refresh(&self, min_validity: Duration) -> Result<bool, BrokerError>;

    /// Current raw access token
    fn token(&self) -> Option<String>;

    /// Decoded claims of the current access token
    fn token_claims(&self) -> Option<Claims>;

    /// Whether the broker holds a credential
    fn authenticated(&self) -> bool;
}
