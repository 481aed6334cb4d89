// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sso-session project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Session behaviour configuration
//!
//! Controls what happens at boot when no credential exists, how early a
//! token gets refreshed and whether views wait for initialization.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Policy applied at initialization when the broker has no credential.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnLoad {
    /// Redirect to the broker login page straight away
    LoginRequired,
    /// Stay unauthenticated until something asks for a login
    #[default]
    CheckSso,
}

/// Settings for the [`SessionController`](crate::session::SessionController)
/// and the [`RouteGuard`](crate::guard::RouteGuard).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Boot policy when no credential is available
    #[serde(default)]
    pub on_load: OnLoad,

    /// Minimum remaining validity, in seconds, before a refresh is requested.
    ///
    /// Default is 120.
    #[serde(default = "default_min_validity_secs")]
    pub min_validity_secs: u64,

    /// When true no view renders, public ones included, until the
    /// controller has finished initializing.
    #[serde(default = "default_block_until_ready")]
    pub block_until_ready: bool,
}

fn default_min_validity_secs() -> u64 {
    120
}

fn default_block_until_ready() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            on_load: OnLoad::default(),
            min_validity_secs: default_min_validity_secs(),
            block_until_ready: default_block_until_ready(),
        }
    }
}

impl SessionConfig {
    /// Refresh threshold as a [`Duration`]
    pub fn min_validity(&self) -> Duration {
        Duration::from_secs(self.min_validity_secs)
    }
}
