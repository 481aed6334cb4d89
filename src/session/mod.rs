// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sso-session project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Session state and its controller
//!
//! - [`TokenStore`] holds the [`Session`] (token, claims, expiry)
//! - [`Claims`] decodes and reads token claims
//! - [`SessionController`] drives the identity broker and is the only writer
//!   of the store

pub mod claims;
pub mod controller;
pub mod token_store;

use std::fmt;

pub use claims::Claims;
pub use controller::{SessionController, SessionReader};
pub use token_store::{Session, TokenStore};

/// Lifecycle of a [`SessionController`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Authenticated,
    Unauthenticated,
}

impl SessionState {
    /// `true` once initialization has completed
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Authenticated | Self::Unauthenticated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Authenticated => "authenticated",
            Self::Unauthenticated => "unauthenticated",
        };
        f.write_str(name)
    }
}
