// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sso-session project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error types for the session subsystem
//!
//! Two layers of errors exist:
//!
//! - [`BrokerError`] describes what went wrong while talking to the external
//!   identity broker (network, protocol, rejected grants).
//! - [`SessionError`] is what callers of the
//!   [`SessionController`](crate::session::SessionController) see. Broker
//!   failures are folded into it according to the operation that failed.
//!
//! Resource fetch outcomes are not errors: they are reported as
//! [`ResourceResponse`](crate::resource::ResourceResponse) values.

use thiserror::Error;

/// Failures reported by an [`IdentityBroker`](crate::broker::IdentityBroker)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// The broker could not be reached at all
    #[error("identity broker unreachable: {0}")]
    Unreachable(String),

    /// The broker answered with something we cannot use
    #[error("identity broker protocol error: {0}")]
    Protocol(String),

    /// The broker refused the request (revoked session, invalid grant)
    #[error("identity broker rejected the request: {0}")]
    Rejected(String),

    /// A token handed out by the broker cannot be decoded
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The broker configuration is unusable
    #[error("invalid broker configuration: {0}")]
    InvalidConfig(String),
}

/// Errors surfaced by the session controller
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Broker unreachable or misconfigured. Fatal for the session.
    #[error("session initialization failed: {0}")]
    Initialization(String),

    /// The broker rejected a token refresh. The session has already been
    /// reset to the unauthenticated state when this is returned.
    #[error("token refresh failed: {0}")]
    Refresh(String),

    /// The operation was attempted before the controller was initialized
    #[error("session controller is not initialized")]
    NotReady,

    /// `initialize` was called more than once
    #[error("session controller is already initialized")]
    AlreadyInitialized,

    /// The login or logout redirect could not be started
    #[error("redirect failed: {0}")]
    Redirect(#[source] BrokerError),
}

/// Convenience alias used across the session modules
pub type SessionResult<T> = std::result::Result<T, SessionError>;
