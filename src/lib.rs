// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sso-session project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! SSO session library
//!
//! Client side of a single-sign-on setup: a session controller that drives an
//! external identity broker, a token store, a route guard and a client for
//! the downstream resource API.
//!
//! - [`session`]: token store, claims and the session controller
//! - [`broker`]: identity broker contract and the Keycloak adapter
//! - [`guard`]: route table and route guard
//! - [`resource`]: authenticated resource fetch
//! - [`views`]: plain-text page models
//! - [`config`]: YAML configuration

pub mod broker;
pub mod config;
pub mod error;
pub mod guard;
pub mod resource;
pub mod session;
pub mod views;

pub use error::{BrokerError, SessionError};
