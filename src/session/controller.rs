// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sso-session project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Session controller
//!
//! Wraps an [`IdentityBroker`] and owns the session lifecycle:
//!
//! ```text
//! Uninitialized -> Initializing -> Authenticated | Unauthenticated
//! Initializing  -> Uninitialized            (initialization failed)
//! Authenticated -> Unauthenticated          (logout, rejected refresh)
//! ```
//!
//! `Unauthenticated -> Authenticated` only happens through `initialize`
//! after the external login redirect has completed.
//!
//! Every stay in `Unauthenticated` is an *entry*. At most one automatic
//! login is issued per entry, whoever asks for it (boot policy or route
//! guard).

use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tokio::sync::Mutex;

use super::{Claims, Session, SessionState, TokenStore};
use crate::broker::IdentityBroker;
use crate::config::{BrokerConfig, OnLoad, SessionConfig};
use crate::error::{SessionError, SessionResult};

/// Credential read back from the broker after `init` or `refresh`
#[derive(Debug, Clone)]
struct Credential {
    raw_token: String,
    claims: Claims,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Lifecycle {
    state: SessionState,
    /// Incremented on every transition into `Unauthenticated`
    entry: u64,
    /// Entry for which an automatic login has already been issued
    login_issued_for: Option<u64>,
}

/// Read-only view of the token store
#[derive(Debug, Clone)]
pub struct SessionReader {
    store: Arc<TokenStore>,
}

impl SessionReader {
    pub fn snapshot(&self) -> Session {
        self.store.snapshot()
    }

    pub fn token(&self) -> Option<String> {
        self.store.token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }
}

/// Owner of the session lifecycle.
///
/// Build one per application and share it with `Arc`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use sso_session::broker::{ConsoleNavigator, KeycloakBroker};
/// use sso_session::config::Config;
/// use sso_session::session::SessionController;
///
/// # async fn boot() -> Result<(), sso_session::error::SessionError> {
/// let config = Config::default();
/// let broker = Arc::new(KeycloakBroker::new(Arc::new(ConsoleNavigator)));
/// let controller = SessionController::new(broker, config.session.clone());
///
/// controller.initialize(&config.broker).await?;
/// if controller.session().is_authenticated() {
///     controller.refresh_default().await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct SessionController {
    broker: Arc<dyn IdentityBroker>,
    options: SessionConfig,
    store: Arc<TokenStore>,
    lifecycle: RwLock<Lifecycle>,
    /// Serializes the operations that write the store
    op_lock: Mutex<()>,
}

impl SessionController {
    pub fn new(broker: Arc<dyn IdentityBroker>, options: SessionConfig) -> Self {
        Self {
            broker,
            options,
            store: Arc::new(TokenStore::new()),
            lifecycle: RwLock::new(Lifecycle {
                state: SessionState::Uninitialized,
                entry: 0,
                login_issued_for: None,
            }),
            op_lock: Mutex::new(()),
        }
    }

    fn lifecycle(&self) -> RwLockWriteGuard<'_, Lifecycle> {
        self.lifecycle
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SessionState {
        self.lifecycle
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    pub fn options(&self) -> &SessionConfig {
        &self.options
    }

    /// Latest session
    pub fn session(&self) -> Session {
        self.store.snapshot()
    }

    /// Read-only handle on the token store, for the resource client
    pub fn reader(&self) -> SessionReader {
        SessionReader {
            store: Arc::clone(&self.store),
        }
    }

    fn require_ready(&self) -> SessionResult<SessionState> {
        let state = self.state();
        if state.is_ready() {
            Ok(state)
        } else {
            Err(SessionError::NotReady)
        }
    }

    fn enter_authenticated(&self, credential: Credential) {
        debug!("Storing credential valid until {}", credential.expires_at);
        self.store
            .set(credential.claims, credential.raw_token, credential.expires_at);
        self.lifecycle().state = SessionState::Authenticated;
    }

    fn enter_unauthenticated(&self) {
        self.store.clear();
        let mut lifecycle = self.lifecycle();
        lifecycle.state = SessionState::Unauthenticated;
        lifecycle.entry += 1;
    }

    /// Read the broker's current credential and check it is usable
    fn read_credential(&self) -> Result<Credential, String> {
        let raw_token = self
            .broker
            .token()
            .ok_or_else(|| "broker returned no token".to_string())?;
        let claims = match self.broker.token_claims() {
            Some(claims) => claims,
            None => Claims::decode(&raw_token).map_err(|e| e.to_string())?,
        };
        let expires_at = claims
            .expires_at()
            .ok_or_else(|| "token has no exp claim".to_string())?;
        if expires_at <= Utc::now() {
            return Err(format!("token expired at {}", expires_at));
        }
        Ok(Credential {
            raw_token,
            claims,
            expires_at,
        })
    }

    /// Connect to the broker and establish the session.
    ///
    /// Resolves to the state reached: `Authenticated` when the broker had a
    /// valid credential, `Unauthenticated` otherwise. With the
    /// `login-required` boot policy an unauthenticated result has already
    /// triggered the login redirect.
    ///
    /// # Errors
    ///
    /// - [`SessionError::AlreadyInitialized`] when called twice
    /// - [`SessionError::Initialization`] for an invalid configuration or an
    ///   unreachable broker; the controller returns to `Uninitialized`
    /// - [`SessionError::Redirect`] when the boot login could not start
    pub async fn initialize(&self, config: &BrokerConfig) -> SessionResult<SessionState> {
        let guard = self.op_lock.lock().await;
        {
            let mut lifecycle = self.lifecycle();
            if lifecycle.state != SessionState::Uninitialized {
                return Err(SessionError::AlreadyInitialized);
            }
            lifecycle.state = SessionState::Initializing;
        }

        if let Err(e) = config.validate() {
            self.lifecycle().state = SessionState::Uninitialized;
            error!("Refusing to initialize session: {}", e);
            return Err(SessionError::Initialization(e.to_string()));
        }

        info!(
            "Initializing session for client {} in realm {}",
            config.client_id, config.realm
        );
        let authenticated = match self.broker.init(config).await {
            Ok(authenticated) => authenticated,
            Err(e) => {
                self.lifecycle().state = SessionState::Uninitialized;
                error!("Identity broker initialization failed: {}", e);
                return Err(SessionError::Initialization(e.to_string()));
            }
        };

        if authenticated {
            match self.read_credential() {
                Ok(credential) => {
                    self.enter_authenticated(credential);
                    info!("Session authenticated");
                    return Ok(SessionState::Authenticated);
                }
                Err(reason) => warn!("Ignoring broker credential: {}", reason),
            }
        }

        self.enter_unauthenticated();
        drop(guard);
        info!("No valid credential, session unauthenticated");

        if self.options.on_load == OnLoad::LoginRequired {
            self.request_login_once().await?;
        }
        Ok(SessionState::Unauthenticated)
    }

    /// Start the login redirect.
    pub async fn login(&self) -> SessionResult<()> {
        self.require_ready()?;
        {
            let mut lifecycle = self.lifecycle();
            if lifecycle.state == SessionState::Unauthenticated {
                lifecycle.login_issued_for = Some(lifecycle.entry);
            }
        }
        debug!("Starting login redirect");
        self.broker.login().await.map_err(SessionError::Redirect)
    }

    /// Issue a login unless one was already issued during the current
    /// unauthenticated entry. Resolves to `true` when a login was issued.
    ///
    /// Does nothing outside the `Unauthenticated` state.
    pub async fn request_login_once(&self) -> SessionResult<bool> {
        {
            let mut lifecycle = self.lifecycle();
            if lifecycle.state != SessionState::Unauthenticated
                || lifecycle.login_issued_for == Some(lifecycle.entry)
            {
                return Ok(false);
            }
            lifecycle.login_issued_for = Some(lifecycle.entry);
        }
        debug!("Starting login redirect for unauthenticated session");
        self.broker
            .login()
            .await
            .map_err(SessionError::Redirect)?;
        Ok(true)
    }

    /// Clear the session and start the sign-out redirect.
    pub async fn logout(&self) -> SessionResult<()> {
        let _guard = self.op_lock.lock().await;
        let state = self.require_ready()?;
        if state == SessionState::Authenticated {
            self.enter_unauthenticated();
        } else {
            self.store.clear();
        }
        info!("Session cleared, starting logout redirect");
        self.broker.logout().await.map_err(SessionError::Redirect)
    }

    /// Refresh the token when it expires within `min_validity`.
    ///
    /// Resolves to `true` when a new token was stored. The broker is not
    /// contacted while the token remains valid for longer than
    /// `min_validity`.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotReady`] before initialization
    /// - [`SessionError::Refresh`] when there is no authenticated session or
    ///   the broker rejects the refresh; in the latter case the session has
    ///   been reset to `Unauthenticated`
    pub async fn refresh(&self, min_validity: Duration) -> SessionResult<bool> {
        let _guard = self.op_lock.lock().await;
        if self.require_ready()? == SessionState::Unauthenticated {
            return Err(SessionError::Refresh(
                "no authenticated session".to_string(),
            ));
        }

        let threshold = i64::try_from(min_validity.as_secs()).unwrap_or(i64::MAX);
        let remaining = self
            .store
            .snapshot()
            .expires_at()
            .map(|exp| exp.signed_duration_since(Utc::now()).num_seconds())
            .unwrap_or(0);
        if remaining > threshold {
            debug!(
                "Token valid for {}s (threshold {}s), no refresh needed",
                remaining, threshold
            );
            return Ok(false);
        }

        debug!("Token expires in {}s, asking broker for a new one", remaining);
        match self.broker.refresh(min_validity).await {
            Ok(false) => Ok(false),
            Ok(true) => match self.read_credential() {
                Ok(credential) => {
                    self.enter_authenticated(credential);
                    info!("Token refreshed");
                    Ok(true)
                }
                Err(reason) => {
                    warn!("Refreshed credential unusable: {}", reason);
                    self.enter_unauthenticated();
                    Err(SessionError::Refresh(reason))
                }
            },
            Err(e) => {
                warn!("Token refresh rejected, clearing session: {}", e);
                self.enter_unauthenticated();
                Err(SessionError::Refresh(e.to_string()))
            }
        }
    }

    /// [`refresh`](Self::refresh) with the configured threshold
    pub async fn refresh_default(&self) -> SessionResult<bool> {
        self.refresh(self.options.min_validity()).await
    }
}
