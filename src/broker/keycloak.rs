// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sso-session project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Keycloak broker adapter
//!
//! Talks to a Keycloak realm the way the browser adapter does:
//!
//! - `init` reads the realm's OpenID discovery document
//! - `login`/`logout` build the authorization and end-session URLs and hand
//!   them to a [`Navigator`]
//! - `refresh` posts a `refresh_token` grant to the token endpoint
//!
//! The adapter can be seeded with a [`TokenSet`] obtained from a completed
//! login (the equivalent of passing `token`/`refreshToken`/`idToken` to the
//! browser adapter). Without one, `init` reports no credential.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{IdentityBroker, Navigator};
use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::session::Claims;

/// Tokens issued by the broker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

/// Subset of the OpenID discovery document used by the adapter
#[derive(Debug, Clone, Deserialize)]
struct Endpoints {
    authorization_endpoint: Url,
    token_endpoint: Url,
    #[serde(default)]
    end_session_endpoint: Option<Url>,
}

/// Token endpoint success body
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

/// Token endpoint error body (RFC 6749 section 5.2)
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    config: Option<BrokerConfig>,
    endpoints: Option<Endpoints>,
    tokens: Option<TokenSet>,
    claims: Option<Claims>,
}

/// [`IdentityBroker`] backed by a Keycloak realm
pub struct KeycloakBroker {
    http: reqwest::Client,
    navigator: Arc<dyn Navigator>,
    state: Mutex<State>,
}

impl KeycloakBroker {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self::with_client(reqwest::Client::new(), navigator)
    }

    pub fn with_client(http: reqwest::Client, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            http,
            navigator,
            state: Mutex::new(State::default()),
        }
    }

    /// Seed the adapter with tokens from a completed login
    pub fn with_tokens(self, tokens: TokenSet) -> Self {
        self.lock().tokens = Some(tokens);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn endpoints(&self) -> Result<(BrokerConfig, Endpoints), BrokerError> {
        let state = self.lock();
        match (&state.config, &state.endpoints) {
            (Some(config), Some(endpoints)) => Ok((config.clone(), endpoints.clone())),
            _ => Err(BrokerError::Protocol("broker is not initialized".to_string())),
        }
    }

    async fn discover(&self, config: &BrokerConfig) -> Result<Endpoints, BrokerError> {
        let url = config.discovery_url()?;
        debug!("Fetching discovery document from {}", url);

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| BrokerError::Unreachable(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(BrokerError::Protocol(format!(
                "discovery document at {} returned HTTP {}",
                url,
                response.status().as_u16()
            )));
        }

        response
            .json::<Endpoints>()
            .await
            .map_err(|e| BrokerError::Protocol(format!("invalid discovery document: {}", e)))
    }

    /// Post a `refresh_token` grant and store the result
    async fn refresh_grant(&self) -> Result<(), BrokerError> {
        let (config, endpoints) = self.endpoints()?;
        let refresh_token = self
            .lock()
            .tokens
            .as_ref()
            .and_then(|t| t.refresh_token.clone())
            .ok_or_else(|| BrokerError::Rejected("no refresh token available".to_string()))?;

        debug!("Requesting new token from {}", endpoints.token_endpoint);
        let response = self
            .http
            .post(endpoints.token_endpoint.clone())
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", config.client_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| BrokerError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let reason = match response.json::<TokenErrorResponse>().await {
                Ok(body) => body.error_description.unwrap_or(body.error),
                Err(_) => format!("HTTP {}", status.as_u16()),
            };
            return Err(BrokerError::Rejected(reason));
        }
        if !status.is_success() {
            return Err(BrokerError::Protocol(format!(
                "token endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let body = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| BrokerError::Protocol(format!("invalid token response: {}", e)))?;
        let claims = Claims::decode(&body.access_token)?;

        let mut state = self.lock();
        let previous = state.tokens.take();
        state.tokens = Some(TokenSet {
            access_token: body.access_token,
            refresh_token: body
                .refresh_token
                .or_else(|| previous.as_ref().and_then(|t| t.refresh_token.clone())),
            id_token: body
                .id_token
                .or_else(|| previous.and_then(|t| t.id_token)),
        });
        state.claims = Some(claims);
        Ok(())
    }

    fn remaining_secs(&self) -> Option<i64> {
        self.lock()
            .claims
            .as_ref()
            .and_then(Claims::expires_at)
            .map(|exp| exp.signed_duration_since(Utc::now()).num_seconds())
    }
}

#[async_trait]
impl IdentityBroker for KeycloakBroker {
    async fn init(&self, config: &BrokerConfig) -> Result<bool, BrokerError> {
        config.validate()?;
        let endpoints = self.discover(config).await?;
        info!(
            "Connected to realm {} at {}",
            config.realm,
            config.realm_url()?
        );

        let seeded = {
            let mut state = self.lock();
            state.config = Some(config.clone());
            state.endpoints = Some(endpoints);
            state.tokens.clone()
        };

        let Some(tokens) = seeded else {
            return Ok(false);
        };

        match Claims::decode(&tokens.access_token) {
            Ok(claims) => {
                self.lock().claims = Some(claims);
            }
            Err(e) => {
                warn!("Discarding unreadable access token: {}", e);
                let mut state = self.lock();
                state.tokens = None;
                state.claims = None;
                return Ok(false);
            }
        }

        if self.remaining_secs().unwrap_or(0) > 0 {
            return Ok(true);
        }

        debug!("Seeded access token expired, trying the refresh token");
        match self.refresh_grant().await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!("Could not renew expired credential: {}", e);
                let mut state = self.lock();
                state.tokens = None;
                state.claims = None;
                Ok(false)
            }
        }
    }

    async fn login(&self) -> Result<(), BrokerError> {
        let (config, endpoints) = self.endpoints()?;
        let mut url = endpoints.authorization_endpoint;
        url.query_pairs_mut()
            .append_pair("client_id", &config.client_id)
            .append_pair("redirect_uri", &config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &config.scope)
            .append_pair("state", &uuid::Uuid::new_v4().to_string())
            .append_pair("nonce", &uuid::Uuid::new_v4().to_string());

        self.navigator.navigate(&url);
        Ok(())
    }

    async fn logout(&self) -> Result<(), BrokerError> {
        let (config, endpoints) = self.endpoints()?;
        let id_token = {
            let mut state = self.lock();
            state.claims = None;
            state.tokens.take().and_then(|t| t.id_token)
        };

        let mut url = match endpoints.end_session_endpoint {
            Some(url) => url,
            None => config
                .realm_url()?
                .join("protocol/openid-connect/logout")
                .map_err(|e| BrokerError::Protocol(e.to_string()))?,
        };
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &config.client_id)
                .append_pair("post_logout_redirect_uri", &config.redirect_uri);
            if let Some(id_token) = &id_token {
                query.append_pair("id_token_hint", id_token);
            }
        }

        self.navigator.navigate(&url);
        Ok(())
    }

    async fn refresh(&self, min_validity: Duration) -> Result<bool, BrokerError> {
        let remaining = self
            .remaining_secs()
            .ok_or_else(|| BrokerError::Rejected("not authenticated".to_string()))?;

        let threshold = i64::try_from(min_validity.as_secs()).unwrap_or(i64::MAX);
        if remaining > threshold {
            debug!("Token still valid for {}s, not refreshing", remaining);
            return Ok(false);
        }

        self.refresh_grant().await?;
        Ok(true)
    }

    fn token(&self) -> Option<String> {
        self.lock().tokens.as_ref().map(|t| t.access_token.clone())
    }

    fn token_claims(&self) -> Option<Claims> {
        self.lock().claims.clone()
    }

    fn authenticated(&self) -> bool {
        let state = self.lock();
        state.tokens.is_some() && state.claims.is_some()
    }
}
