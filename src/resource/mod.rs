// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sso-session project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Authenticated access to the downstream resource API
//!
//! One `GET` per call, no retries. Every outcome, transport failures
//! included, comes back as a [`ResourceResponse`] value for the requesting
//! view to render.

use log::{debug, warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::ResourceConfig;
use crate::session::{Session, SessionReader};

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized. Invalid or expired token.";
pub const FORBIDDEN_MESSAGE: &str = "Forbidden. Insufficient permissions.";
pub const NO_DATA_MESSAGE: &str = "No data found";

/// Classification of a resource fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    Ok,
    Unauthorized,
    Forbidden,
    Error,
}

/// Result of one resource fetch
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceResponse {
    pub status: ResourceStatus,
    /// The `data` member of the response body, set only for `Ok`
    pub payload: Option<Value>,
    /// Human readable explanation, set for every non-`Ok` status
    pub message: Option<String>,
}

impl ResourceResponse {
    pub fn ok(payload: Value) -> Self {
        Self {
            status: ResourceStatus::Ok,
            payload: Some(payload),
            message: None,
        }
    }

    fn failure(status: ResourceStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            payload: None,
            message: Some(message.into()),
        }
    }

    pub fn unauthorized() -> Self {
        Self::failure(ResourceStatus::Unauthorized, UNAUTHORIZED_MESSAGE)
    }

    pub fn forbidden() -> Self {
        Self::failure(ResourceStatus::Forbidden, FORBIDDEN_MESSAGE)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::failure(ResourceStatus::Error, message)
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResourceStatus::Ok
    }
}

/// HTTP client for the resource API
#[derive(Debug, Clone)]
pub struct ResourceClient {
    http: reqwest::Client,
    endpoint: String,
    reader: Option<SessionReader>,
}

impl ResourceClient {
    /// Client with its own HTTP connection pool and the configured timeout
    pub fn new(config: &ResourceConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self::with_client(http, config.endpoint.clone()))
    }

    pub fn with_client(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            reader: None,
        }
    }

    /// Attach the session so that [`fetch`](Self::fetch) can read the token
    pub fn with_session(mut self, reader: SessionReader) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch the configured endpoint with the latest session
    pub async fn fetch(&self) -> ResourceResponse {
        let session = self
            .reader
            .as_ref()
            .map(SessionReader::snapshot)
            .unwrap_or_default();
        self.fetch_resource(&self.endpoint, &session).await
    }

    /// `GET endpoint` on behalf of `session`.
    ///
    /// Without a token the request still goes out, minus the
    /// `Authorization` header, and the server is expected to refuse it.
    pub async fn fetch_resource(&self, endpoint: &str, session: &Session) -> ResourceResponse {
        let mut request = self
            .http
            .get(endpoint)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = session.raw_token() {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        } else {
            debug!("No token in session, requesting {} anonymously", endpoint);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Request to {} failed: {}", endpoint, e);
                return ResourceResponse::error(format!("Error fetching resource: {}", e));
            }
        };

        let status = response.status();
        debug!("{} answered HTTP {}", endpoint, status.as_u16());
        match status {
            StatusCode::UNAUTHORIZED => return ResourceResponse::unauthorized(),
            StatusCode::FORBIDDEN => return ResourceResponse::forbidden(),
            s if !s.is_success() => {
                return ResourceResponse::error(format!(
                    "An unexpected error occurred (HTTP {}).",
                    s.as_u16()
                ))
            }
            _ => {}
        }

        match response.json::<Value>().await {
            Ok(mut body) => match body.get_mut("data").map(Value::take) {
                Some(Value::Null) | None => ResourceResponse::error(NO_DATA_MESSAGE),
                Some(data) => ResourceResponse::ok(data),
            },
            Err(e) => {
                warn!("Unreadable body from {}: {}", endpoint, e);
                ResourceResponse::error(NO_DATA_MESSAGE)
            }
        }
    }
}
