// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sso-session project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Token store
//!
//! Pure data holder for the current [`Session`]. It performs no validation;
//! the [`SessionController`](super::SessionController) vets every credential
//! before writing it here and is the only writer. Everyone else reads
//! through [`TokenStore::snapshot`].

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};

use super::claims::Claims;

/// Authentication state shared by the whole application.
///
/// A session is either unauthenticated (no token, no expiry, empty claims)
/// or authenticated with both a raw token and an expiry. The constructors
/// are the only way to build one, so a value with `authenticated == true`
/// always carries a token and an expiry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    authenticated: bool,
    raw_token: Option<String>,
    claims: Claims,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// The boot and post-logout state
    pub fn unauthenticated() -> Self {
        Self::default()
    }

    pub fn authenticated(claims: Claims, raw_token: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            authenticated: true,
            raw_token: Some(raw_token),
            claims,
            expires_at: Some(expires_at),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn raw_token(&self) -> Option<&str> {
        self.raw_token.as_deref()
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Seconds until expiry, clamped at zero. `None` when unauthenticated.
    pub fn validity_remaining_secs(&self) -> Option<i64> {
        self.expires_at
            .map(|exp| exp.signed_duration_since(Utc::now()).num_seconds().max(0))
    }
}

/// Holder of the single [`Session`] value
#[derive(Debug, Default)]
pub struct TokenStore {
    session: RwLock<Session>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a credential and mark the session authenticated
    pub fn set(&self, claims: Claims, raw_token: String, expires_at: DateTime<Utc>) {
        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        *session = Session::authenticated(claims, raw_token, expires_at);
    }

    /// Reset to the unauthenticated state
    pub fn clear(&self) {
        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        *session = Session::unauthenticated();
    }

    /// Copy of the latest session
    pub fn snapshot(&self) -> Session {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_authenticated()
    }

    pub fn token(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .raw_token
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_set_then_clear() {
        let store = TokenStore::new();
        assert!(!store.is_authenticated());
        assert!(store.token().is_none());

        let exp = Utc::now() + Duration::minutes(5);
        store.set(Claims::default(), "abc".to_string(), exp);
        let session = store.snapshot();
        assert!(session.is_authenticated());
        assert_eq!(session.raw_token(), Some("abc"));
        assert_eq!(session.expires_at(), Some(exp));
        assert!(session.validity_remaining_secs().unwrap() > 290);

        store.clear();
        assert_eq!(store.snapshot(), Session::unauthenticated());
    }

    #[test]
    fn test_expired_session_has_zero_remaining() {
        let session = Session::authenticated(
            Claims::default(),
            "old".to_string(),
            Utc::now() - Duration::minutes(1),
        );
        assert_eq!(session.validity_remaining_secs(), Some(0));
    }
}
