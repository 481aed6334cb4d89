// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sso-session project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Decoded token claims
//!
//! The identity broker has already verified the token by the time it reaches
//! this module, so decoding only splits the compact JWT and parses its
//! payload. Nothing here checks signatures.
//!
//! [`Claims`] keeps every claim as a JSON value and offers typed accessors for
//! the ones the views display. Keycloak places realm-wide roles under
//! `realm_access.roles`.

use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::BrokerError;

/// Claims carried inside a bearer token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Decode the payload of a compact JWT without verifying it.
    ///
    /// The header must be a base64url encoded JSON object but its `alg` is
    /// not interpreted, so tokens signed with any algorithm the broker
    /// supports decode the same way.
    ///
    /// # Errors
    ///
    /// [`BrokerError::InvalidToken`] when the token is not three dot
    /// separated segments, or the header or payload is not a base64url
    /// encoded JSON object.
    pub fn decode(token: &str) -> Result<Self, BrokerError> {
        let mut segments = token.split('.');
        let (header, payload) =
            match (segments.next(), segments.next(), segments.next(), segments.next()) {
                (Some(header), Some(payload), Some(_), None) => (header, payload),
                _ => {
                    return Err(BrokerError::InvalidToken(
                        "expected three segments".to_string(),
                    ))
                }
            };

        decode_segment(header, "header")?;
        decode_segment(payload, "payload").map(Self)
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    fn str_claim(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.str_claim("name")
    }

    pub fn email(&self) -> Option<&str> {
        self.str_claim("email")
    }

    pub fn preferred_username(&self) -> Option<&str> {
        self.str_claim("preferred_username")
    }

    /// Expiration time from the `exp` claim.
    ///
    /// Accepts integer and fractional seconds since the epoch.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp = self.0.get("exp")?;
        let secs = exp
            .as_i64()
            .or_else(|| exp.as_f64().map(|f| f.trunc() as i64))?;
        Utc.timestamp_opt(secs, 0).single()
    }

    /// Realm roles (`realm_access.roles`)
    pub fn realm_roles(&self) -> Vec<String> {
        string_list(
            self.0
                .get("realm_access")
                .and_then(|access| access.get("roles")),
        )
    }

    /// Group memberships (`groups`)
    pub fn groups(&self) -> Vec<String> {
        string_list(self.0.get("groups"))
    }
}

/// Base64url decode one token segment into a JSON object
fn decode_segment(segment: &str, what: &str) -> Result<Map<String, Value>, BrokerError> {
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| BrokerError::InvalidToken(format!("bad {} encoding: {}", what, e)))?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(BrokerError::InvalidToken(format!(
            "{} is not a JSON object",
            what
        ))),
        Err(e) => Err(BrokerError::InvalidToken(format!("bad {}: {}", what, e))),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn token(claims: &Value) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(b"claims-test-secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_decode_keycloak_token() {
        let raw = token(&json!({
            "sub": "f3c1",
            "exp": 1_900_000_000,
            "name": "Ada Lovelace",
            "email": "ada@example.org",
            "preferred_username": "ada",
            "realm_access": { "roles": ["offline_access", "student"] },
            "resource_access": { "flask-app": { "roles": ["Dev"] } },
            "groups": ["/cs"]
        }));

        let claims = Claims::decode(&raw).unwrap();
        assert_eq!(claims.name(), Some("Ada Lovelace"));
        assert_eq!(claims.preferred_username(), Some("ada"));
        assert_eq!(claims.realm_roles(), vec!["offline_access", "student"]);
        assert_eq!(claims.groups(), vec!["/cs"]);
        assert_eq!(claims.expires_at().unwrap().timestamp(), 1_900_000_000);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            Claims::decode("not-a-token"),
            Err(BrokerError::InvalidToken(_))
        ));

        // valid header, payload that is not an object
        let header = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(b"[1,2]");
        let raw = format!("{}.{}.sig", header, payload);
        assert!(Claims::decode(&raw).is_err());
    }

    #[test]
    fn test_decode_ignores_header_algorithm() {
        fn segment(json: &str) -> String {
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
        }
        let payload = segment(r#"{"exp":1900000000,"name":"Ada"}"#);

        for alg in ["ES512", "RS256", "PS512", "none"] {
            let header = segment(&format!(r#"{{"alg":"{}","typ":"JWT"}}"#, alg));
            let raw = format!("{}.{}.sig", header, payload);
            let claims = Claims::decode(&raw).unwrap();
            assert_eq!(claims.name(), Some("Ada"), "alg {}", alg);
            assert_eq!(claims.expires_at().unwrap().timestamp(), 1_900_000_000);
        }

        // header must still be a JSON object
        let raw = format!("{}.{}.sig", segment("[]"), payload);
        assert!(matches!(
            Claims::decode(&raw),
            Err(BrokerError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_missing_claims_are_empty() {
        let claims = Claims::default();
        assert!(claims.expires_at().is_none());
        assert!(claims.realm_roles().is_empty());
        assert!(claims.name().is_none());
    }
}
