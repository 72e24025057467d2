// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access token claims.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Registered claims of an access token plus everything else it carries.
///
/// Registered fields default when absent so the validator can report the
/// missing claim by name instead of a generic decode failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    #[serde(default)]
    pub sub: String,

    /// Issuer
    #[serde(default)]
    pub iss: String,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: Option<i64>,

    /// Expiration timestamp
    #[serde(default)]
    pub exp: i64,

    /// Namespace object and any other claims
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AccessTokenClaims {
    /// The object stored under `namespace`, if present.
    pub fn namespace(&self, namespace: &str) -> Option<&Map<String, Value>> {
        self.extra.get(namespace).and_then(Value::as_object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_registered_claims_default() {
        let claims: AccessTokenClaims = serde_json::from_value(json!({"exp": 10})).unwrap();
        assert_eq!(claims.sub, "");
        assert_eq!(claims.iat, None);
        assert_eq!(claims.exp, 10);
    }

    #[test]
    fn namespace_lookup() {
        let claims: AccessTokenClaims = serde_json::from_value(json!({
            "sub": "u1",
            "iss": "hasura-auth",
            "iat": 1,
            "exp": 2,
            "ns": {"x-hasura-user-id": "u1"},
            "scalar": "x"
        }))
        .unwrap();

        assert_eq!(
            claims.namespace("ns").and_then(|ns| ns.get("x-hasura-user-id")),
            Some(&json!("u1"))
        );
        assert!(claims.namespace("scalar").is_none());
        assert!(claims.namespace("missing").is_none());
    }
}
