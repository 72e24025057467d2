// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Claim encoding and the Hasura claims namespace.
//!
//! Hasura reads session variables as strings, so every custom claim is
//! rendered into a string before it goes into the token:
//!
//! | Value | Encoded |
//! |-------|---------|
//! | null | `null` |
//! | list | brace-delimited array literal, e.g. `{"a","b"}` |
//! | string | the raw string, unquoted |
//! | number, bool, object | JSON |

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use super::value::{ExtractedValue, Scalar};

/// Prefix of every key inside the claims namespace.
pub const CLAIM_PREFIX: &str = "x-hasura-";

pub const ALLOWED_ROLES_CLAIM: &str = "x-hasura-allowed-roles";
pub const DEFAULT_ROLE_CLAIM: &str = "x-hasura-default-role";
pub const USER_ID_CLAIM: &str = "x-hasura-user-id";
pub const USER_IS_ANONYMOUS_CLAIM: &str = "x-hasura-user-is-anonymous";

/// Keys that configuration can never override.
pub const RESERVED_CLAIMS: [&str; 4] = [
    ALLOWED_ROLES_CLAIM,
    DEFAULT_ROLE_CLAIM,
    USER_ID_CLAIM,
    USER_IS_ANONYMOUS_CLAIM,
];

/// Encode a value into its session-variable string.
pub fn encode(value: &ExtractedValue) -> String {
    match value {
        ExtractedValue::Null => "null".to_string(),
        ExtractedValue::Scalar(Scalar::String(s)) => s.clone(),
        ExtractedValue::List(_) => {
            let json = value.to_json().to_string();
            // A JSON array always renders as `[...]`.
            format!("{{{}}}", &json[1..json.len() - 1])
        }
        ExtractedValue::Scalar(Scalar::Number(_) | Scalar::Bool(_)) | ExtractedValue::Object(_) => {
            value.to_json().to_string()
        }
    }
}

/// Namespace key for a claim name: lower-cased and `x-hasura-` prefixed
/// unless the prefix is already there.
pub fn claim_key(name: &str) -> String {
    let lower = name.to_lowercase();
    if lower.starts_with(CLAIM_PREFIX) {
        lower
    } else {
        format!("{CLAIM_PREFIX}{lower}")
    }
}

/// Whether a claim name would land on one of the reserved keys.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_CLAIMS.contains(&claim_key(name).as_str())
}

/// The object stored under the claims namespace of an access token.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceClaims {
    entries: Map<String, Value>,
}

impl NamespaceClaims {
    pub fn new(user_id: &str, is_anonymous: bool, allowed_roles: &[String], default_role: &str) -> Self {
        let mut entries = Map::new();
        entries.insert(
            ALLOWED_ROLES_CLAIM.to_string(),
            Value::Array(allowed_roles.iter().cloned().map(Value::String).collect()),
        );
        entries.insert(
            DEFAULT_ROLE_CLAIM.to_string(),
            Value::String(default_role.to_string()),
        );
        entries.insert(USER_ID_CLAIM.to_string(), Value::String(user_id.to_string()));
        entries.insert(
            USER_IS_ANONYMOUS_CLAIM.to_string(),
            Value::String(is_anonymous.to_string()),
        );
        Self { entries }
    }

    /// Add configured custom claims. A claim whose key is already present
    /// (the four reserved keys) is dropped.
    pub fn add_custom(&mut self, claims: &BTreeMap<String, ExtractedValue>) {
        for (name, value) in claims {
            let key = claim_key(name);
            if self.entries.contains_key(&key) {
                debug!(claim = %name, key = %key, "Dropping custom claim that collides with a built-in claim");
                continue;
            }
            self.entries.insert(key, Value::String(encode(value)));
        }
    }

    /// Add claims supplied by the caller. These may replace existing keys.
    pub fn add_extra(&mut self, claims: &BTreeMap<String, ExtractedValue>) {
        for (name, value) in claims {
            self.entries
                .insert(claim_key(name), Value::String(encode(value)));
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.entries)
    }
}
