// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Custom Claims
//!
//! Administrators configure extra token claims as a JSON object mapping a
//! claim name to a path over the user entity:
//!
//! ```json
//! { "org": "profile.org_id", "teams": "memberships[*].team_id" }
//! ```
//!
//! ## Flow
//!
//! 1. At startup every path is parsed ([`path`]) and the selection
//!    fragments are merged ([`tree`]) into one GraphQL query
//! 2. At issuance the query is sent for the subject ([`fetcher`])
//! 3. Each claim's path is evaluated against the returned `user` object
//!    ([`extract`]); misses become `null` or the configured default
//! 4. The token issuer encodes the values ([`encode`]) into the claims
//!    namespace
//!
//! Compiled claims are immutable and shared between requests.

pub mod encode;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod path;
pub mod tree;
pub mod value;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

pub use encode::{claim_key, encode, NamespaceClaims};
pub use error::{ClaimsConfigError, FetchError};
pub use fetcher::{AdminSecretInterceptor, ClaimsFetcher, RequestInterceptor};
pub use path::ClaimPath;
pub use tree::{Selection, SelectionTree};
pub use value::{ExtractedValue, Scalar};

/// Claim name to extracted value.
pub type ClaimValues = BTreeMap<String, ExtractedValue>;

/// Source of custom claims for a user.
#[async_trait]
pub trait CustomClaimer: Send + Sync {
    async fn get_claims(&self, user_id: &str) -> Result<ClaimValues, FetchError>;
}

/// Parse the claims configuration: a JSON object of claim name to path.
pub fn parse_claim_specs(json: &str) -> Result<BTreeMap<String, String>, ClaimsConfigError> {
    serde_json::from_str(json).map_err(|e| ClaimsConfigError::MalformedJson(e.to_string()))
}

/// Parse per-claim fallback values: a JSON object of claim name to value.
pub fn parse_claim_defaults(json: &str) -> Result<ClaimValues, ClaimsConfigError> {
    let raw: serde_json::Map<String, Value> =
        serde_json::from_str(json).map_err(|e| ClaimsConfigError::MalformedDefaults(e.to_string()))?;
    Ok(raw
        .into_iter()
        .map(|(name, value)| (name, ExtractedValue::from(value)))
        .collect())
}

/// Claim paths compiled into a single query.
#[derive(Debug, Clone)]
pub struct CompiledClaims {
    paths: BTreeMap<String, ClaimPath>,
    selection: SelectionTree,
    query: String,
}

impl CompiledClaims {
    /// Parse every path and merge their selections.
    pub fn compile(specs: &BTreeMap<String, String>) -> Result<Self, ClaimsConfigError> {
        let mut paths = BTreeMap::new();
        let mut selection = SelectionTree::new();

        for (name, raw) in specs {
            let path = ClaimPath::parse(name, raw)?;
            selection = selection.merge(path.selection())?;

            if encode::is_reserved(name) {
                warn!(
                    claim = %name,
                    "Custom claim collides with a built-in claim and will never be included in tokens"
                );
            }

            paths.insert(name.clone(), path);
        }

        let query = format!(
            "query GetClaims($id: uuid!) {{ {}(id:$id) {} }}",
            fetcher::ENTITY_FIELD,
            selection.render()
        );

        Ok(Self {
            paths,
            selection,
            query,
        })
    }

    pub fn graphql_query(&self) -> &str {
        &self.query
    }

    pub fn selection(&self) -> &SelectionTree {
        &self.selection
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Evaluate every claim against the fetched entity.
    pub fn extract(&self, entity: &Value) -> ClaimValues {
        self.paths
            .iter()
            .map(|(name, path)| (name.clone(), extract::extract(path, entity)))
            .collect()
    }
}

/// Custom claims backed by the GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct CustomClaims {
    compiled: CompiledClaims,
    fetcher: ClaimsFetcher,
    defaults: ClaimValues,
}

impl CustomClaims {
    pub fn new(compiled: CompiledClaims, fetcher: ClaimsFetcher) -> Self {
        Self {
            compiled,
            fetcher,
            defaults: ClaimValues::new(),
        }
    }

    /// Values used when a claim extracts to `null`.
    pub fn with_defaults(mut self, defaults: ClaimValues) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn graphql_query(&self) -> &str {
        self.compiled.graphql_query()
    }

    /// Extract claims from an entity, applying defaults for misses.
    pub fn extract_claims(&self, entity: &Value) -> ClaimValues {
        let mut claims = self.compiled.extract(entity);
        for (name, value) in claims.iter_mut() {
            if value.is_null() {
                if let Some(default) = self.defaults.get(name) {
                    *value = default.clone();
                }
            }
        }
        claims
    }
}

#[async_trait]
impl CustomClaimer for CustomClaims {
    async fn get_claims(&self, user_id: &str) -> Result<ClaimValues, FetchError> {
        let entity = self
            .fetcher
            .fetch_entity(self.compiled.graphql_query(), user_id)
            .await?;
        let claims = self.extract_claims(&Value::Object(entity));
        debug!(user_id = %user_id, claims = claims.len(), "Fetched custom claims");
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::fetcher::test_server::{spawn, Endpoint};
    use super::*;
    use serde_json::json;

    const SPECS: &str = r#"{
        "key": "m.k",
        "array[]": "m.l[]",
        "array[].ids": "m.lm[*].id",
        "metadata.m1": "metadata.m1",
        "nonexistent": "nonexistent.nonexistent"
    }"#;

    fn entity() -> Value {
        json!({
            "m": {
                "k": "v",
                "l": ["a", "b", "c"],
                "lm": [{"id": 1}, {"id": 2}, {"id": 3}]
            },
            "metadata": {"m1": 1}
        })
    }

    fn compiled() -> CompiledClaims {
        CompiledClaims::compile(&parse_claim_specs(SPECS).unwrap()).unwrap()
    }

    #[test]
    fn synthesizes_sorted_query() {
        let compiled = compiled();
        assert_eq!(
            compiled.selection().render(),
            "{m{k l lm{id }}metadata nonexistent{nonexistent }}"
        );
        assert_eq!(
            compiled.graphql_query(),
            "query GetClaims($id: uuid!) { user(id:$id) {m{k l lm{id }}metadata nonexistent{nonexistent }} }"
        );
    }

    #[test]
    fn query_is_deterministic() {
        let first = compiled();
        for _ in 0..10 {
            assert_eq!(compiled().graphql_query(), first.graphql_query());
        }
    }

    #[test]
    fn merge_order_does_not_matter() {
        let specs = parse_claim_specs(SPECS).unwrap();
        let fragments: Vec<SelectionTree> = specs
            .iter()
            .map(|(name, raw)| ClaimPath::parse(name, raw).unwrap().selection())
            .collect();

        let forward = fragments
            .iter()
            .cloned()
            .try_fold(SelectionTree::new(), SelectionTree::merge)
            .unwrap();
        let backward = fragments
            .iter()
            .rev()
            .cloned()
            .try_fold(SelectionTree::new(), SelectionTree::merge)
            .unwrap();
        let mut rotated = fragments.clone();
        rotated.rotate_left(2);
        let rotated = rotated
            .into_iter()
            .try_fold(SelectionTree::new(), SelectionTree::merge)
            .unwrap();

        assert_eq!(forward, backward);
        assert_eq!(forward, rotated);
        assert_eq!(&forward, compiled().selection());
    }

    #[test]
    fn extracts_and_encodes_claims() {
        let claims = compiled().extract(&entity());

        assert_eq!(claims["key"], ExtractedValue::from("v"));
        assert_eq!(claims["array[]"], ExtractedValue::from(vec!["a", "b", "c"]));
        assert_eq!(claims["array[].ids"], ExtractedValue::from(vec![1i64, 2, 3]));
        assert_eq!(claims["metadata.m1"], ExtractedValue::from(1i64));
        assert_eq!(claims["nonexistent"], ExtractedValue::Null);

        assert_eq!(encode(&claims["key"]), "v");
        assert_eq!(encode(&claims["array[]"]), r#"{"a","b","c"}"#);
        assert_eq!(encode(&claims["array[].ids"]), "{1,2,3}");
        assert_eq!(encode(&claims["metadata.m1"]), "1");
        assert_eq!(encode(&claims["nonexistent"]), "null");
    }

    #[test]
    fn defaults_fill_misses() {
        let fetcher = ClaimsFetcher::new("http://localhost:8080/v1/graphql").unwrap();
        let defaults = parse_claim_defaults(r#"{"nonexistent": "fallback", "key": "unused"}"#).unwrap();
        let claims = CustomClaims::new(compiled(), fetcher)
            .with_defaults(defaults)
            .extract_claims(&entity());

        assert_eq!(claims["nonexistent"], ExtractedValue::from("fallback"));
        assert_eq!(claims["key"], ExtractedValue::from("v"));
    }

    #[test]
    fn rejects_malformed_configuration() {
        assert!(matches!(
            parse_claim_specs(r#"{"a": 1}"#),
            Err(ClaimsConfigError::MalformedJson(_))
        ));
        assert!(matches!(
            parse_claim_specs("[]"),
            Err(ClaimsConfigError::MalformedJson(_))
        ));
        assert!(matches!(
            parse_claim_defaults("nope"),
            Err(ClaimsConfigError::MalformedDefaults(_))
        ));

        let mut specs = BTreeMap::new();
        specs.insert("bad".to_string(), "m.{k}".to_string());
        assert!(matches!(
            CompiledClaims::compile(&specs),
            Err(ClaimsConfigError::InvalidPath { claim, .. }) if claim == "bad"
        ));
    }

    #[tokio::test]
    async fn fetches_claims_for_user() {
        let endpoint = Endpoint::ok(json!({"data": {"user": entity()}}));
        let url = spawn(endpoint.clone()).await;

        let claimer = CustomClaims::new(compiled(), ClaimsFetcher::new(&url).unwrap());
        let claims = claimer.get_claims("585e21fc-3664-4d03-8539-69945342a4f4").await.unwrap();

        assert_eq!(claims.len(), 5);
        assert_eq!(claims["array[].ids"], ExtractedValue::from(vec![1i64, 2, 3]));

        let body = endpoint.seen_body.lock().unwrap().clone().unwrap();
        assert_eq!(body["query"], json!(claimer.graphql_query()));
        assert_eq!(body["variables"]["id"], json!("585e21fc-3664-4d03-8539-69945342a4f4"));
    }
}
