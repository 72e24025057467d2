// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access token issuance.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{encode, Header};
use serde_json::{Map, Value};
use tracing::{debug, error};

use super::elevated::ELEVATED_CLAIM;
use super::error::TokenError;
use super::signing::SigningConfig;
use crate::claims::{ClaimValues, CustomClaimer, ExtractedValue, NamespaceClaims};

/// Default access token lifetime (15 minutes).
pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(900);

/// Who the token is for.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueRequest {
    pub user_id: String,
    pub is_anonymous: bool,
    pub allowed_roles: Vec<String>,
    pub default_role: String,
    /// Encoded like custom claims, but may replace any namespace key.
    pub extra_claims: ClaimValues,
}

impl IssueRequest {
    pub fn new(
        user_id: impl Into<String>,
        allowed_roles: Vec<String>,
        default_role: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            is_anonymous: false,
            allowed_roles,
            default_role: default_role.into(),
            extra_claims: ClaimValues::new(),
        }
    }

    pub fn anonymous(mut self, is_anonymous: bool) -> Self {
        self.is_anonymous = is_anonymous;
        self
    }

    pub fn with_extra_claim(mut self, name: impl Into<String>, value: impl Into<ExtractedValue>) -> Self {
        self.extra_claims.insert(name.into(), value.into());
        self
    }

    /// Mark the token as elevated for its own subject.
    pub fn elevated(self) -> Self {
        let user_id = self.user_id.clone();
        self.with_extra_claim(ELEVATED_CLAIM, user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    /// Lifetime in seconds
    pub expires_in: u64,
}

/// Signs access tokens, optionally enriched with custom claims.
#[derive(Clone)]
pub struct TokenIssuer {
    signing: Arc<SigningConfig>,
    claimer: Option<Arc<dyn CustomClaimer>>,
    access_token_ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("signing", &self.signing)
            .field("custom_claims", &self.claimer.is_some())
            .field("access_token_ttl", &self.access_token_ttl)
            .finish()
    }
}

impl TokenIssuer {
    pub fn new(signing: Arc<SigningConfig>) -> Self {
        Self {
            signing,
            claimer: None,
            access_token_ttl: DEFAULT_ACCESS_TOKEN_TTL,
        }
    }

    pub fn with_custom_claims(mut self, claimer: Arc<dyn CustomClaimer>) -> Self {
        self.claimer = Some(claimer);
        self
    }

    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    pub fn signing(&self) -> &SigningConfig {
        &self.signing
    }

    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }

    pub fn has_custom_claims(&self) -> bool {
        self.claimer.is_some()
    }

    /// Build and sign an access token.
    ///
    /// A custom claims failure is logged and the token is issued without
    /// custom claims.
    pub async fn issue(&self, request: &IssueRequest) -> Result<IssuedToken, TokenError> {
        let custom = match &self.claimer {
            Some(claimer) => match claimer.get_claims(&request.user_id).await {
                Ok(claims) => claims,
                Err(e) => {
                    error!(
                        user_id = %request.user_id,
                        error = %e,
                        "Failed to fetch custom claims; issuing token without them"
                    );
                    ClaimValues::new()
                }
            },
            None => ClaimValues::new(),
        };

        let mut namespace = NamespaceClaims::new(
            &request.user_id,
            request.is_anonymous,
            &request.allowed_roles,
            &request.default_role,
        );
        namespace.add_custom(&custom);
        namespace.add_extra(&request.extra_claims);

        let mut claims = Map::new();
        claims.insert("sub".to_string(), Value::String(request.user_id.clone()));
        claims.insert(
            self.signing.claims_namespace().to_string(),
            namespace.into_value(),
        );

        let ttl = self.access_token_ttl.as_secs();
        let exp = Utc::now()
            .timestamp()
            .saturating_add(i64::try_from(ttl).unwrap_or(i64::MAX));
        let access_token = self.sign_claims(claims, exp)?;

        debug!(user_id = %request.user_id, expires_in = ttl, "Issued access token");

        Ok(IssuedToken {
            access_token,
            expires_in: ttl,
        })
    }

    /// Stamp `iss`, `iat` and `exp` onto `claims` and sign them.
    pub fn sign_claims(&self, mut claims: Map<String, Value>, exp: i64) -> Result<String, TokenError> {
        claims.insert(
            "iss".to_string(),
            Value::String(self.signing.issuer().to_string()),
        );
        claims.insert("iat".to_string(), Value::from(Utc::now().timestamp()));
        claims.insert("exp".to_string(), Value::from(exp));

        let mut header = Header::new(self.signing.algorithm());
        header.kid = self.signing.kid().map(str::to_string);

        encode(&header, &claims, self.signing.encoding_key())
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}
