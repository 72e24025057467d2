// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access token validation.
//!
//! Only the configured algorithm is accepted. `iss` must match the
//! configured issuer and `sub`, `iat`, `exp` must be present. `iat` may
//! not lie further in the future than the clock skew leeway. Validation
//! never touches storage.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{decode, errors::ErrorKind, Validation};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::claims::AccessTokenClaims;
use super::error::TokenError;
use super::signing::SigningConfig;
use crate::claims::encode::{
    claim_key, ALLOWED_ROLES_CLAIM, DEFAULT_ROLE_CLAIM, USER_ID_CLAIM, USER_IS_ANONYMOUS_CLAIM,
};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

#[derive(Clone)]
pub struct TokenValidator {
    signing: Arc<SigningConfig>,
    validation: Validation,
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("signing", &self.signing)
            .finish_non_exhaustive()
    }
}

impl TokenValidator {
    pub fn new(signing: Arc<SigningConfig>) -> Self {
        let mut validation = Validation::new(signing.algorithm());
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;
        validation.set_issuer(&[signing.issuer()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            signing,
            validation,
        }
    }

    /// Verify signature, algorithm, issuer and expiry.
    pub fn validate(&self, token: &str) -> Result<ValidatedToken, TokenError> {
        let data = decode::<AccessTokenClaims>(token, self.signing.decoding_key(), &self.validation)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                    ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                        TokenError::InvalidAlgorithm
                    }
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    ErrorKind::InvalidIssuer => TokenError::InvalidIssuer,
                    ErrorKind::MissingRequiredClaim(claim) => TokenError::MissingClaim(claim.clone()),
                    _ => TokenError::Malformed,
                };
                debug!(error = %e, reason = %reason, "Rejected access token");
                reason
            })?;

        let claims = data.claims;
        let Some(iat) = claims.iat else {
            debug!("Rejected access token without iat");
            return Err(TokenError::MissingClaim("iat".to_string()));
        };
        if iat > Utc::now().timestamp().saturating_add(CLOCK_SKEW_LEEWAY as i64) {
            debug!(iat, "Rejected access token issued in the future");
            return Err(TokenError::IssuedInFuture);
        }
        if claims.sub.is_empty() {
            debug!("Rejected access token with empty sub");
            return Err(TokenError::MissingClaim("sub".to_string()));
        }

        let namespace = claims
            .namespace(self.signing.claims_namespace())
            .cloned()
            .unwrap_or_default();

        Ok(ValidatedToken { claims, namespace })
    }
}

/// Read-only view over the claims of a validated token.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedToken {
    claims: AccessTokenClaims,
    namespace: Map<String, Value>,
}

impl ValidatedToken {
    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    /// Same as [`subject`](Self::subject).
    pub fn user_id(&self) -> &str {
        self.subject()
    }

    pub fn issuer(&self) -> &str {
        &self.claims.iss
    }

    pub fn issued_at(&self) -> i64 {
        self.claims.iat.unwrap_or_default()
    }

    pub fn expires_at(&self) -> i64 {
        self.claims.exp
    }

    pub fn claims(&self) -> &AccessTokenClaims {
        &self.claims
    }

    /// String value of a namespace claim. The name is looked up with the
    /// `x-hasura-` prefix applied.
    pub fn custom_claim(&self, name: &str) -> Option<&str> {
        self.namespace.get(&claim_key(name)).and_then(Value::as_str)
    }

    pub fn is_anonymous(&self) -> bool {
        self.custom_claim(USER_IS_ANONYMOUS_CLAIM) == Some("true")
    }

    pub fn default_role(&self) -> Option<&str> {
        self.custom_claim(DEFAULT_ROLE_CLAIM)
    }

    pub fn allowed_roles(&self) -> Vec<&str> {
        self.namespace
            .get(ALLOWED_ROLES_CLAIM)
            .and_then(Value::as_array)
            .map(|roles| roles.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// `x-hasura-user-id` parsed as a UUID.
    pub fn hasura_user_id(&self) -> Option<Uuid> {
        self.custom_claim(USER_ID_CLAIM)
            .and_then(|id| Uuid::parse_str(id).ok())
    }
}
