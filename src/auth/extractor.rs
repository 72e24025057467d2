// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated requests.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(token): Auth) -> impl IntoResponse {
//!     // token is a ValidatedToken
//! }
//!
//! async fn sensitive(Elevated(token): Elevated) -> impl IntoResponse {
//!     // token also passed the elevated access gate
//! }
//! ```

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::error;

use super::elevated::GateError;
use super::{AuthError, ValidatedToken};
use crate::state::AppState;

/// Bearer token from the `Authorization` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
}

/// Extractor for a validated access token.
pub struct Auth(pub ValidatedToken);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let snapshot = state.jwt.load();
        let validated = snapshot.validator.validate(token)?;
        Ok(Auth(validated))
    }
}

/// Extractor for a validated token that also passes the elevated gate.
///
/// The request path is handed to the gate so enrollment routes get their
/// exemption.
pub struct Elevated(pub ValidatedToken);

impl FromRequestParts<AppState> for Elevated {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(token) = Auth::from_request_parts(parts, state).await?;

        let path = parts
            .extensions
            .get::<OriginalUri>()
            .map(|uri| uri.0.path().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        state
            .gate
            .check(&token, Some(&path))
            .await
            .map_err(|e| match e {
                GateError::ElevatedClaimRequired => AuthError::ElevatedClaimRequired,
                GateError::Store(e) => {
                    error!(user_id = %token.subject(), error = %e, "Elevated access check failed");
                    AuthError::InternalError(e.to_string())
                }
            })?;

        Ok(Elevated(token))
    }
}

#[cfg(test)]
pub(crate) mod test_state {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::auth::signing::test_keys::HS256_SECRET;
    use crate::auth::{
        ElevatedAccessGate, ElevatedPolicy, IssueRequest, JwtHandle, JwtSnapshot, SigningConfig,
    };
    use crate::state::AppState;
    use crate::store::InMemorySecurityKeyStore;

    pub const USER_ID: &str = "585e21fc-3664-4d03-8539-69945342a4f4";

    pub fn state(policy: ElevatedPolicy, store: Arc<InMemorySecurityKeyStore>) -> AppState {
        let snapshot = JwtSnapshot::new(
            SigningConfig::from_json(HS256_SECRET).unwrap(),
            None,
            Duration::from_secs(900),
        );
        AppState::new(JwtHandle::new(snapshot), ElevatedAccessGate::new(policy, store))
    }

    pub async fn token(state: &AppState, request: IssueRequest) -> String {
        state.jwt.load().issuer.issue(&request).await.unwrap().access_token
    }

    pub fn request() -> IssueRequest {
        IssueRequest::new(USER_ID, vec!["user".to_string()], "user")
    }
}
