// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token endpoints.

use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::extractor::bearer_token;
use crate::auth::{AuthError, Elevated, Jwk, ValidatedToken, ELEVATED_CLAIM};
use crate::state::AppState;

/// Request body for POST /v1/token/verify
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyTokenRequest {
    /// Access token. Falls back to the bearer token when omitted.
    #[serde(default)]
    pub token: Option<String>,
}

/// Identity carried by a valid access token.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenInfo {
    /// Subject (user ID)
    pub subject: String,
    /// Whether the user is anonymous
    pub is_anonymous: bool,
    /// Expiration timestamp (seconds since epoch)
    pub expires_at: i64,
    /// Default Hasura role
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_role: Option<String>,
    /// Allowed Hasura roles
    pub allowed_roles: Vec<String>,
    /// Whether the token carries the elevated claim for its subject
    pub elevated: bool,
}

impl From<&ValidatedToken> for TokenInfo {
    fn from(token: &ValidatedToken) -> Self {
        Self {
            subject: token.subject().to_string(),
            is_anonymous: token.is_anonymous(),
            expires_at: token.expires_at(),
            default_role: token.default_role().map(str::to_string),
            allowed_roles: token.allowed_roles().into_iter().map(str::to_string).collect(),
            elevated: token.custom_claim(ELEVATED_CLAIM) == Some(token.subject()),
        }
    }
}

/// Public signing keys.
#[derive(Debug, Serialize, ToSchema)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

/// Verify an access token.
///
/// The token is read from the body, or from the `Authorization` header when
/// the body is absent.
#[utoipa::path(
    post,
    path = "/v1/token/verify",
    tag = "Token",
    request_body(content = VerifyTokenRequest, description = "Token to verify; optional when a bearer token is sent"),
    responses(
        (status = 200, description = "Token is valid", body = TokenInfo),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn verify_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<VerifyTokenRequest>>,
) -> Result<Json<TokenInfo>, AuthError> {
    let from_body = body.and_then(|Json(request)| request.token);
    let token = match from_body.as_deref() {
        Some(token) => token,
        None => bearer_token(&headers)?,
    };

    let validated = state.jwt.load().validator.validate(token)?;
    Ok(Json(TokenInfo::from(&validated)))
}

/// Check that the bearer token may perform elevated operations.
#[utoipa::path(
    get,
    path = "/v1/token/elevated",
    tag = "Token",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Token passes the elevated access gate", body = TokenInfo),
        (status = 401, description = "Invalid token or elevated claim required"),
    )
)]
pub async fn check_elevated(Elevated(token): Elevated) -> Json<TokenInfo> {
    Json(TokenInfo::from(&token))
}

/// Public keys for verifying access tokens. Empty for HMAC signing.
#[utoipa::path(
    get,
    path = "/.well-known/jwks.json",
    tag = "Token",
    responses(
        (status = 200, description = "JSON Web Key Set", body = JwksResponse)
    )
)]
pub async fn jwks(State(state): State<AppState>) -> Json<JwksResponse> {
    Json(JwksResponse {
        keys: state.jwt.load().signing().jwks().to_vec(),
    })
}
