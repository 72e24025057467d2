// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Why a token was rejected or could not be signed.
///
/// Only logged. Callers see [`AuthError::InvalidToken`] for every
/// validation failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token algorithm is not accepted")]
    InvalidAlgorithm,

    #[error("token has expired")]
    Expired,

    #[error("token issuer is invalid")]
    InvalidIssuer,

    #[error("token was issued in the future")]
    IssuedInFuture,

    #[error("token is missing required claim: {0}")]
    MissingClaim(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Authentication error type.
#[derive(Debug)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Invalid authorization header format
    InvalidAuthHeader,
    /// Token failed validation
    InvalidToken,
    /// Token is valid but lacks the elevated claim for this operation
    ElevatedClaimRequired,
    /// Internal error
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::InvalidToken => "invalid_token",
            AuthError::ElevatedClaimRequired => "elevated_claim_required",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::InvalidToken
            | AuthError::ElevatedClaimRequired => StatusCode::UNAUTHORIZED,
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::InvalidToken => write!(f, "Invalid or expired token"),
            AuthError::ElevatedClaimRequired => {
                write!(f, "Elevated claim required for this operation")
            }
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(msg) => AuthError::InternalError(msg),
            _ => AuthError::InvalidToken,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: AuthError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body_bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_auth_returns_401() {
        let (status, body) = body_of(AuthError::MissingAuthHeader).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "missing_auth_header");
    }

    #[tokio::test]
    async fn token_reasons_collapse_to_invalid_token() {
        for reason in [
            TokenError::Malformed,
            TokenError::InvalidSignature,
            TokenError::InvalidAlgorithm,
            TokenError::Expired,
            TokenError::InvalidIssuer,
            TokenError::IssuedInFuture,
            TokenError::MissingClaim("iat".to_string()),
        ] {
            let (status, body) = body_of(AuthError::from(reason)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error_code"], "invalid_token");
            assert_eq!(body["error"], "Invalid or expired token");
        }
    }

    #[tokio::test]
    async fn elevated_claim_required_is_distinct() {
        let (status, body) = body_of(AuthError::ElevatedClaimRequired).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "elevated_claim_required");
    }

    #[tokio::test]
    async fn signing_failure_is_internal() {
        let (status, body) = body_of(AuthError::from(TokenError::Signing("bad key".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error_code"], "internal_error");
    }
}
