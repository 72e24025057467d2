// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custom claims errors.
//!
//! Configuration errors are raised while compiling the claim configuration
//! and must stop startup (or a reload). Fetch errors happen per issuance and
//! are degraded to "no custom claims" by the token issuer.

use thiserror::Error;

/// Invalid custom claims configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClaimsConfigError {
    #[error("custom claims configuration is not a JSON object of strings: {0}")]
    MalformedJson(String),

    #[error("custom claim defaults are not a JSON object: {0}")]
    MalformedDefaults(String),

    #[error("invalid path for claim '{claim}': {reason}")]
    InvalidPath { claim: String, reason: String },

    #[error("conflicting selections at '{location}'")]
    MergeConflict { location: String },

    #[error("invalid GraphQL URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

impl ClaimsConfigError {
    pub(crate) fn invalid_path(claim: &str, reason: impl Into<String>) -> Self {
        ClaimsConfigError::InvalidPath {
            claim: claim.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure while fetching the entity that custom claims are extracted from.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to encode request: {0}")]
    Encode(String),

    #[error("failed to make request: {0}")]
    Transport(String),

    #[error("failed to decompress gzip response: {0}")]
    Decompress(String),

    #[error("response body exceeds {0} bytes")]
    ResponseTooLarge(usize),

    #[error("unexpected status code ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("failed to extract data from response")]
    MissingData,

    #[error("failed to extract {0} data from response")]
    MissingEntity(&'static str),
}
