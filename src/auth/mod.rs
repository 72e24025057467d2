// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Issues and validates Hasura-compatible access tokens.
//!
//! ## Token Layout
//!
//! ```json
//! {
//!   "sub": "<user id>", "iss": "hasura-auth", "iat": 0, "exp": 0,
//!   "https://hasura.io/jwt/claims": {
//!     "x-hasura-allowed-roles": ["user", "me"],
//!     "x-hasura-default-role": "user",
//!     "x-hasura-user-id": "<user id>",
//!     "x-hasura-user-is-anonymous": "false",
//!     "x-hasura-<custom>": "<encoded value>"
//!   }
//! }
//! ```
//!
//! ## Security
//!
//! - Only the configured algorithm is accepted
//! - Issuer, `iat` and `exp` are required; clock skew tolerance is 60 seconds
//! - Every rejection reason maps to a single `invalid_token` response
//! - Elevated operations additionally go through [`ElevatedAccessGate`]

pub mod claims;
pub mod elevated;
pub mod error;
pub mod extractor;
pub mod handle;
pub mod issuer;
pub mod signing;
pub mod validator;

pub use claims::AccessTokenClaims;
pub use elevated::{ElevatedAccessGate, ElevatedPolicy, GateError, ELEVATED_CLAIM};
pub use error::{AuthError, TokenError};
pub use extractor::{Auth, Elevated};
pub use handle::{JwtHandle, JwtSnapshot};
pub use issuer::{IssueRequest, IssuedToken, TokenIssuer};
pub use signing::{Jwk, SigningConfig, SigningConfigError};
pub use validator::{TokenValidator, ValidatedToken};
