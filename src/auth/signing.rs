// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing configuration.
//!
//! Parsed from the `HASURA_GRAPHQL_JWT_SECRET` JSON document:
//!
//! ```json
//! { "type": "HS256", "key": "<secret>", "issuer": "hasura-auth",
//!   "claims_namespace": "https://hasura.io/jwt/claims" }
//! ```
//!
//! HMAC algorithms use `key` for both signing and validation. RSA
//! algorithms take the PEM public key in `key` and the PEM private key in
//! `signing_key`; the public key is also published as a JWKS.

use base64ct::{Base64UrlUnpadded, Encoding};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Issuer used when the configuration does not name one.
pub const DEFAULT_ISSUER: &str = "hasura-auth";

/// Claims namespace used when the configuration does not name one.
pub const DEFAULT_CLAIMS_NAMESPACE: &str = "https://hasura.io/jwt/claims";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SigningConfigError {
    #[error("error unmarshalling jwt secret: {0}")]
    MalformedJson(String),

    #[error("unsupported jwt type: {0}")]
    UnsupportedAlgorithm(String),

    #[error("{0} is required for {1}")]
    MissingKey(&'static str, String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),
}

#[derive(Deserialize)]
struct RawSigningConfig {
    #[serde(rename = "type")]
    algorithm: String,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    signing_key: Option<String>,
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    issuer: Option<String>,
    #[serde(default)]
    claims_namespace: Option<String>,
}

/// Public key entry of the published JWKS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Jwk {
    pub alg: String,
    pub e: String,
    pub kid: String,
    pub kty: String,
    pub n: String,
    #[serde(rename = "use")]
    pub use_: String,
}

/// Key material and token parameters. Immutable once built.
#[derive(Clone)]
pub struct SigningConfig {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    kid: Option<String>,
    issuer: String,
    claims_namespace: String,
    jwks: Vec<Jwk>,
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningConfig")
            .field("algorithm", &self.algorithm)
            .field("kid", &self.kid)
            .field("issuer", &self.issuer)
            .field("claims_namespace", &self.claims_namespace)
            .finish_non_exhaustive()
    }
}

impl SigningConfig {
    /// Parse the JSON signing configuration.
    pub fn from_json(json: &str) -> Result<Self, SigningConfigError> {
        let raw: RawSigningConfig =
            serde_json::from_str(json).map_err(|e| SigningConfigError::MalformedJson(e.to_string()))?;

        let issuer = raw
            .issuer
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ISSUER.to_string());
        let claims_namespace = raw
            .claims_namespace
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_CLAIMS_NAMESPACE.to_string());

        let mut config = match raw.algorithm.as_str() {
            "HS256" | "HS384" | "HS512" => {
                let key = raw
                    .key
                    .ok_or_else(|| SigningConfigError::MissingKey("key", raw.algorithm.clone()))?;
                Self::hmac(parse_algorithm(&raw.algorithm)?, key.as_bytes())
            }
            "RS256" | "RS384" | "RS512" => {
                let public = raw
                    .key
                    .ok_or_else(|| SigningConfigError::MissingKey("key", raw.algorithm.clone()))?;
                let private = raw.signing_key.ok_or_else(|| {
                    SigningConfigError::MissingKey("signing_key", raw.algorithm.clone())
                })?;
                Self::rsa(
                    parse_algorithm(&raw.algorithm)?,
                    &public,
                    &private,
                    raw.kid.as_deref(),
                )?
            }
            other => return Err(SigningConfigError::UnsupportedAlgorithm(other.to_string())),
        };

        config.kid = raw.kid.filter(|k| !k.is_empty());
        config.issuer = issuer;
        config.claims_namespace = claims_namespace;
        Ok(config)
    }

    /// HMAC configuration with default issuer and namespace.
    pub fn hmac(algorithm: Algorithm, secret: &[u8]) -> Self {
        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            kid: None,
            issuer: DEFAULT_ISSUER.to_string(),
            claims_namespace: DEFAULT_CLAIMS_NAMESPACE.to_string(),
            jwks: Vec::new(),
        }
    }

    /// RSA configuration from PEM keys. The JWKS entry uses `kid`, or a
    /// random id when none is given.
    pub fn rsa(
        algorithm: Algorithm,
        public_pem: &str,
        private_pem: &str,
        kid: Option<&str>,
    ) -> Result<Self, SigningConfigError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| SigningConfigError::InvalidKey(format!("error parsing rsa private key: {e}")))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| SigningConfigError::InvalidKey(format!("error parsing rsa public key: {e}")))?;

        let public_key = RsaPublicKey::from_pkcs1_pem(public_pem)
            .or_else(|_| RsaPublicKey::from_public_key_pem(public_pem))
            .map_err(|e| SigningConfigError::InvalidKey(format!("error parsing rsa public key: {e}")))?;

        let jwk = Jwk {
            alg: format!("{algorithm:?}"),
            e: Base64UrlUnpadded::encode_string(&public_key.e().to_bytes_be()),
            kid: kid
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            kty: "RSA".to_string(),
            n: Base64UrlUnpadded::encode_string(&public_key.n().to_bytes_be()),
            use_: "sig".to_string(),
        };

        Ok(Self {
            algorithm,
            encoding_key,
            decoding_key,
            kid: kid.filter(|k| !k.is_empty()).map(str::to_string),
            issuer: DEFAULT_ISSUER.to_string(),
            claims_namespace: DEFAULT_CLAIMS_NAMESPACE.to_string(),
            jwks: vec![jwk],
        })
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn claims_namespace(&self) -> &str {
        &self.claims_namespace
    }

    /// Public keys to publish. Empty for HMAC.
    pub fn jwks(&self) -> &[Jwk] {
        &self.jwks
    }
}

fn parse_algorithm(name: &str) -> Result<Algorithm, SigningConfigError> {
    match name {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        "RS256" => Ok(Algorithm::RS256),
        "RS384" => Ok(Algorithm::RS384),
        "RS512" => Ok(Algorithm::RS512),
        other => Err(SigningConfigError::UnsupportedAlgorithm(other.to_string())),
    }
}
