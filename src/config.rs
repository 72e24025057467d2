// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HASURA_GRAPHQL_JWT_SECRET` | Signing configuration JSON | Required |
//! | `AUTH_ACCESS_TOKEN_EXPIRES_IN` | Access token lifetime in seconds | `900` |
//! | `AUTH_JWT_CUSTOM_CLAIMS` | Custom claim paths JSON | None |
//! | `AUTH_JWT_CUSTOM_CLAIMS_DEFAULTS` | Custom claim fallback values JSON | None |
//! | `HASURA_GRAPHQL_GRAPHQL_URL` | GraphQL endpoint for custom claims | Required with custom claims |
//! | `HASURA_GRAPHQL_ADMIN_SECRET` | Admin secret sent with claim queries | None |
//! | `AUTH_CUSTOM_CLAIMS_TIMEOUT_SECS` | Claim query timeout in seconds | `10` |
//! | `AUTH_REQUIRE_ELEVATED_CLAIM` | `disabled`, `recommended` or `required` | `disabled` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `4000` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; serve HTTPS when both are set | None |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::auth::{ElevatedPolicy, JwtSnapshot, SigningConfig, SigningConfigError};
use crate::claims::{
    parse_claim_defaults, parse_claim_specs, AdminSecretInterceptor, ClaimsConfigError,
    ClaimsFetcher, CompiledClaims, CustomClaimer, CustomClaims,
};

/// Signing configuration JSON (`type`, `key`, `signing_key`, `kid`,
/// `issuer`, `claims_namespace`).
pub const JWT_SECRET_ENV: &str = "HASURA_GRAPHQL_JWT_SECRET";

pub const ACCESS_TOKEN_EXPIRES_IN_ENV: &str = "AUTH_ACCESS_TOKEN_EXPIRES_IN";

/// JSON object of claim name to path, e.g. `{"org": "profile.org_id"}`.
pub const CUSTOM_CLAIMS_ENV: &str = "AUTH_JWT_CUSTOM_CLAIMS";

pub const CUSTOM_CLAIMS_DEFAULTS_ENV: &str = "AUTH_JWT_CUSTOM_CLAIMS_DEFAULTS";

pub const GRAPHQL_URL_ENV: &str = "HASURA_GRAPHQL_GRAPHQL_URL";

pub const ADMIN_SECRET_ENV: &str = "HASURA_GRAPHQL_ADMIN_SECRET";

pub const CUSTOM_CLAIMS_TIMEOUT_ENV: &str = "AUTH_CUSTOM_CLAIMS_TIMEOUT_SECS";

pub const REQUIRE_ELEVATED_CLAIM_ENV: &str = "AUTH_REQUIRE_ELEVATED_CLAIM";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default `RUST_LOG` filter.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_ACCESS_TOKEN_EXPIRES_IN: u64 = 900;
const DEFAULT_CUSTOM_CLAIMS_TIMEOUT: u64 = 10;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 4000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("problem parsing jwt secret: {0}")]
    Signing(#[from] SigningConfigError),

    #[error("problem creating custom claims: {0}")]
    Claims(#[from] ClaimsConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub custom_claims: Option<String>,
    pub custom_claims_defaults: Option<String>,
    pub graphql_url: Option<String>,
    pub admin_secret: Option<String>,
    pub custom_claims_timeout: Duration,
    pub elevated_policy: ElevatedPolicy,
    pub host: String,
    pub port: u16,
    pub tls: Option<TlsPaths>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let jwt_secret = var(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;

        let access_token_secs: u64 = parse_or(
            var(ACCESS_TOKEN_EXPIRES_IN_ENV),
            ACCESS_TOKEN_EXPIRES_IN_ENV,
            DEFAULT_ACCESS_TOKEN_EXPIRES_IN,
        )?;
        // `exp` is a signed unix timestamp.
        if i64::try_from(access_token_secs).is_err() {
            return Err(ConfigError::Invalid {
                name: ACCESS_TOKEN_EXPIRES_IN_ENV,
                reason: format!("{access_token_secs} seconds is out of range"),
            });
        }
        let access_token_ttl = Duration::from_secs(access_token_secs);
        let custom_claims_timeout = Duration::from_secs(parse_or(
            var(CUSTOM_CLAIMS_TIMEOUT_ENV),
            CUSTOM_CLAIMS_TIMEOUT_ENV,
            DEFAULT_CUSTOM_CLAIMS_TIMEOUT,
        )?);

        let elevated_policy = match var(REQUIRE_ELEVATED_CLAIM_ENV) {
            Some(raw) => raw.parse::<ElevatedPolicy>().map_err(|reason| ConfigError::Invalid {
                name: REQUIRE_ELEVATED_CLAIM_ENV,
                reason,
            })?,
            None => ElevatedPolicy::Disabled,
        };

        let tls = match (var(TLS_CERT_PATH_ENV), var(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    name: TLS_CERT_PATH_ENV,
                    reason: format!("{TLS_CERT_PATH_ENV} and {TLS_KEY_PATH_ENV} must be set together"),
                })
            }
        };

        Ok(Self {
            jwt_secret,
            access_token_ttl,
            custom_claims: var(CUSTOM_CLAIMS_ENV),
            custom_claims_defaults: var(CUSTOM_CLAIMS_DEFAULTS_ENV),
            graphql_url: var(GRAPHQL_URL_ENV),
            admin_secret: var(ADMIN_SECRET_ENV),
            custom_claims_timeout,
            elevated_policy,
            host: var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(var(PORT_ENV), PORT_ENV, DEFAULT_PORT)?,
            tls,
        })
    }

    /// Compile the custom claims configuration, if any.
    pub fn custom_claims(&self) -> Result<Option<Arc<dyn CustomClaimer>>, ConfigError> {
        let Some(raw) = &self.custom_claims else {
            return Ok(None);
        };
        let specs = parse_claim_specs(raw)?;
        if specs.is_empty() {
            return Ok(None);
        }

        let compiled = CompiledClaims::compile(&specs)?;
        let url = self
            .graphql_url
            .as_deref()
            .ok_or(ConfigError::Missing(GRAPHQL_URL_ENV))?;

        let mut fetcher = ClaimsFetcher::with_timeout(url, self.custom_claims_timeout)?;
        if let Some(secret) = &self.admin_secret {
            fetcher = fetcher.with_interceptor(AdminSecretInterceptor::new(secret.clone()));
        }

        let defaults = match &self.custom_claims_defaults {
            Some(raw) => parse_claim_defaults(raw)?,
            None => Default::default(),
        };

        info!(
            claims = compiled.len(),
            query = %compiled.graphql_query(),
            "Custom claims enabled"
        );

        Ok(Some(Arc::new(
            CustomClaims::new(compiled, fetcher).with_defaults(defaults),
        )))
    }

    /// Build the signing snapshot: signing config plus custom claims.
    pub fn jwt_snapshot(&self) -> Result<JwtSnapshot, ConfigError> {
        let signing = SigningConfig::from_json(&self.jwt_secret)?;
        let claimer = self.custom_claims()?;
        Ok(JwtSnapshot::new(signing, claimer, self.access_token_ttl))
    }
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
