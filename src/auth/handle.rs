// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Swappable signing snapshot.
//!
//! Issuer and validator are built together from one signing config and
//! published as a single snapshot. A request loads the snapshot once and
//! keeps it for its whole lifetime, so a reload never produces a mix of
//! old and new configuration.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tracing::info;

use super::issuer::TokenIssuer;
use super::signing::SigningConfig;
use super::validator::TokenValidator;
use crate::claims::CustomClaimer;

#[derive(Debug)]
pub struct JwtSnapshot {
    pub issuer: TokenIssuer,
    pub validator: TokenValidator,
}

impl JwtSnapshot {
    pub fn new(
        signing: SigningConfig,
        claimer: Option<Arc<dyn CustomClaimer>>,
        access_token_ttl: Duration,
    ) -> Self {
        let signing = Arc::new(signing);
        let mut issuer = TokenIssuer::new(signing.clone()).with_access_token_ttl(access_token_ttl);
        if let Some(claimer) = claimer {
            issuer = issuer.with_custom_claims(claimer);
        }
        Self {
            issuer,
            validator: TokenValidator::new(signing),
        }
    }

    pub fn signing(&self) -> &SigningConfig {
        self.issuer.signing()
    }
}

pub struct JwtHandle {
    current: ArcSwap<JwtSnapshot>,
}

impl JwtHandle {
    pub fn new(snapshot: JwtSnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    /// The snapshot to use for one request.
    pub fn load(&self) -> Arc<JwtSnapshot> {
        self.current.load_full()
    }

    /// Publish a new snapshot. In-flight requests keep the old one.
    pub fn reload(&self, snapshot: JwtSnapshot) {
        info!(
            algorithm = ?snapshot.signing().algorithm(),
            issuer = %snapshot.signing().issuer(),
            "Reloaded JWT configuration"
        );
        self.current.store(Arc::new(snapshot));
    }
}

impl std::fmt::Debug for JwtHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtHandle")
            .field("current", &self.current.load())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::error::TokenError;
    use crate::auth::issuer::IssueRequest;
    use crate::auth::signing::test_keys::HS256_SECRET;
    use jsonwebtoken::Algorithm;

    fn snapshot(signing: SigningConfig) -> JwtSnapshot {
        JwtSnapshot::new(signing, None, Duration::from_secs(900))
    }

    fn request() -> IssueRequest {
        IssueRequest::new("user-1", vec!["user".to_string()], "user")
    }

    #[tokio::test]
    async fn reload_swaps_whole_snapshot() {
        let handle = JwtHandle::new(snapshot(SigningConfig::from_json(HS256_SECRET).unwrap()));

        let before = handle.load();
        let old_token = before.issuer.issue(&request()).await.unwrap().access_token;

        handle.reload(snapshot(
            SigningConfig::hmac(Algorithm::HS256, b"rotated-secret").with_issuer("rotated"),
        ));
        let after = handle.load();

        // The snapshot held across the reload is unchanged.
        assert!(before.validator.validate(&old_token).is_ok());
        assert_eq!(before.signing().issuer(), "hasura-auth");

        assert_eq!(after.signing().issuer(), "rotated");
        assert_eq!(
            after.validator.validate(&old_token).unwrap_err(),
            TokenError::InvalidSignature
        );
        let new_token = after.issuer.issue(&request()).await.unwrap().access_token;
        assert!(after.validator.validate(&new_token).is_ok());
    }
}
