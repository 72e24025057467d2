// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Elevated access gate.
//!
//! Sensitive operations require a token whose `x-hasura-auth-elevated`
//! claim equals its own subject, i.e. a token minted right after a
//! security key ceremony.
//!
//! | Policy | Passes when |
//! |--------|-------------|
//! | `Disabled` | always |
//! | `Recommended` | subject has no security keys, or token is elevated |
//! | `Strict` | token is elevated |
//!
//! Under `Strict`, the security key enrollment routes behave like
//! `Recommended` so that a first key can be registered.

use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use super::validator::ValidatedToken;
use crate::store::{SecurityKeyStore, StoreError};

/// Namespace key of the elevated claim.
pub const ELEVATED_CLAIM: &str = "x-hasura-auth-elevated";

/// Routes that register a first security key.
pub const ENROLLMENT_PATHS: [&str; 2] = ["/user/webauthn/add", "/user/webauthn/verify"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ElevatedPolicy {
    Disabled,
    Recommended,
    #[default]
    Strict,
}

impl FromStr for ElevatedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disabled" => Ok(ElevatedPolicy::Disabled),
            "recommended" => Ok(ElevatedPolicy::Recommended),
            "required" | "strict" => Ok(ElevatedPolicy::Strict),
            other => Err(format!(
                "invalid elevated claim policy '{other}' (expected disabled, recommended or required)"
            )),
        }
    }
}

impl std::fmt::Display for ElevatedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElevatedPolicy::Disabled => write!(f, "disabled"),
            ElevatedPolicy::Recommended => write!(f, "recommended"),
            ElevatedPolicy::Strict => write!(f, "required"),
        }
    }
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error("elevated claim required")]
    ElevatedClaimRequired,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ElevatedAccessGate {
    policy: ElevatedPolicy,
    store: Arc<dyn SecurityKeyStore>,
}

impl std::fmt::Debug for ElevatedAccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElevatedAccessGate")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ElevatedAccessGate {
    pub fn new(policy: ElevatedPolicy, store: Arc<dyn SecurityKeyStore>) -> Self {
        Self { policy, store }
    }

    pub fn policy(&self) -> ElevatedPolicy {
        self.policy
    }

    /// Decide whether `token` may perform an elevated operation.
    ///
    /// `request_path` enables the enrollment exemption under `Strict`.
    pub async fn check(
        &self,
        token: &ValidatedToken,
        request_path: Option<&str>,
    ) -> Result<(), GateError> {
        let enrolling = request_path.is_some_and(|path| ENROLLMENT_PATHS.contains(&path));

        match self.policy {
            ElevatedPolicy::Disabled => Ok(()),
            ElevatedPolicy::Strict if !enrolling => require_elevated(token),
            ElevatedPolicy::Recommended | ElevatedPolicy::Strict => {
                let keys = self
                    .store
                    .count_security_keys(token.subject())
                    .await
                    .map_err(|e| {
                        warn!(user_id = %token.subject(), error = %e, "Failed to count security keys");
                        e
                    })?;
                if keys == 0 {
                    debug!(user_id = %token.subject(), "No security keys; elevated claim not required");
                    return Ok(());
                }
                require_elevated(token)
            }
        }
    }
}

fn require_elevated(token: &ValidatedToken) -> Result<(), GateError> {
    if token.custom_claim(ELEVATED_CLAIM) == Some(token.subject()) {
        Ok(())
    } else {
        debug!(user_id = %token.subject(), "Elevated claim missing or for another subject");
        Err(GateError::ElevatedClaimRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::issuer::{IssueRequest, TokenIssuer};
    use crate::auth::signing::{test_keys::HS256_SECRET, SigningConfig};
    use crate::auth::validator::TokenValidator;
    use crate::store::InMemorySecurityKeyStore;
    use async_trait::async_trait;

    const USER_ID: &str = "585e21fc-3664-4d03-8539-69945342a4f4";
    const OTHER_ID: &str = "0d2b1f5e-7c7a-4c1b-9f55-b3d4e1a0a111";

    struct BrokenStore;

    #[async_trait]
    impl SecurityKeyStore for BrokenStore {
        async fn count_security_keys(&self, _user_id: &str) -> Result<u64, StoreError> {
            Err(StoreError::Unavailable("database is down".to_string()))
        }
    }

    async fn token(request: IssueRequest) -> ValidatedToken {
        let signing = Arc::new(SigningConfig::from_json(HS256_SECRET).unwrap());
        let issued = TokenIssuer::new(signing.clone()).issue(&request).await.unwrap();
        TokenValidator::new(signing).validate(&issued.access_token).unwrap()
    }

    async fn plain() -> ValidatedToken {
        token(IssueRequest::new(USER_ID, vec!["user".to_string()], "user")).await
    }

    async fn elevated() -> ValidatedToken {
        token(IssueRequest::new(USER_ID, vec!["user".to_string()], "user").elevated()).await
    }

    async fn elevated_for_other() -> ValidatedToken {
        token(
            IssueRequest::new(USER_ID, vec!["user".to_string()], "user")
                .with_extra_claim(ELEVATED_CLAIM, OTHER_ID),
        )
        .await
    }

    async fn store_with_keys(count: usize) -> Arc<InMemorySecurityKeyStore> {
        let store = Arc::new(InMemorySecurityKeyStore::new());
        for i in 0..count {
            store.add_security_key(USER_ID, format!("cred-{i}")).await;
        }
        store
    }

    #[test]
    fn parses_policy() {
        assert_eq!("disabled".parse::<ElevatedPolicy>(), Ok(ElevatedPolicy::Disabled));
        assert_eq!("Recommended".parse::<ElevatedPolicy>(), Ok(ElevatedPolicy::Recommended));
        assert_eq!("required".parse::<ElevatedPolicy>(), Ok(ElevatedPolicy::Strict));
        assert_eq!("strict".parse::<ElevatedPolicy>(), Ok(ElevatedPolicy::Strict));
        assert!("sometimes".parse::<ElevatedPolicy>().is_err());
        assert_eq!(ElevatedPolicy::default(), ElevatedPolicy::Strict);
    }

    #[tokio::test]
    async fn disabled_always_passes() {
        let gate = ElevatedAccessGate::new(ElevatedPolicy::Disabled, store_with_keys(2).await);
        assert!(gate.check(&plain().await, None).await.is_ok());
        assert!(gate.check(&elevated_for_other().await, None).await.is_ok());

        let gate = ElevatedAccessGate::new(ElevatedPolicy::Disabled, Arc::new(BrokenStore));
        assert!(gate.check(&plain().await, None).await.is_ok());
    }

    #[tokio::test]
    async fn recommended_passes_without_keys() {
        let gate = ElevatedAccessGate::new(ElevatedPolicy::Recommended, store_with_keys(0).await);
        assert!(gate.check(&plain().await, None).await.is_ok());
    }

    #[tokio::test]
    async fn recommended_requires_claim_with_keys() {
        let gate = ElevatedAccessGate::new(ElevatedPolicy::Recommended, store_with_keys(1).await);
        assert!(matches!(
            gate.check(&plain().await, None).await,
            Err(GateError::ElevatedClaimRequired)
        ));
        assert!(matches!(
            gate.check(&elevated_for_other().await, None).await,
            Err(GateError::ElevatedClaimRequired)
        ));
        assert!(gate.check(&elevated().await, None).await.is_ok());
    }

    #[tokio::test]
    async fn strict_always_requires_claim() {
        let gate = ElevatedAccessGate::new(ElevatedPolicy::default(), store_with_keys(0).await);
        assert!(matches!(
            gate.check(&plain().await, Some("/user/email/change")).await,
            Err(GateError::ElevatedClaimRequired)
        ));
        assert!(gate.check(&elevated().await, None).await.is_ok());
    }

    #[tokio::test]
    async fn strict_allows_first_key_enrollment() {
        let gate = ElevatedAccessGate::new(ElevatedPolicy::Strict, store_with_keys(0).await);
        assert!(gate.check(&plain().await, Some("/user/webauthn/add")).await.is_ok());
        assert!(gate.check(&plain().await, Some("/user/webauthn/verify")).await.is_ok());

        let gate = ElevatedAccessGate::new(ElevatedPolicy::Strict, store_with_keys(1).await);
        assert!(matches!(
            gate.check(&plain().await, Some("/user/webauthn/add")).await,
            Err(GateError::ElevatedClaimRequired)
        ));
    }

    #[tokio::test]
    async fn store_failure_is_reported() {
        let gate = ElevatedAccessGate::new(ElevatedPolicy::Recommended, Arc::new(BrokenStore));
        assert!(matches!(
            gate.check(&plain().await, None).await,
            Err(GateError::Store(_))
        ));
    }
}
