// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Security key lookups.
//!
//! The elevated-claim gate only needs to know how many security keys
//! (WebAuthn credentials) a user has registered. Production deployments
//! back this with the user database; the in-memory store is used for local
//! runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("security key lookup failed: {0}")]
    Unavailable(String),
}

/// Count of registered security keys per user.
#[async_trait]
pub trait SecurityKeyStore: Send + Sync {
    async fn count_security_keys(&self, user_id: &str) -> Result<u64, StoreError>;
}

#[derive(Default)]
pub struct InMemorySecurityKeyStore {
    keys: RwLock<HashMap<String, Vec<String>>>,
}

impl InMemorySecurityKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a credential for a user.
    pub async fn add_security_key(&self, user_id: &str, credential_id: impl Into<String>) {
        self.keys
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(credential_id.into());
    }
}

#[async_trait]
impl SecurityKeyStore for InMemorySecurityKeyStore {
    async fn count_security_keys(&self, user_id: &str) -> Result<u64, StoreError> {
        Ok(self
            .keys
            .read()
            .await
            .get(user_id)
            .map_or(0, |credentials| credentials.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_keys_per_user() {
        let store = InMemorySecurityKeyStore::new();
        assert_eq!(store.count_security_keys("u1").await.unwrap(), 0);

        store.add_security_key("u1", "cred-a").await;
        store.add_security_key("u1", "cred-b").await;
        store.add_security_key("u2", "cred-c").await;

        assert_eq!(store.count_security_keys("u1").await.unwrap(), 2);
        assert_eq!(store.count_security_keys("u2").await.unwrap(), 1);
    }
}
