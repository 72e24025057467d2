// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Auth Token Service - Hasura-compatible access tokens
//!
//! Issues signed access tokens whose claims namespace is enriched with
//! custom claims fetched from a GraphQL endpoint, and validates presented
//! tokens for downstream services.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Signing, issuance, validation and the elevated access gate
//! - `claims` - Custom claim paths, query synthesis, extraction and encoding
//! - `config` - Environment configuration
//! - `store` - Security key lookups for the elevated access gate

pub mod api;
pub mod auth;
pub mod claims;
pub mod config;
pub mod error;
pub mod state;
pub mod store;
