// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{ElevatedAccessGate, JwtHandle};

#[derive(Clone, Debug)]
pub struct AppState {
    pub jwt: Arc<JwtHandle>,
    pub gate: Arc<ElevatedAccessGate>,
}

impl AppState {
    pub fn new(jwt: JwtHandle, gate: ElevatedAccessGate) -> Self {
        Self {
            jwt: Arc::new(jwt),
            gate: Arc::new(gate),
        }
    }
}
