// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::ACCESS_TOKEN_KEY;
use crate::store::Store;
use log::warn;
use std::sync::Arc;

/// Opaque source of the bearer token. How it got there is not our concern.
pub trait TokenProvider: Send + Sync {
    fn access_token(&self) -> Option<String>;
}

pub struct StaticToken(pub Option<String>);

impl TokenProvider for StaticToken {
    fn access_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Reads the token from the settings table on every request so a fresh
/// login is picked up without rebuilding the client.
pub struct SettingsToken {
    store: Arc<Store>,
}

impl SettingsToken {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

impl TokenProvider for SettingsToken {
    fn access_token(&self) -> Option<String> {
        match self.store.get_setting(ACCESS_TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!("Could not read access token: {}", e);
                None
            }
        }
    }
}
