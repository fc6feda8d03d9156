// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{SyncError, SyncResult};
use crate::store::Store;
use crate::sync::scheduler::SchedulerPolicy;
use std::time::Duration;

pub const API_BASE_URL_KEY: &str = "api_base_url";
pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const MAX_REJECTIONS_KEY: &str = "max_rejections";
pub const BACKOFF_INITIAL_KEY: &str = "backoff_initial_secs";
pub const BACKOFF_MAX_KEY: &str = "backoff_max_secs";
pub const MAX_ATTEMPTS_KEY: &str = "max_attempts";

pub const API_URL_ENV: &str = "SPENDSYNC_API_URL";
pub const TOKEN_ENV: &str = "SPENDSYNC_TOKEN";

pub const DEFAULT_API_BASE_URL: &str = "https://expense-fastapi.vercel.app/";

pub const KEYS: &[&str] = &[
    API_BASE_URL_KEY,
    ACCESS_TOKEN_KEY,
    MAX_REJECTIONS_KEY,
    BACKOFF_INITIAL_KEY,
    BACKOFF_MAX_KEY,
    MAX_ATTEMPTS_KEY,
];

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub api_base_url: String,
    pub access_token: Option<String>,
    /// Permanent 4xx rejections tolerated before a pending row is quarantined.
    pub max_rejections: u32,
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
    /// Worker invocations per scheduled run before giving up until the next trigger.
    pub max_attempts: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            access_token: None,
            max_rejections: 5,
            backoff_initial: Duration::from_secs(30),
            backoff_max: Duration::from_secs(5 * 60 * 60),
            max_attempts: 10,
        }
    }
}

impl SyncConfig {
    /// Stored settings over defaults, environment over both.
    pub fn load(store: &Store) -> SyncResult<Self> {
        let mut cfg = Self::default();
        for (key, value) in store.all_settings()? {
            cfg.apply(&key, &value)?;
        }
        if let Ok(url) = std::env::var(API_URL_ENV) {
            cfg.apply(API_BASE_URL_KEY, &url)?;
        }
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            cfg.apply(ACCESS_TOKEN_KEY, &token)?;
        }
        Ok(cfg)
    }

    fn apply(&mut self, key: &str, value: &str) -> SyncResult<()> {
        let value = value.trim();
        match key {
            API_BASE_URL_KEY => self.api_base_url = value.to_string(),
            ACCESS_TOKEN_KEY => {
                self.access_token = Some(value.to_string()).filter(|t| !t.is_empty())
            }
            MAX_REJECTIONS_KEY => self.max_rejections = parse_u32(key, value)?,
            BACKOFF_INITIAL_KEY => {
                self.backoff_initial = Duration::from_secs(parse_u32(key, value)? as u64)
            }
            BACKOFF_MAX_KEY => self.backoff_max = Duration::from_secs(parse_u32(key, value)? as u64),
            MAX_ATTEMPTS_KEY => self.max_attempts = parse_u32(key, value)?.max(1),
            // Unknown keys belong to someone else.
            _ => {}
        }
        Ok(())
    }

    pub fn policy(&self) -> SchedulerPolicy {
        SchedulerPolicy {
            backoff_initial: self.backoff_initial,
            backoff_max: self.backoff_max,
            max_attempts: self.max_attempts,
            ..SchedulerPolicy::default()
        }
    }
}

/// Validates and persists one setting.
pub fn set(store: &Store, key: &str, value: &str) -> SyncResult<()> {
    if !KEYS.contains(&key) {
        return Err(SyncError::Config(format!(
            "unknown setting '{}', expected one of: {}",
            key,
            KEYS.join(", ")
        )));
    }
    SyncConfig::default().apply(key, value)?;
    store.set_setting(key, value.trim())
}

fn parse_u32(key: &str, value: &str) -> SyncResult<u32> {
    value
        .parse::<u32>()
        .map_err(|_| SyncError::Config(format!("'{}' must be a whole number, got '{}'", key, value)))
}
