// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Local database failure. Never retried at this layer.
    #[error("local storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// The request never produced an HTTP status (DNS, connect, timeout, reset).
    #[error("network error: {0}")]
    Transport(String),

    /// The server answered with a status the caller cannot accept.
    #[error("{}", remote_message(.context, .status, .body))]
    Remote {
        context: String,
        status: u16,
        body: String,
    },

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal lock poisoned: {0}")]
    Poisoned(String),
}

fn remote_message(context: &str, status: &u16, body: &str) -> String {
    if body.trim().is_empty() {
        format!("{}: {}", context, status)
    } else {
        format!("{}: {} - {}", context, status, body.trim())
    }
}

impl SyncError {
    pub fn remote(context: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        SyncError::Remote {
            context: context.into(),
            status,
            body: body.into(),
        }
    }

    /// Whether a background run should be retried after this error.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Transport(_) => true,
            SyncError::Remote { status, .. } => crate::sync::reconcile::classify_status(*status)
                == crate::sync::reconcile::StatusClass::RetryableFailure,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Transport(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for SyncError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        SyncError::Poisoned(e.to_string())
    }
}
