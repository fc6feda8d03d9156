// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{
    ApiResponse, ExpenseRequest, RemoteClient, RemoteExpense, RemoteTracker, TokenProvider,
    TrackerRequest, UpdatePayload, Verb,
};
use crate::error::{SyncError, SyncResult};
use crate::utils::http_client;
use log::{debug, warn};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::sync::Arc;

pub struct HttpRemote {
    client: Client,
    base: Url,
    token: Arc<dyn TokenProvider>,
}

impl HttpRemote {
    pub fn new(base_url: &str, token: Arc<dyn TokenProvider>) -> SyncResult<Self> {
        let client = http_client().map_err(|e| SyncError::Config(e.to_string()))?;
        Self::with_client(client, base_url, token)
    }

    pub fn with_client(
        client: Client,
        base_url: &str,
        token: Arc<dyn TokenProvider>,
    ) -> SyncResult<Self> {
        // Url::join drops the last path segment unless the base ends with '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base = Url::parse(&normalized)
            .map_err(|e| SyncError::Config(format!("invalid API base URL '{}': {}", base_url, e)))?;
        Ok(Self {
            client,
            base,
            token,
        })
    }

    /// Appends `segments` to the base path, percent-encoding each one so an
    /// id can never add a path level, a query or a fragment.
    fn url(&self, segments: &[&str]) -> SyncResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::Config(format!("API base URL '{}' cannot take a path", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, rb: RequestBuilder) -> RequestBuilder {
        match self.token.access_token() {
            Some(token) => rb.bearer_auth(token),
            None => rb,
        }
    }

    fn send_json<T: DeserializeOwned>(&self, rb: RequestBuilder) -> SyncResult<ApiResponse<T>> {
        let resp = self.authorized(rb).send()?;
        let status = resp.status().as_u16();
        let url = resp.url().clone();
        let text = resp.text()?;
        debug!("{} -> {}", url, status);
        if !(200..300).contains(&status) {
            return Ok(ApiResponse::error(status, text));
        }
        if text.trim().is_empty() {
            return Ok(ApiResponse::ok(status, None));
        }
        // A confirmed write with an unreadable body still counts as confirmed.
        match serde_json::from_str::<T>(&text) {
            Ok(body) => Ok(ApiResponse::ok(status, Some(body))),
            Err(e) => {
                warn!("Undecodable {} body from {}: {}", status, url, e);
                Ok(ApiResponse::ok(status, None))
            }
        }
    }

    fn send_empty(&self, rb: RequestBuilder) -> SyncResult<ApiResponse<()>> {
        let resp = self.authorized(rb).send()?;
        let status = resp.status().as_u16();
        let text = resp.text()?;
        if (200..300).contains(&status) {
            Ok(ApiResponse::ok(status, Some(())))
        } else {
            Ok(ApiResponse::error(status, text))
        }
    }
}

impl RemoteClient for HttpRemote {
    fn list_trackers(&self) -> SyncResult<ApiResponse<Vec<RemoteTracker>>> {
        self.send_json(self.client.get(self.url(&["trackers"])?))
    }

    fn get_tracker(&self, id: &str) -> SyncResult<ApiResponse<RemoteTracker>> {
        self.send_json(self.client.get(self.url(&["trackers", id])?))
    }

    fn create_tracker(&self, request: &TrackerRequest) -> SyncResult<ApiResponse<RemoteTracker>> {
        self.send_json(self.client.post(self.url(&["trackers"])?).json(request))
    }

    fn update_tracker(
        &self,
        id: &str,
        payload: &UpdatePayload,
        verb: Verb,
    ) -> SyncResult<ApiResponse<RemoteTracker>> {
        let url = self.url(&["trackers", id])?;
        let rb = match verb {
            Verb::Patch => self.client.patch(url),
            Verb::Put => self.client.put(url),
        };
        self.send_json(rb.json(&payload.to_json()?))
    }

    fn list_expenses(&self, tracker_id: &str) -> SyncResult<ApiResponse<Vec<RemoteExpense>>> {
        self.send_json(self.client.get(self.url(&["trackers", tracker_id, "expenses"])?))
    }

    fn create_expense(&self, request: &ExpenseRequest) -> SyncResult<ApiResponse<RemoteExpense>> {
        self.send_json(self.client.post(self.url(&["expenses"])?).json(request))
    }

    fn create_expense_under_tracker(
        &self,
        tracker_id: &str,
        request: &ExpenseRequest,
    ) -> SyncResult<ApiResponse<RemoteExpense>> {
        self.send_json(
            self.client
                .post(self.url(&["trackers", tracker_id, "expenses"])?)
                .json(request),
        )
    }

    fn delete_expense(&self, id: &str) -> SyncResult<ApiResponse<()>> {
        self.send_empty(self.client.delete(self.url(&["expenses", id])?))
    }
}
