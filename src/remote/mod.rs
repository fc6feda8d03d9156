// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Remote API boundary.
//!
//! Every call returns the HTTP status alongside an optional decoded body.
//! `Err` is reserved for requests that never got a status back.

mod auth;
mod http;

pub use auth::{SettingsToken, StaticToken, TokenProvider};
pub use http::HttpRemote;

use crate::error::{SyncError, SyncResult};
use crate::models::{Expense, Tracker};
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub body: Option<T>,
    /// Raw response text for non-2xx answers, empty otherwise.
    pub error_body: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(status: u16, body: Option<T>) -> Self {
        Self {
            status,
            body,
            error_body: String::new(),
        }
    }

    pub fn error(status: u16, error_body: impl Into<String>) -> Self {
        Self {
            status,
            body: None,
            error_body: error_body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body of a 2xx answer; anything else becomes [`SyncError::Remote`].
    pub fn into_body(self, context: &str) -> SyncResult<T> {
        if !self.is_success() {
            return Err(SyncError::remote(context, self.status, self.error_body));
        }
        self.body
            .ok_or_else(|| SyncError::remote(context, self.status, "empty response body"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Patch,
    Put,
}

/// Tracker as the server describes it. Older deployments say `uuid_id` and
/// camelCase dates, newer ones `id` and snake_case. When both ids are sent,
/// `uuid_id` names the tracker in every route.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "WireTracker")]
pub struct RemoteTracker {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub budget: Decimal,
    pub expenses: Option<Vec<RemoteExpense>>,
}

#[derive(Deserialize)]
struct WireTracker {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    uuid_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "startDate", alias = "start_date")]
    start_date: String,
    #[serde(rename = "endDate", alias = "end_date")]
    end_date: String,
    budget: Decimal,
    #[serde(default)]
    expenses: Option<Vec<RemoteExpense>>,
}

impl TryFrom<WireTracker> for RemoteTracker {
    type Error = String;

    fn try_from(w: WireTracker) -> Result<Self, Self::Error> {
        let id = w
            .uuid_id
            .or(w.id)
            .ok_or_else(|| format!("tracker '{}' has neither uuid_id nor id", w.name))?;
        Ok(Self {
            id,
            name: w.name,
            description: w.description,
            start_date: w.start_date,
            end_date: w.end_date,
            budget: w.budget,
            expenses: w.expenses,
        })
    }
}

impl RemoteTracker {
    pub fn into_tracker(self) -> Tracker {
        Tracker {
            description: self.description.unwrap_or_default(),
            id: self.id,
            name: self.name,
            budget: self.budget,
            start_date: self.start_date,
            end_date: self.end_date,
            is_synced: true,
            is_deleted: false,
        }
    }
}

/// Expense as the server describes it. `id` wins over `uuid_id`; the owner is
/// read from `tracker_uuid_id` first, then `trackerId`/`tracker_id`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "WireExpense")]
pub struct RemoteExpense {
    pub id: String,
    pub description: String,
    pub amount: Decimal,
    pub date: String,
    pub tracker_id: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Deserialize)]
struct WireExpense {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    uuid_id: Option<String>,
    #[serde(default)]
    description: String,
    amount: Decimal,
    date: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    tracker_uuid_id: Option<String>,
    #[serde(
        rename = "trackerId",
        alias = "tracker_id",
        default,
        deserialize_with = "opt_string_or_number"
    )]
    tracker_id: Option<String>,
    #[serde(rename = "createdAt", alias = "created_at", default)]
    created_at: Option<String>,
    #[serde(rename = "updatedAt", alias = "updated_at", default)]
    updated_at: Option<String>,
}

impl TryFrom<WireExpense> for RemoteExpense {
    type Error = String;

    fn try_from(w: WireExpense) -> Result<Self, Self::Error> {
        let id = w
            .id
            .or(w.uuid_id)
            .ok_or_else(|| format!("expense '{}' on {} has no id", w.description, w.date))?;
        Ok(Self {
            id,
            description: w.description,
            amount: w.amount,
            date: w.date,
            tracker_id: w.tracker_uuid_id.or(w.tracker_id),
            created_at: w.created_at,
            updated_at: w.updated_at,
        })
    }
}

impl RemoteExpense {
    /// Server rows are synced by definition. A row listed under
    /// `trackers/{id}/expenses` belongs to that tracker whatever owner key it
    /// carries; some deployments send the tracker's numeric row id there.
    pub fn into_expense(self, tracker_id: &str) -> Expense {
        if let Some(owner) = self.tracker_id.as_deref().filter(|o| *o != tracker_id) {
            debug!(
                "Expense {} reports owner {}, filing it under {}",
                self.id, owner, tracker_id
            );
        }
        Expense {
            id: self.id,
            description: self.description,
            amount: self.amount,
            date: self.date,
            tracker_id: tracker_id.to_string(),
            created_at: self.created_at.unwrap_or_default(),
            updated_at: self.updated_at.unwrap_or_default(),
            is_synced: true,
            is_deleted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub budget: Decimal,
}

impl TrackerRequest {
    /// Local stand-in used when a confirmed write came back without a body.
    pub fn synthesize(&self, id: &str) -> Tracker {
        Tracker {
            id: id.to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            budget: self.budget,
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            is_synced: true,
            is_deleted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct SnakeCaseTracker<'a> {
    name: &'a str,
    description: &'a str,
    start_date: &'a str,
    end_date: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    budget: Decimal,
}

/// The two request shapes a tracker update can take.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdatePayload {
    Structured(TrackerRequest),
    RawKeyed(serde_json::Map<String, serde_json::Value>),
}

impl UpdatePayload {
    pub fn structured(request: &TrackerRequest) -> Self {
        UpdatePayload::Structured(request.clone())
    }

    /// snake_case key/value rendition of the same fields.
    pub fn raw_keyed(request: &TrackerRequest) -> SyncResult<Self> {
        let snake = SnakeCaseTracker {
            name: &request.name,
            description: &request.description,
            start_date: &request.start_date,
            end_date: &request.end_date,
            budget: request.budget,
        };
        match serde_json::to_value(snake)? {
            serde_json::Value::Object(map) => Ok(UpdatePayload::RawKeyed(map)),
            other => Err(SyncError::Config(format!(
                "tracker payload did not serialize to an object: {}",
                other
            ))),
        }
    }

    pub fn to_json(&self) -> SyncResult<serde_json::Value> {
        Ok(match self {
            UpdatePayload::Structured(req) => serde_json::to_value(req)?,
            UpdatePayload::RawKeyed(map) => serde_json::Value::Object(map.clone()),
        })
    }

    pub fn shape(&self) -> &'static str {
        match self {
            UpdatePayload::Structured(_) => "structured",
            UpdatePayload::RawKeyed(_) => "raw-keyed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub date: String,
    pub tracker_id: String,
}

impl From<&Expense> for ExpenseRequest {
    fn from(e: &Expense) -> Self {
        Self {
            id: Some(e.id.clone()),
            description: e.description.clone(),
            amount: e.amount,
            date: e.date.clone(),
            tracker_id: e.tracker_id.clone(),
        }
    }
}

/// Create/read/update/delete over the backend, whatever its verbs and field names.
pub trait RemoteClient: Send + Sync {
    fn list_trackers(&self) -> SyncResult<ApiResponse<Vec<RemoteTracker>>>;

    fn get_tracker(&self, id: &str) -> SyncResult<ApiResponse<RemoteTracker>>;

    fn create_tracker(&self, request: &TrackerRequest) -> SyncResult<ApiResponse<RemoteTracker>>;

    fn update_tracker(
        &self,
        id: &str,
        payload: &UpdatePayload,
        verb: Verb,
    ) -> SyncResult<ApiResponse<RemoteTracker>>;

    fn list_expenses(&self, tracker_id: &str) -> SyncResult<ApiResponse<Vec<RemoteExpense>>>;

    fn create_expense(&self, request: &ExpenseRequest) -> SyncResult<ApiResponse<RemoteExpense>>;

    fn create_expense_under_tracker(
        &self,
        tracker_id: &str,
        request: &ExpenseRequest,
    ) -> SyncResult<ApiResponse<RemoteExpense>>;

    fn delete_expense(&self, id: &str) -> SyncResult<ApiResponse<()>>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Num(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(v: StringOrNumber) -> Self {
        match v {
            StringOrNumber::Str(s) => s,
            StringOrNumber::Num(n) => n.to_string(),
        }
    }
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Option::<StringOrNumber>::deserialize(d).map(|v| v.map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_accepts_both_field_conventions() {
        let legacy: RemoteTracker = serde_json::from_str(
            r#"{"uuid_id":"t-1","name":"July","description":"July","startDate":"2025-07-03","endDate":"2025-08-31","budget":500,"expenses":[]}"#,
        )
        .unwrap();
        let modern: RemoteTracker = serde_json::from_str(
            r#"{"id":"t-1","name":"July","description":null,"start_date":"2025-07-03","end_date":"2025-08-31","budget":"500"}"#,
        )
        .unwrap();
        assert_eq!(legacy.id, modern.id);
        assert_eq!(legacy.start_date, modern.start_date);
        assert_eq!(legacy.budget, modern.budget);
        assert_eq!(modern.into_tracker().description, "");
    }

    #[test]
    fn expense_ids_may_be_numeric() {
        let e: RemoteExpense = serde_json::from_str(
            r#"{"id":42,"description":"Rent","amount":300.5,"date":"2025-07-05","trackerId":7}"#,
        )
        .unwrap();
        assert_eq!(e.id, "42");
        assert_eq!(e.tracker_id.as_deref(), Some("7"));
        let local = e.into_expense("t-uuid");
        assert_eq!(local.tracker_id, "t-uuid");
        assert!(local.is_synced);
    }

    #[test]
    fn both_ids_present_prefers_route_id() {
        let t: RemoteTracker = serde_json::from_str(
            r#"{"id":3,"uuid_id":"t-uuid","name":"July","startDate":"2025-07-03","endDate":"2025-08-31","budget":500}"#,
        )
        .unwrap();
        assert_eq!(t.id, "t-uuid");

        let e: RemoteExpense = serde_json::from_str(
            r#"{"id":9,"uuid_id":"e-uuid","amount":1,"date":"2025-07-05","tracker_id":3,"tracker_uuid_id":"t-uuid"}"#,
        )
        .unwrap();
        assert_eq!(e.id, "9");
        assert_eq!(e.tracker_id.as_deref(), Some("t-uuid"));
    }

    #[test]
    fn tracker_without_any_id_is_rejected() {
        let r: Result<RemoteTracker, _> = serde_json::from_str(
            r#"{"name":"July","startDate":"2025-07-03","endDate":"2025-08-31","budget":500}"#,
        );
        assert!(r.is_err());
    }

    #[test]
    fn raw_keyed_payload_uses_snake_case() {
        let req = TrackerRequest {
            id: None,
            name: "July".into(),
            description: "July".into(),
            start_date: "2025-07-03".into(),
            end_date: "2025-08-31".into(),
            budget: Decimal::new(500, 0),
        };
        let structured = UpdatePayload::structured(&req).to_json().unwrap();
        assert_eq!(structured["startDate"], "2025-07-03");
        assert!(structured.get("id").is_none());

        let raw = UpdatePayload::raw_keyed(&req).unwrap().to_json().unwrap();
        assert_eq!(raw["start_date"], "2025-07-03");
        assert_eq!(raw["end_date"], "2025-08-31");
        assert_eq!(raw["budget"], 500.0);
        assert!(raw.get("startDate").is_none());
    }

    #[test]
    fn into_body_reports_status_and_detail() {
        let resp: ApiResponse<RemoteTracker> = ApiResponse::error(422, "bad budget");
        let err = resp.into_body("Failed to update tracker").unwrap_err();
        assert_eq!(err.to_string(), "Failed to update tracker: 422 - bad budget");
    }
}
