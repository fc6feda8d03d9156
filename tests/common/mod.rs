// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

#![allow(dead_code)]

use rust_decimal::Decimal;
use spendsync::error::{SyncError, SyncResult};
use spendsync::models::{Expense, Tracker};
use spendsync::remote::{
    ApiResponse, ExpenseRequest, RemoteClient, RemoteExpense, RemoteTracker, TrackerRequest,
    UpdatePayload, Verb,
};
use spendsync::store::Store;
use spendsync::sync::WorkScheduler;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// `Err` plays a network failure.
pub type Scripted<T> = Result<ApiResponse<T>, String>;

pub struct Queue<T>(Mutex<VecDeque<Scripted<T>>>);

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Queue(Mutex::new(VecDeque::new()))
    }
}

impl<T> Queue<T> {
    pub fn push(&self, r: Scripted<T>) {
        self.0.lock().unwrap().push_back(r);
    }

    // Nothing scripted means the server is unreachable.
    fn pop(&self) -> SyncResult<ApiResponse<T>> {
        match self.0.lock().unwrap().pop_front() {
            Some(Ok(r)) => Ok(r),
            Some(Err(m)) => Err(SyncError::Transport(m)),
            None => Err(SyncError::Transport("offline".into())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListTrackers,
    GetTracker(String),
    CreateTracker(TrackerRequest),
    UpdateTracker {
        id: String,
        verb: Verb,
        shape: &'static str,
        json: serde_json::Value,
    },
    ListExpenses(String),
    CreateExpense(ExpenseRequest),
    CreateExpenseUnderTracker(String, ExpenseRequest),
    DeleteExpense(String),
}

#[derive(Default)]
pub struct FakeRemote {
    pub list_trackers: Queue<Vec<RemoteTracker>>,
    pub get_tracker: Queue<RemoteTracker>,
    pub create_tracker: Queue<RemoteTracker>,
    pub update_tracker: Queue<RemoteTracker>,
    pub list_expenses: Mutex<HashMap<String, VecDeque<Scripted<Vec<RemoteExpense>>>>>,
    pub create_expense: Queue<RemoteExpense>,
    pub create_expense_under_tracker: Queue<RemoteExpense>,
    pub delete_expense: Queue<()>,
    calls: Mutex<Vec<Call>>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_expenses(&self, tracker_id: &str, r: Scripted<Vec<RemoteExpense>>) {
        self.list_expenses
            .lock()
            .unwrap()
            .entry(tracker_id.to_string())
            .or_default()
            .push_back(r);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RemoteClient for FakeRemote {
    fn list_trackers(&self) -> SyncResult<ApiResponse<Vec<RemoteTracker>>> {
        self.log(Call::ListTrackers);
        self.list_trackers.pop()
    }

    fn get_tracker(&self, id: &str) -> SyncResult<ApiResponse<RemoteTracker>> {
        self.log(Call::GetTracker(id.to_string()));
        self.get_tracker.pop()
    }

    fn create_tracker(&self, request: &TrackerRequest) -> SyncResult<ApiResponse<RemoteTracker>> {
        self.log(Call::CreateTracker(request.clone()));
        self.create_tracker.pop()
    }

    fn update_tracker(
        &self,
        id: &str,
        payload: &UpdatePayload,
        verb: Verb,
    ) -> SyncResult<ApiResponse<RemoteTracker>> {
        self.log(Call::UpdateTracker {
            id: id.to_string(),
            verb,
            shape: payload.shape(),
            json: payload.to_json().unwrap(),
        });
        self.update_tracker.pop()
    }

    fn list_expenses(&self, tracker_id: &str) -> SyncResult<ApiResponse<Vec<RemoteExpense>>> {
        self.log(Call::ListExpenses(tracker_id.to_string()));
        let next = self
            .list_expenses
            .lock()
            .unwrap()
            .get_mut(tracker_id)
            .and_then(|q| q.pop_front());
        match next {
            Some(Ok(r)) => Ok(r),
            Some(Err(m)) => Err(SyncError::Transport(m)),
            None => Err(SyncError::Transport("offline".into())),
        }
    }

    fn create_expense(&self, request: &ExpenseRequest) -> SyncResult<ApiResponse<RemoteExpense>> {
        self.log(Call::CreateExpense(request.clone()));
        self.create_expense.pop()
    }

    fn create_expense_under_tracker(
        &self,
        tracker_id: &str,
        request: &ExpenseRequest,
    ) -> SyncResult<ApiResponse<RemoteExpense>> {
        self.log(Call::CreateExpenseUnderTracker(
            tracker_id.to_string(),
            request.clone(),
        ));
        self.create_expense_under_tracker.pop()
    }

    fn delete_expense(&self, id: &str) -> SyncResult<ApiResponse<()>> {
        self.log(Call::DeleteExpense(id.to_string()));
        self.delete_expense.pop()
    }
}

#[derive(Default)]
pub struct RecordingScheduler {
    requests: AtomicUsize,
}

impl RecordingScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl WorkScheduler for RecordingScheduler {
    fn enqueue_unique(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn store() -> Arc<Store> {
    Arc::new(Store::open_in_memory().unwrap())
}

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

pub fn ok<T>(status: u16, body: T) -> Scripted<T> {
    Ok(ApiResponse::ok(status, Some(body)))
}

pub fn empty<T>(status: u16) -> Scripted<T> {
    Ok(ApiResponse::ok(status, None))
}

pub fn fail<T>(status: u16, body: &str) -> Scripted<T> {
    Ok(ApiResponse::error(status, body))
}

pub fn remote_tracker(id: &str, budget: &str, start: &str, end: &str) -> RemoteTracker {
    RemoteTracker {
        id: id.to_string(),
        name: format!("Tracker {}", id),
        description: Some(format!("Tracker {}", id)),
        start_date: start.to_string(),
        end_date: end.to_string(),
        budget: dec(budget),
        expenses: None,
    }
}

pub fn remote_expense(
    id: &str,
    description: &str,
    amount: &str,
    date: &str,
    tracker_id: &str,
) -> RemoteExpense {
    RemoteExpense {
        id: id.to_string(),
        description: description.to_string(),
        amount: dec(amount),
        date: date.to_string(),
        tracker_id: Some(tracker_id.to_string()),
        created_at: Some("2025-07-05T12:00:00Z".to_string()),
        updated_at: Some("2025-07-05T12:00:00Z".to_string()),
    }
}

pub fn local_expense(id: &str, description: &str, amount: &str, date: &str, tracker_id: &str) -> Expense {
    Expense {
        id: id.to_string(),
        description: description.to_string(),
        amount: dec(amount),
        date: date.to_string(),
        tracker_id: tracker_id.to_string(),
        created_at: "2025-07-05T09:00:00.000Z".to_string(),
        updated_at: "2025-07-05T09:00:00.000Z".to_string(),
        is_synced: false,
        is_deleted: false,
    }
}

pub fn tracker(id: &str, start: &str) -> Tracker {
    Tracker {
        id: id.to_string(),
        name: format!("Tracker {}", id),
        description: String::new(),
        budget: dec("500"),
        start_date: start.to_string(),
        end_date: "2025-12-31".to_string(),
        is_synced: true,
        is_deleted: false,
    }
}
