// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::reconcile::{
    apply_create_success, create_expense_chain, merge_server_expenses, resolve_tracker_write,
    update_tracker_chain, MergePlan,
};
use super::scheduler::WorkScheduler;
use crate::error::{SyncError, SyncResult};
use crate::models::{Expense, Tracker};
use crate::remote::{ExpenseRequest, RemoteClient, TrackerRequest};
use crate::store::{LiveQuery, Store};
use crate::utils::{new_client_id, now_timestamp};
use log::{info, warn};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

/// Fields the user submits for a tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerDraft {
    pub name: String,
    /// Defaults to the name.
    pub description: Option<String>,
    pub budget: Decimal,
    pub start_date: String,
    pub end_date: String,
}

impl TrackerDraft {
    fn into_request(self, id: Option<String>) -> TrackerRequest {
        TrackerRequest {
            id,
            description: self.description.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            start_date: self.start_date,
            end_date: self.end_date,
            budget: self.budget,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseDraft {
    pub description: String,
    pub amount: Decimal,
    pub date: String,
    pub tracker_id: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncSummary {
    pub trackers: usize,
    pub refreshed: usize,
    pub pruned_duplicates: usize,
    pub failures: Vec<String>,
}

/// Local-first façade over the store, the remote API and the background worker.
pub struct ExpenseRepository {
    store: Arc<Store>,
    remote: Arc<dyn RemoteClient>,
    scheduler: Arc<dyn WorkScheduler>,
}

impl ExpenseRepository {
    pub fn new(
        store: Arc<Store>,
        remote: Arc<dyn RemoteClient>,
        scheduler: Arc<dyn WorkScheduler>,
    ) -> Self {
        Self {
            store,
            remote,
            scheduler,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn get_trackers(&self) -> SyncResult<LiveQuery<Vec<Tracker>>> {
        self.store.watch_trackers()
    }

    /// Recomputed from the store on every call.
    pub fn current_tracker(&self) -> SyncResult<Option<Tracker>> {
        self.store.trackers().latest()
    }

    pub fn get_expenses(&self, tracker_id: &str) -> SyncResult<LiveQuery<Vec<Expense>>> {
        self.store.watch_expenses(tracker_id)
    }

    /// Server list replaces the local one wholesale.
    pub fn refresh_trackers(&self) -> SyncResult<Vec<Tracker>> {
        let trackers: Vec<Tracker> = self
            .remote
            .list_trackers()?
            .into_body("Failed to list trackers")?
            .into_iter()
            .map(|t| t.into_tracker())
            .collect();
        self.store.trackers().replace_all(&trackers)?;
        info!("Refreshed {} tracker(s) from server", trackers.len());
        Ok(trackers)
    }

    pub fn refresh_expenses(&self, tracker_id: &str) -> SyncResult<MergePlan> {
        let server = self
            .remote
            .list_expenses(tracker_id)?
            .into_body("Failed to list expenses")?;
        merge_server_expenses(&self.store, tracker_id, server)
    }

    /// Trackers first, then each tracker's expenses. A tracker whose expenses
    /// fail to load is logged and skipped.
    pub fn sync_all_from_backend(&self) -> SyncResult<SyncSummary> {
        let trackers = self.refresh_trackers()?;
        let mut summary = SyncSummary {
            trackers: trackers.len(),
            ..SyncSummary::default()
        };
        for tracker in &trackers {
            match self.refresh_expenses(&tracker.id) {
                Ok(plan) => {
                    summary.refreshed += 1;
                    summary.pruned_duplicates += plan.prune.len();
                }
                Err(e @ SyncError::Storage(_)) | Err(e @ SyncError::Poisoned(_)) => return Err(e),
                Err(e) => {
                    warn!("Could not sync expenses for tracker {}: {}", tracker.id, e);
                    summary.failures.push(format!("{}: {}", tracker.id, e));
                }
            }
        }
        Ok(summary)
    }

    /// Creates a tracker under a client-chosen id. The user is waiting on
    /// this one, so a refusal is returned rather than deferred.
    pub fn create_tracker(&self, draft: TrackerDraft) -> SyncResult<Tracker> {
        let id = new_client_id();
        let request = draft.into_request(Some(id.clone()));
        let response = self.remote.create_tracker(&request)?;
        // The server may assign its own id; only a body can tell us which.
        let tracker = resolve_tracker_write(
            self.remote.as_ref(),
            &id,
            &request,
            response,
            "Failed to create tracker",
        )?;
        self.store.trackers().upsert(&tracker)?;
        info!("Created tracker {} ({})", tracker.name, tracker.id);
        Ok(tracker)
    }

    pub fn update_tracker(&self, tracker_id: &str, draft: TrackerDraft) -> SyncResult<Tracker> {
        let request = draft.into_request(None);
        let response = update_tracker_chain(self.remote.as_ref(), tracker_id, &request)?;
        let tracker = resolve_tracker_write(
            self.remote.as_ref(),
            tracker_id,
            &request,
            response,
            "Failed to update tracker",
        )?;
        self.store.trackers().upsert(&tracker)?;
        Ok(tracker)
    }

    /// Writes locally, then tries the server once. Returns the row as stored
    /// afterwards: synced (maybe under a server id) or still pending.
    pub fn add_expense(&self, draft: ExpenseDraft) -> SyncResult<Expense> {
        let now = now_timestamp();
        let expense = Expense {
            id: new_client_id(),
            description: draft.description,
            amount: draft.amount,
            date: draft.date,
            tracker_id: draft.tracker_id,
            created_at: now.clone(),
            updated_at: now,
            is_synced: false,
            is_deleted: false,
        };
        self.store.expenses().upsert(&expense)?;

        match self.try_sync_expense(&expense)? {
            Some(synced) => Ok(synced),
            None => {
                self.scheduler.enqueue_unique();
                Ok(expense)
            }
        }
    }

    // Ok(None) means "left pending"; only local storage failures are errors.
    fn try_sync_expense(&self, expense: &Expense) -> SyncResult<Option<Expense>> {
        let request = ExpenseRequest::from(expense);
        match create_expense_chain(self.remote.as_ref(), &request) {
            Ok(response) if response.is_success() => {
                let synced = apply_create_success(&self.store, expense, response.body.as_ref())?;
                Ok(Some(synced))
            }
            Ok(response) => {
                warn!(
                    "Immediate sync failed for {}. code={}",
                    expense.id, response.status
                );
                Ok(None)
            }
            Err(e) => {
                warn!("Immediate sync exception for {}: {}", expense.id, e);
                Ok(None)
            }
        }
    }

    /// Soft delete plus a worker run. Returns whether a row was marked.
    pub fn delete_expense(&self, expense_id: &str) -> SyncResult<bool> {
        let marked = self.store.expenses().mark_deleted(expense_id)?;
        if !marked {
            warn!("Delete requested for unknown expense {}", expense_id);
        }
        self.scheduler.enqueue_unique();
        Ok(marked)
    }

    pub fn trigger_expense_sync(&self) {
        self.scheduler.enqueue_unique();
    }
}
