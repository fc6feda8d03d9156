// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::reconcile::{apply_create_success, classify_status, create_expense_chain, StatusClass};
use super::scheduler::{SyncJob, WorkOutcome};
use crate::error::SyncResult;
use crate::models::Expense;
use crate::remote::{ExpenseRequest, RemoteClient};
use crate::store::Store;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Synced,
    Retry,
    Rejected,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkReport {
    pub created: usize,
    pub deleted: usize,
    pub rejected: usize,
    pub transient: usize,
    pub quarantined: usize,
}

impl WorkReport {
    pub fn outcome(&self) -> WorkOutcome {
        if self.transient > 0 {
            WorkOutcome::Retry
        } else {
            WorkOutcome::Success
        }
    }
}

/// Drains every pending create and delete once.
pub struct SyncWorker {
    store: Arc<Store>,
    remote: Arc<dyn RemoteClient>,
    max_rejections: u32,
}

impl SyncWorker {
    pub fn new(store: Arc<Store>, remote: Arc<dyn RemoteClient>, max_rejections: u32) -> Self {
        Self {
            store,
            remote,
            max_rejections,
        }
    }

    /// One pass over the pending rows. Local storage errors abort the pass;
    /// remote trouble is tallied per row.
    pub fn run(&self) -> SyncResult<WorkReport> {
        let quarantined: HashSet<String> = self
            .store
            .expenses()
            .quarantined(self.max_rejections)?
            .into_iter()
            .map(|q| q.expense.id)
            .collect();
        let (deletions, creations): (Vec<Expense>, Vec<Expense>) = self
            .store
            .expenses()
            .list_unsynced()?
            .into_iter()
            .filter(|e| !quarantined.contains(&e.id))
            .partition(|e| e.is_deleted);

        let mut report = WorkReport {
            quarantined: quarantined.len(),
            ..WorkReport::default()
        };
        if !quarantined.is_empty() {
            debug!("Skipping {} quarantined expense(s)", quarantined.len());
        }

        for expense in &creations {
            match self.push_create(expense)? {
                ItemOutcome::Synced => report.created += 1,
                ItemOutcome::Retry => report.transient += 1,
                ItemOutcome::Rejected => report.rejected += 1,
            }
        }
        for expense in &deletions {
            match self.push_delete(expense)? {
                ItemOutcome::Synced => report.deleted += 1,
                ItemOutcome::Retry => report.transient += 1,
                ItemOutcome::Rejected => report.rejected += 1,
            }
        }

        info!(
            "Sync pass: {} created, {} deleted, {} rejected, {} to retry",
            report.created, report.deleted, report.rejected, report.transient
        );
        Ok(report)
    }

    fn push_create(&self, expense: &Expense) -> SyncResult<ItemOutcome> {
        let request = ExpenseRequest::from(expense);
        let response = match create_expense_chain(self.remote.as_ref(), &request) {
            Ok(response) => response,
            Err(e) => {
                warn!("Create sync exception for {}: {}", expense.id, e);
                return Ok(ItemOutcome::Retry);
            }
        };
        if response.is_success() {
            apply_create_success(&self.store, expense, response.body.as_ref())?;
            return Ok(ItemOutcome::Synced);
        }
        warn!(
            "Create sync failed for {}. code={}",
            expense.id, response.status
        );
        self.failure(expense, response.status, &response.error_body)
    }

    fn push_delete(&self, expense: &Expense) -> SyncResult<ItemOutcome> {
        let response = match self.remote.delete_expense(&expense.id) {
            Ok(response) => response,
            Err(e) => {
                warn!("Delete sync exception for {}: {}", expense.id, e);
                return Ok(ItemOutcome::Retry);
            }
        };
        // Already gone counts as confirmation.
        if response.is_success() || response.status == 404 {
            self.store.expenses().delete_permanently(&expense.id)?;
            return Ok(ItemOutcome::Synced);
        }
        warn!(
            "Delete sync failed for {}. code={}",
            expense.id, response.status
        );
        self.failure(expense, response.status, &response.error_body)
    }

    fn failure(&self, expense: &Expense, status: u16, body: &str) -> SyncResult<ItemOutcome> {
        match classify_status(status) {
            StatusClass::RetryableFailure => Ok(ItemOutcome::Retry),
            // 2xx never reaches here; treat it like any other refusal if it does.
            StatusClass::PermanentFailure | StatusClass::Success => {
                let detail = if body.trim().is_empty() {
                    status.to_string()
                } else {
                    format!("{} - {}", status, body.trim())
                };
                let attempts = self.store.expenses().record_rejection(&expense.id, &detail)?;
                if attempts >= self.max_rejections {
                    warn!(
                        "Expense {} quarantined after {} rejections (last: {})",
                        expense.id, attempts, detail
                    );
                }
                Ok(ItemOutcome::Rejected)
            }
        }
    }
}

impl SyncJob for SyncWorker {
    fn run_once(&self) -> SyncResult<WorkOutcome> {
        Ok(self.run()?.outcome())
    }
}
