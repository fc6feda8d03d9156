// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A budgeting period. Dates are ISO-8601 calendar dates kept as text so they
/// compare exactly with what the server sends back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracker {
    pub id: String,
    pub name: String,
    pub description: String,
    pub budget: Decimal,
    pub start_date: String,
    pub end_date: String,
    pub is_synced: bool,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount: Decimal,
    pub date: String,
    pub tracker_id: String,
    pub created_at: String,
    pub updated_at: String,
    pub is_synced: bool,
    pub is_deleted: bool,
}

/// Content fingerprint used to recognise one logical expense stored under two ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpenseSignature {
    pub tracker_id: String,
    pub date: String,
    pub amount: Decimal,
    pub description: String,
}

impl Expense {
    /// Amounts are normalized so `300` and `300.00` fingerprint the same.
    pub fn signature(&self) -> ExpenseSignature {
        ExpenseSignature {
            tracker_id: self.tracker_id.clone(),
            date: self.date.clone(),
            amount: self.amount.normalize(),
            description: self.description.clone(),
        }
    }

    pub fn is_pending_create(&self) -> bool {
        !self.is_synced && !self.is_deleted
    }

    pub fn is_pending_delete(&self) -> bool {
        !self.is_synced && self.is_deleted
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub pending_creates: usize,
    pub pending_deletes: usize,
    pub quarantined: usize,
}

impl SyncStatus {
    pub fn is_clean(&self) -> bool {
        self.pending_creates == 0 && self.pending_deletes == 0
    }
}
