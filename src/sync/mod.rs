// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod reconcile;
pub mod repository;
pub mod scheduler;
pub mod worker;

pub use repository::{ExpenseDraft, ExpenseRepository, SyncSummary, TrackerDraft};
pub use scheduler::{
    AlwaysOnline, Connectivity, HttpProbe, SchedulerPolicy, SyncJob, ThreadScheduler,
    WorkOutcome, WorkScheduler,
};
pub use worker::{SyncWorker, WorkReport};
