// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

mod common;

use common::{
    dec, empty, fail, local_expense, ok, remote_expense, remote_tracker, store, Call, FakeRemote,
    RecordingScheduler,
};
use spendsync::error::SyncError;
use spendsync::remote::Verb;
use spendsync::sync::{ExpenseDraft, ExpenseRepository, TrackerDraft};
use std::sync::Arc;

fn repo() -> (ExpenseRepository, Arc<FakeRemote>, Arc<RecordingScheduler>) {
    let remote = FakeRemote::new();
    let scheduler = RecordingScheduler::new();
    let repo = ExpenseRepository::new(store(), remote.clone(), scheduler.clone());
    (repo, remote, scheduler)
}

fn rent() -> ExpenseDraft {
    ExpenseDraft {
        description: "Rent".into(),
        amount: dec("300"),
        date: "2025-07-05".into(),
        tracker_id: "t1".into(),
    }
}

fn july() -> TrackerDraft {
    TrackerDraft {
        name: "July".into(),
        description: None,
        budget: dec("1500"),
        start_date: "2025-07-01".into(),
        end_date: "2025-07-31".into(),
    }
}

#[test]
fn add_expense_offline_stays_pending_and_schedules() {
    let (repo, _remote, scheduler) = repo();
    let stored = repo.add_expense(rent()).unwrap();

    assert!(!stored.is_synced);
    assert_eq!(scheduler.requests(), 1);
    let visible = repo.get_expenses("t1").unwrap().current().unwrap();
    assert_eq!(visible, vec![stored]);
}

#[test]
fn add_expense_adopts_server_id() {
    let (repo, remote, scheduler) = repo();
    remote
        .create_expense
        .push(ok(201, remote_expense("srv-1", "Rent", "300", "2025-07-05", "t1")));

    let stored = repo.add_expense(rent()).unwrap();

    assert_eq!(stored.id, "srv-1");
    assert!(stored.is_synced);
    assert_eq!(scheduler.requests(), 0);
    let ids: Vec<String> = repo
        .store()
        .expenses()
        .list_once("t1")
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec!["srv-1"]);

    // The client id travels with the create.
    match &remote.calls()[0] {
        Call::CreateExpense(req) => assert!(req.id.is_some()),
        other => panic!("unexpected call {:?}", other),
    }
}

#[test]
fn add_expense_empty_success_keeps_client_id() {
    let (repo, remote, _) = repo();
    remote.create_expense.push(empty(204));
    let stored = repo.add_expense(rent()).unwrap();
    assert!(stored.is_synced);
    assert_eq!(repo.store().expenses().get(&stored.id).unwrap(), Some(stored));
}

#[test]
fn add_expense_falls_back_to_tracker_route() {
    let (repo, remote, _) = repo();
    remote.create_expense.push(fail(404, "Not Found"));
    remote
        .create_expense_under_tracker
        .push(ok(200, remote_expense("srv-7", "Rent", "300", "2025-07-05", "t1")));

    let stored = repo.add_expense(rent()).unwrap();

    assert_eq!(stored.id, "srv-7");
    assert!(matches!(
        &remote.calls()[1],
        Call::CreateExpenseUnderTracker(tracker, _) if tracker == "t1"
    ));
}

#[test]
fn add_expense_rejection_is_left_for_the_worker() {
    let (repo, remote, scheduler) = repo();
    remote.create_expense.push(fail(500, "boom"));
    let stored = repo.add_expense(rent()).unwrap();
    assert!(stored.is_pending_create());
    assert_eq!(scheduler.requests(), 1);
}

#[test]
fn delete_expense_hides_row_and_schedules() {
    let (repo, _remote, scheduler) = repo();
    let mut synced = local_expense("srv-1", "Rent", "300", "2025-07-05", "t1");
    synced.is_synced = true;
    repo.store().expenses().upsert(&synced).unwrap();

    assert!(repo.delete_expense("srv-1").unwrap());
    assert!(repo.get_expenses("t1").unwrap().current().unwrap().is_empty());
    assert_eq!(scheduler.requests(), 1);

    assert!(!repo.delete_expense("nope").unwrap());
    assert_eq!(scheduler.requests(), 2);
}

#[test]
fn create_tracker_caches_server_answer() {
    let (repo, remote, _) = repo();
    remote
        .create_tracker
        .push(ok(201, remote_tracker("42", "1500", "2025-07-01", "2025-07-31")));

    let tracker = repo.create_tracker(july()).unwrap();

    assert_eq!(tracker.id, "42");
    assert!(tracker.is_synced);
    assert_eq!(repo.current_tracker().unwrap().unwrap().id, "42");
    match &remote.calls()[0] {
        Call::CreateTracker(req) => {
            assert!(req.id.is_some());
            assert_eq!(req.description, "July");
        }
        other => panic!("unexpected call {:?}", other),
    }
}

#[test]
fn create_tracker_without_body_uses_client_id() {
    let (repo, remote, _) = repo();
    remote.create_tracker.push(empty(201));
    remote.get_tracker.push(fail(404, ""));

    let tracker = repo.create_tracker(july()).unwrap();

    let sent = match &remote.calls()[0] {
        Call::CreateTracker(req) => req.id.clone().unwrap(),
        other => panic!("unexpected call {:?}", other),
    };
    assert_eq!(tracker.id, sent);
    assert_eq!(tracker.name, "July");
    assert!(repo.store().trackers().get(&sent).unwrap().is_some());
}

#[test]
fn create_tracker_refusal_is_reported() {
    let (repo, remote, _) = repo();
    remote.create_tracker.push(fail(422, "budget must be positive"));
    let err = repo.create_tracker(july()).unwrap_err();
    assert!(matches!(err, SyncError::Remote { status: 422, .. }));
    assert!(err.to_string().contains("budget must be positive"));
    assert!(repo.store().trackers().list_once().unwrap().is_empty());
}

#[test]
fn update_tracker_put_fallback_then_synthesize() {
    let (repo, remote, _) = repo();
    remote.update_tracker.push(fail(405, "Method Not Allowed"));
    remote.update_tracker.push(empty(204));
    // Re-fetch fails too; the submitted fields are cached as confirmed.
    remote.get_tracker.push(Err("connection reset".into()));

    let tracker = repo.update_tracker("T1", july()).unwrap();

    assert_eq!(tracker.id, "T1");
    assert_eq!(tracker.budget, dec("1500"));
    assert!(tracker.is_synced);
    assert_eq!(repo.store().trackers().get("T1").unwrap(), Some(tracker));

    let verbs: Vec<(Verb, &'static str)> = remote
        .calls()
        .iter()
        .filter_map(|c| match c {
            Call::UpdateTracker { verb, shape, .. } => Some((*verb, *shape)),
            _ => None,
        })
        .collect();
    assert_eq!(
        verbs,
        vec![(Verb::Patch, "structured"), (Verb::Put, "structured")]
    );
}

#[test]
fn update_tracker_prefers_refetched_body() {
    let (repo, remote, _) = repo();
    remote.update_tracker.push(empty(200));
    let mut server = remote_tracker("T1", "1600", "2025-07-01", "2025-07-31");
    server.name = "July (server)".into();
    remote.get_tracker.push(ok(200, server));

    let tracker = repo.update_tracker("T1", july()).unwrap();
    assert_eq!(tracker.name, "July (server)");
    assert_eq!(tracker.budget, dec("1600"));
}

#[test]
fn update_tracker_switches_to_raw_keys_on_bad_payload() {
    let (repo, remote, _) = repo();
    remote.update_tracker.push(fail(422, "unknown field startDate"));
    remote
        .update_tracker
        .push(ok(200, remote_tracker("T1", "1500", "2025-07-01", "2025-07-31")));

    repo.update_tracker("T1", july()).unwrap();

    let updates: Vec<Call> = remote
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::UpdateTracker { .. }))
        .collect();
    assert_eq!(updates.len(), 2);
    match &updates[1] {
        Call::UpdateTracker {
            verb, shape, json, ..
        } => {
            assert_eq!(*verb, Verb::Patch);
            assert_eq!(*shape, "raw-keyed");
            assert_eq!(json["start_date"], "2025-07-01");
            assert!(json.get("startDate").is_none());
        }
        _ => unreachable!(),
    }
}

#[test]
fn update_tracker_final_failure_carries_status_and_body() {
    let (repo, remote, _) = repo();
    remote.update_tracker.push(fail(404, "no such route"));
    remote.update_tracker.push(fail(403, "forbidden"));

    let err = repo.update_tracker("T1", july()).unwrap_err();

    assert_eq!(err.to_string(), "Failed to update tracker: 403 - forbidden");
    assert!(repo.store().trackers().get("T1").unwrap().is_none());
}

#[test]
fn refresh_trackers_replaces_cache() {
    let (repo, remote, _) = repo();
    repo.store()
        .trackers()
        .upsert(&common::tracker("gone", "2024-01-01"))
        .unwrap();
    remote.list_trackers.push(ok(
        200,
        vec![
            remote_tracker("a", "100", "2025-06-01", "2025-06-30"),
            remote_tracker("b", "200", "2025-07-01", "2025-07-31"),
        ],
    ));

    let trackers = repo.refresh_trackers().unwrap();

    assert_eq!(trackers.len(), 2);
    let cached = repo.get_trackers().unwrap().current().unwrap();
    let ids: Vec<&str> = cached.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
}

#[test]
fn sync_all_skips_failing_tracker() {
    let (repo, remote, _) = repo();
    remote.list_trackers.push(ok(
        200,
        vec![
            remote_tracker("a", "100", "2025-06-01", "2025-06-30"),
            remote_tracker("b", "200", "2025-07-01", "2025-07-31"),
        ],
    ));
    remote.script_expenses("a", fail(500, "db down"));
    remote.script_expenses(
        "b",
        ok(200, vec![remote_expense("srv-1", "Rent", "300", "2025-07-05", "b")]),
    );
    repo.store()
        .expenses()
        .upsert(&local_expense("local-1", "Rent", "300", "2025-07-05", "b"))
        .unwrap();

    let summary = repo.sync_all_from_backend().unwrap();

    assert_eq!(summary.trackers, 2);
    assert_eq!(summary.refreshed, 1);
    assert_eq!(summary.pruned_duplicates, 1);
    assert_eq!(summary.failures.len(), 1);
    assert!(summary.failures[0].starts_with("a:"));
    let ids: Vec<String> = repo
        .store()
        .expenses()
        .list_once("b")
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec!["srv-1"]);
}

#[test]
fn sync_all_fails_when_tracker_list_fails() {
    let (repo, remote, _) = repo();
    remote.list_trackers.push(fail(503, ""));
    let err = repo.sync_all_from_backend().unwrap_err();
    assert!(err.is_transient());
}

#[test]
fn trigger_requests_background_work() {
    let (repo, _, scheduler) = repo();
    repo.trigger_expense_sync();
    repo.trigger_expense_sync();
    assert_eq!(scheduler.requests(), 2);
}
