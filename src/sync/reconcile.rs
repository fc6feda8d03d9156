// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Reconciliation between the local store and a backend whose verbs and
//! field names vary per deployment.

use crate::error::{SyncError, SyncResult};
use crate::models::{Expense, ExpenseSignature, Tracker};
use crate::remote::{
    ApiResponse, ExpenseRequest, RemoteClient, RemoteExpense, RemoteTracker, TrackerRequest,
    UpdatePayload, Verb,
};
use crate::store::Store;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    /// Worth another try later: server trouble, throttling, expired credentials.
    RetryableFailure,
    /// The server understood and refused; retrying the same request will not help.
    PermanentFailure,
}

pub fn classify_status(code: u16) -> StatusClass {
    match code {
        200..=299 => StatusClass::Success,
        401 | 429 | 500..=599 => StatusClass::RetryableFailure,
        _ => StatusClass::PermanentFailure,
    }
}

/// The route or verb does not exist on this deployment.
pub fn route_unsupported(code: u16) -> bool {
    matches!(code, 404 | 405)
}

/// The route exists but did not like the payload shape.
pub fn payload_rejected(code: u16) -> bool {
    matches!(code, 400 | 422)
}

// ---------------------------------------------------------------------------
// Tracker update chain
// ---------------------------------------------------------------------------

fn send_with_verb_fallback(
    remote: &dyn RemoteClient,
    id: &str,
    payload: &UpdatePayload,
) -> SyncResult<ApiResponse<RemoteTracker>> {
    let patched = remote.update_tracker(id, payload, Verb::Patch)?;
    if !route_unsupported(patched.status) {
        return Ok(patched);
    }
    debug!(
        "PATCH {} tracker {} answered {}, retrying as PUT",
        payload.shape(),
        id,
        patched.status
    );
    remote.update_tracker(id, payload, Verb::Put)
}

/// Structured PATCH, then PUT on 404/405; if the structured shape ends in
/// 400/422 the whole verb sequence is repeated with the snake_case shape.
/// Returns the last response seen, successful or not.
pub fn update_tracker_chain(
    remote: &dyn RemoteClient,
    id: &str,
    request: &TrackerRequest,
) -> SyncResult<ApiResponse<RemoteTracker>> {
    let structured = UpdatePayload::structured(request);
    let response = send_with_verb_fallback(remote, id, &structured)?;
    if !payload_rejected(response.status) {
        return Ok(response);
    }
    info!(
        "Tracker {} rejected the structured payload ({}), switching to raw keys",
        id, response.status
    );
    let raw = UpdatePayload::raw_keyed(request)?;
    send_with_verb_fallback(remote, id, &raw)
}

/// Turns the final response of a tracker write into the value to cache.
///
/// A non-2xx becomes [`SyncError::Remote`] carrying status and body. A 2xx
/// without a body is filled in by re-fetching `id`, and failing that by
/// synthesizing the tracker from `request`.
pub fn resolve_tracker_write(
    remote: &dyn RemoteClient,
    id: &str,
    request: &TrackerRequest,
    response: ApiResponse<RemoteTracker>,
    context: &str,
) -> SyncResult<Tracker> {
    if !response.is_success() {
        return Err(SyncError::remote(context, response.status, response.error_body));
    }
    if let Some(body) = response.body {
        return Ok(body.into_tracker());
    }
    match remote.get_tracker(id) {
        Ok(ApiResponse {
            status,
            body: Some(body),
            ..
        }) if (200..300).contains(&status) => return Ok(body.into_tracker()),
        Ok(fetched) => debug!("Re-fetch of tracker {} answered {}", id, fetched.status),
        Err(e) => debug!("Re-fetch of tracker {} failed: {}", id, e),
    }
    info!("Tracker {} confirmed without a body, caching submitted fields", id);
    Ok(request.synthesize(id))
}

// ---------------------------------------------------------------------------
// Expense create chain
// ---------------------------------------------------------------------------

/// Generic create endpoint first, the tracker-scoped one if that route is missing.
pub fn create_expense_chain(
    remote: &dyn RemoteClient,
    request: &ExpenseRequest,
) -> SyncResult<ApiResponse<RemoteExpense>> {
    let response = remote.create_expense(request)?;
    if !route_unsupported(response.status) {
        return Ok(response);
    }
    debug!(
        "POST expenses answered {}, falling back to trackers/{}/expenses",
        response.status, request.tracker_id
    );
    remote.create_expense_under_tracker(&request.tracker_id, request)
}

/// The local row after the server accepted it: server id and timestamps if
/// it sent any, otherwise the local values, and always synced.
pub fn confirmed_expense(local: &Expense, server: Option<&RemoteExpense>) -> Expense {
    let mut confirmed = local.clone();
    confirmed.is_synced = true;
    if let Some(server) = server {
        confirmed.id = server.id.clone();
        if let Some(created) = server.created_at.as_ref().filter(|s| !s.is_empty()) {
            confirmed.created_at = created.clone();
        }
        if let Some(updated) = server.updated_at.as_ref().filter(|s| !s.is_empty()) {
            confirmed.updated_at = updated.clone();
        }
    }
    confirmed
}

/// Records a successful create. An id swap drops the client-id row and writes
/// the server-id row in one transaction.
pub fn apply_create_success(
    store: &Store,
    local: &Expense,
    server: Option<&RemoteExpense>,
) -> SyncResult<Expense> {
    let confirmed = confirmed_expense(local, server);
    if confirmed.id != local.id {
        debug!("Expense {} is {} on the server", local.id, confirmed.id);
    }
    store.expenses().replace(&local.id, &confirmed)?;
    Ok(confirmed)
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergePlan {
    /// Local ids that duplicate a server row under another id.
    pub prune: Vec<String>,
    /// Pending deletes moved from a stale client id onto the server's id.
    pub retarget: Vec<(String, Expense)>,
    pub upserts: Vec<Expense>,
    /// Server rows held back because the user deleted them locally.
    pub held_back: usize,
}

/// Plans a merge of one tracker's server list into its local rows.
///
/// A local row whose id the server does not know but whose signature it
/// does is the same record under a stale client id and gets pruned. Local
/// rows with an unknown signature are unsynced creations and survive.
///
/// Server rows pending local deletion are not written back. That holds for
/// a match by id, and for a match by signature against a pending delete
/// still under its client id; the latter is retargeted so the queued DELETE
/// goes to the id the server knows. Each pending delete absorbs at most one
/// server row.
pub fn plan_merge(local: &[Expense], server: Vec<Expense>, pending_deletes: &[Expense]) -> MergePlan {
    let server_ids: HashSet<String> = server.iter().map(|e| e.id.clone()).collect();
    let known_ids: HashSet<&str> = local
        .iter()
        .chain(pending_deletes)
        .map(|e| e.id.as_str())
        .collect();
    let deleted_ids: HashSet<&str> = pending_deletes.iter().map(|e| e.id.as_str()).collect();

    let mut stale_deletes: HashMap<ExpenseSignature, Vec<&Expense>> = HashMap::new();
    for d in pending_deletes
        .iter()
        .rev()
        .filter(|d| !server_ids.contains(d.id.as_str()))
    {
        stale_deletes.entry(d.signature()).or_default().push(d);
    }

    let mut plan = MergePlan::default();
    for row in server {
        if deleted_ids.contains(row.id.as_str()) {
            plan.held_back += 1;
            continue;
        }
        if !known_ids.contains(row.id.as_str()) {
            if let Some(stale) = stale_deletes
                .get_mut(&row.signature())
                .and_then(|v| v.pop())
            {
                let mut moved = stale.clone();
                moved.id = row.id;
                plan.retarget.push((stale.id.clone(), moved));
                plan.held_back += 1;
                continue;
            }
        }
        plan.upserts.push(row);
    }

    let upserted: HashSet<ExpenseSignature> = plan.upserts.iter().map(Expense::signature).collect();
    plan.prune = local
        .iter()
        .filter(|l| !server_ids.contains(l.id.as_str()))
        .filter(|l| upserted.contains(&l.signature()))
        .map(|l| l.id.clone())
        .collect();
    plan
}

/// Applies a fetched server list for `tracker_id`, prune before upsert.
pub fn merge_server_expenses(
    store: &Store,
    tracker_id: &str,
    server: Vec<RemoteExpense>,
) -> SyncResult<MergePlan> {
    let server: Vec<Expense> = server
        .into_iter()
        .map(|e| e.into_expense(tracker_id))
        .collect();
    let local = store.expenses().list_once(tracker_id)?;
    let pending_deletes = store.expenses().pending_deletes(tracker_id)?;

    let plan = plan_merge(&local, server, &pending_deletes);
    if !plan.prune.is_empty() {
        info!(
            "Tracker {}: dropping {} local duplicate(s) of synced expenses",
            tracker_id,
            plan.prune.len()
        );
    }
    for (old_id, moved) in &plan.retarget {
        info!(
            "Tracker {}: pending delete {} now targets server id {}",
            tracker_id, old_id, moved.id
        );
    }
    if plan.held_back > 0 {
        warn!(
            "Tracker {}: {} server expense(s) still pending local deletion",
            tracker_id, plan.held_back
        );
    }
    store
        .expenses()
        .apply_merge(&plan.prune, &plan.retarget, &plan.upserts)?;
    Ok(plan)
}
