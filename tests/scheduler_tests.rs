// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use spendsync::error::{SyncError, SyncResult};
use spendsync::sync::{
    AlwaysOnline, Connectivity, SchedulerPolicy, SyncJob, ThreadScheduler, WorkOutcome,
    WorkScheduler,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct ScriptedJob {
    invocations: AtomicUsize,
    outcomes: Mutex<VecDeque<SyncResult<WorkOutcome>>>,
    gate: Option<Mutex<Receiver<()>>>,
}

impl ScriptedJob {
    fn with(outcomes: Vec<SyncResult<WorkOutcome>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            ..Self::default()
        })
    }

    /// Each invocation blocks until the returned sender releases it.
    fn gated() -> (Arc<Self>, Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let job = Self {
            gate: Some(Mutex::new(rx)),
            ..Self::default()
        };
        (Arc::new(job), tx)
    }

    fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl SyncJob for ScriptedJob {
    fn run_once(&self) -> SyncResult<WorkOutcome> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _ = gate.lock().unwrap().recv_timeout(WAIT);
        }
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(WorkOutcome::Success))
    }
}

struct Switch(AtomicBool);

impl Connectivity for Switch {
    fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn fast_policy(max_attempts: u32) -> SchedulerPolicy {
    SchedulerPolicy {
        backoff_initial: Duration::from_millis(1),
        backoff_max: Duration::from_millis(4),
        max_attempts,
        offline_poll: Duration::from_millis(5),
    }
}

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

#[test]
fn requests_while_running_keep_the_existing_run() {
    let (job, release) = ScriptedJob::gated();
    let scheduler = ThreadScheduler::new(job.clone(), Arc::new(AlwaysOnline), fast_policy(3));

    scheduler.enqueue_unique();
    assert!(wait_until(|| job.invocations() == 1));
    for _ in 0..5 {
        scheduler.enqueue_unique();
    }
    assert_eq!(scheduler.runs_started(), 1);

    release.send(()).unwrap();
    assert!(scheduler.wait_idle(WAIT));
    assert_eq!(job.invocations(), 1);

    // Once idle, a new request starts a new run.
    scheduler.enqueue_unique();
    release.send(()).unwrap();
    assert!(scheduler.wait_idle(WAIT));
    assert_eq!(scheduler.runs_started(), 2);
    assert_eq!(job.invocations(), 2);
}

#[test]
fn retries_with_backoff_until_success() {
    let job = ScriptedJob::with(vec![
        Ok(WorkOutcome::Retry),
        Ok(WorkOutcome::Retry),
        Ok(WorkOutcome::Success),
    ]);
    let scheduler = ThreadScheduler::new(job.clone(), Arc::new(AlwaysOnline), fast_policy(10));

    scheduler.enqueue_unique();
    assert!(scheduler.wait_idle(WAIT));
    assert_eq!(job.invocations(), 3);
}

#[test]
fn gives_up_after_max_attempts() {
    let job = ScriptedJob::with((0..10).map(|_| Ok(WorkOutcome::Retry)).collect());
    let scheduler = ThreadScheduler::new(job.clone(), Arc::new(AlwaysOnline), fast_policy(3));

    scheduler.enqueue_unique();
    assert!(scheduler.wait_idle(WAIT));
    assert_eq!(job.invocations(), 3);
    assert!(!scheduler.is_active());
}

#[test]
fn job_error_ends_the_run() {
    let job = ScriptedJob::with(vec![Err(SyncError::Config("broken".into()))]);
    let scheduler = ThreadScheduler::new(job.clone(), Arc::new(AlwaysOnline), fast_policy(5));

    scheduler.enqueue_unique();
    assert!(scheduler.wait_idle(WAIT));
    assert_eq!(job.invocations(), 1);
}

#[test]
fn waits_for_network_before_running() {
    let job = ScriptedJob::with(vec![]);
    let network = Arc::new(Switch(AtomicBool::new(false)));
    let scheduler = ThreadScheduler::new(job.clone(), network.clone(), fast_policy(3));

    scheduler.enqueue_unique();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(job.invocations(), 0);
    assert!(scheduler.is_active());

    network.0.store(true, Ordering::SeqCst);
    assert!(scheduler.wait_idle(WAIT));
    assert_eq!(job.invocations(), 1);
}

#[test]
fn shutdown_cancels_waiting_run_and_ignores_new_requests() {
    let job = ScriptedJob::with(vec![]);
    let scheduler = ThreadScheduler::new(
        job.clone(),
        Arc::new(Switch(AtomicBool::new(false))),
        fast_policy(3),
    );

    scheduler.enqueue_unique();
    scheduler.shutdown();
    assert!(!scheduler.is_active());

    scheduler.enqueue_unique();
    assert_eq!(scheduler.runs_started(), 1);
    assert_eq!(job.invocations(), 0);
}
