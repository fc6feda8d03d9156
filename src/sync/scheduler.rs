// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Unique, network-constrained background work with exponential backoff.

use crate::error::SyncResult;
use crate::utils::http_client_with_timeout;
use log::{debug, error, info, warn};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOutcome {
    Success,
    Retry,
}

/// One invocation of background work.
pub trait SyncJob: Send + Sync {
    fn run_once(&self) -> SyncResult<WorkOutcome>;
}

/// "Enqueue unique work, keep existing": a request while a run is queued or
/// executing is a no-op.
pub trait WorkScheduler: Send + Sync {
    fn enqueue_unique(&self);
}

pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// Online means the API host answered anything at all.
pub struct HttpProbe {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client_with_timeout(timeout)?,
            url: url.to_string(),
        })
    }
}

impl Connectivity for HttpProbe {
    fn is_online(&self) -> bool {
        match self.client.head(&self.url).send() {
            Ok(_) => true,
            Err(e) => {
                debug!("Connectivity probe to {} failed: {}", self.url, e);
                false
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerPolicy {
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
    /// Invocations per run, the first one included.
    pub max_attempts: u32,
    /// How often to re-check connectivity while waiting for the network.
    pub offline_poll: Duration,
}

impl Default for SchedulerPolicy {
    fn default() -> Self {
        Self {
            backoff_initial: Duration::from_secs(30),
            backoff_max: Duration::from_secs(5 * 60 * 60),
            max_attempts: 10,
            offline_poll: Duration::from_secs(15),
        }
    }
}

/// Delay before the retry following failed attempt number `attempt` (1-based).
pub fn backoff_delay(policy: &SchedulerPolicy, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(31);
    policy
        .backoff_initial
        .saturating_mul(1u32 << exp)
        .min(policy.backoff_max)
}

#[derive(Default)]
struct State {
    active: bool,
    shutdown: bool,
    runs: u64,
    handle: Option<JoinHandle<()>>,
}

struct Inner {
    job: Arc<dyn SyncJob>,
    connectivity: Arc<dyn Connectivity>,
    policy: SchedulerPolicy,
    state: Mutex<State>,
    wake: Condvar,
}

impl Inner {
    // The state only holds flags, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Sleeps up to `delay`; false if shutdown was requested meanwhile.
    fn sleep(&self, delay: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .wake
            .wait_timeout_while(guard, delay, |s| !s.shutdown)
            .unwrap_or_else(|p| p.into_inner());
        !guard.shutdown
    }

    fn stopping(&self) -> bool {
        self.lock().shutdown
    }

    fn wait_for_network(&self) -> bool {
        loop {
            if self.stopping() {
                return false;
            }
            if self.connectivity.is_online() {
                return true;
            }
            debug!("Offline, background sync waiting for network");
            if !self.sleep(self.policy.offline_poll) {
                return false;
            }
        }
    }

    fn drive(&self) {
        let mut attempt = 0u32;
        loop {
            if !self.wait_for_network() {
                debug!("Background sync cancelled");
                break;
            }
            attempt += 1;
            match self.job.run_once() {
                Ok(WorkOutcome::Success) => {
                    debug!("Background sync finished after {} attempt(s)", attempt);
                    break;
                }
                Ok(WorkOutcome::Retry) if attempt >= self.policy.max_attempts => {
                    warn!(
                        "Background sync giving up after {} attempts; pending rows wait for the next trigger",
                        attempt
                    );
                    break;
                }
                Ok(WorkOutcome::Retry) => {
                    let delay = backoff_delay(&self.policy, attempt);
                    info!("Background sync will retry in {:?}", delay);
                    if !self.sleep(delay) {
                        break;
                    }
                }
                Err(e) => {
                    error!("Background sync aborted: {}", e);
                    break;
                }
            }
        }
        let mut state = self.lock();
        state.active = false;
        self.wake.notify_all();
    }
}

/// Runs each scheduled drain on its own thread.
pub struct ThreadScheduler {
    inner: Arc<Inner>,
}

impl ThreadScheduler {
    pub fn new(
        job: Arc<dyn SyncJob>,
        connectivity: Arc<dyn Connectivity>,
        policy: SchedulerPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                job,
                connectivity,
                policy,
                state: Mutex::new(State::default()),
                wake: Condvar::new(),
            }),
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.lock().active
    }

    /// Runs started so far; collapsed requests do not count.
    pub fn runs_started(&self) -> u64 {
        self.inner.lock().runs
    }

    /// Blocks until no run is active or `timeout` passes. True if idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let guard = self.inner.lock();
        let (guard, _) = self
            .inner
            .wake
            .wait_timeout_while(guard, timeout, |s| s.active)
            .unwrap_or_else(|p| p.into_inner());
        !guard.active
    }

    /// Cancels waits and backoff sleeps, then joins the current run. An
    /// invocation already talking to the server finishes first.
    pub fn shutdown(&self) {
        let handle = {
            let mut state = self.inner.lock();
            state.shutdown = true;
            self.inner.wake.notify_all();
            state.handle.take()
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("Background sync thread panicked");
            }
        }
    }
}

impl WorkScheduler for ThreadScheduler {
    fn enqueue_unique(&self) {
        let mut state = self.inner.lock();
        if state.shutdown {
            debug!("Scheduler shut down, ignoring sync request");
            return;
        }
        if state.active {
            debug!("Sync already queued or running, keeping existing");
            return;
        }
        state.active = true;
        state.runs += 1;
        // The previous run is finished (active was false); reap it.
        if let Some(old) = state.handle.take() {
            drop(state);
            let _ = old.join();
            state = self.inner.lock();
        }
        let inner = Arc::clone(&self.inner);
        state.handle = Some(thread::spawn(move || inner.drive()));
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
