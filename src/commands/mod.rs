// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod doctor;
pub mod expenses;
pub mod settings;
pub mod sync;
pub mod trackers;

use crate::config::{SyncConfig, TOKEN_ENV};
use crate::models::SyncStatus;
use crate::remote::{HttpRemote, RemoteClient, SettingsToken, StaticToken, TokenProvider};
use crate::store::Store;
use crate::sync::{
    Connectivity, ExpenseRepository, HttpProbe, SyncJob, SyncWorker, ThreadScheduler,
    WorkScheduler,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

/// How long a command waits on its background drain before exiting.
pub const EXIT_GRACE: Duration = Duration::from_secs(10);

/// Everything a command needs, wired once per process.
pub struct App {
    pub store: Arc<Store>,
    pub config: SyncConfig,
    pub repo: ExpenseRepository,
    pub worker: Arc<SyncWorker>,
    background: Option<Arc<ThreadScheduler>>,
}

impl App {
    pub fn new(
        store: Arc<Store>,
        remote: Arc<dyn RemoteClient>,
        scheduler: Arc<dyn WorkScheduler>,
        config: SyncConfig,
    ) -> Self {
        let worker = Arc::new(SyncWorker::new(
            Arc::clone(&store),
            Arc::clone(&remote),
            config.max_rejections,
        ));
        let repo = ExpenseRepository::new(Arc::clone(&store), remote, scheduler);
        Self {
            store,
            config,
            repo,
            worker,
            background: None,
        }
    }

    /// HTTP remote, connectivity probe and a background thread scheduler.
    pub fn connect(store: Arc<Store>) -> Result<Self> {
        let config = SyncConfig::load(&store)?;
        let token: Arc<dyn TokenProvider> = if std::env::var(TOKEN_ENV).is_ok() {
            Arc::new(StaticToken(config.access_token.clone()))
        } else {
            Arc::new(SettingsToken::new(Arc::clone(&store)))
        };
        let remote: Arc<dyn RemoteClient> = Arc::new(
            HttpRemote::new(&config.api_base_url, token)
                .with_context(|| format!("API client for {}", config.api_base_url))?,
        );
        let connectivity = Arc::new(HttpProbe::new(&config.api_base_url, Duration::from_secs(5))?);
        Ok(Self::threaded(store, remote, connectivity, config))
    }

    /// Wires `remote` behind a background thread scheduler gated on
    /// `connectivity`.
    pub fn threaded(
        store: Arc<Store>,
        remote: Arc<dyn RemoteClient>,
        connectivity: Arc<dyn Connectivity>,
        config: SyncConfig,
    ) -> Self {
        let worker = Arc::new(SyncWorker::new(
            Arc::clone(&store),
            Arc::clone(&remote),
            config.max_rejections,
        ));
        let background = Arc::new(ThreadScheduler::new(
            Arc::clone(&worker) as Arc<dyn SyncJob>,
            connectivity,
            config.policy(),
        ));
        let repo = ExpenseRepository::new(
            Arc::clone(&store),
            remote,
            Arc::clone(&background) as Arc<dyn WorkScheduler>,
        );
        Self {
            store,
            config,
            repo,
            worker,
            background: Some(background),
        }
    }

    /// Gives a queued background drain [`EXIT_GRACE`] to finish, then stops
    /// it. Returns what is still waiting for the server.
    pub fn finish(&self) -> Result<SyncStatus> {
        self.finish_within(EXIT_GRACE)
    }

    pub fn finish_within(&self, grace: Duration) -> Result<SyncStatus> {
        if let Some(bg) = &self.background {
            if bg.is_active() && !bg.wait_idle(grace) {
                log::info!("Stopping background sync after {:?}; pending changes stay queued", grace);
            }
            bg.shutdown();
        }
        Ok(self
            .store
            .expenses()
            .sync_status(self.config.max_rejections)?)
    }
}

pub(crate) fn required<'a>(m: &'a clap::ArgMatches, name: &str) -> Result<&'a String> {
    m.get_one::<String>(name)
        .with_context(|| format!("missing required argument '{}'", name))
}
