// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::App;
use crate::sync::WorkOutcome;
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::{Context, Result};

pub fn handle(app: &App, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("now", _)) => now(app)?,
        Some(("all", _)) => all(app)?,
        Some(("status", sub)) => status(app, sub)?,
        _ => {}
    }
    Ok(())
}

/// One worker pass in the foreground; the backoff loop is the scheduler's job.
fn now(app: &App) -> Result<()> {
    let report = app.worker.run().context("Sync pass aborted")?;
    println!(
        "{} created, {} deleted, {} rejected, {} waiting on the server, {} quarantined",
        report.created, report.deleted, report.rejected, report.transient, report.quarantined
    );
    if report.outcome() == WorkOutcome::Retry {
        println!("Some changes could not reach the server; run `sync now` again later.");
    }
    Ok(())
}

fn all(app: &App) -> Result<()> {
    let summary = app
        .repo
        .sync_all_from_backend()
        .context("Could not load trackers from server")?;
    println!(
        "{} tracker(s), {} refreshed, {} duplicate(s) pruned",
        summary.trackers, summary.refreshed, summary.pruned_duplicates
    );
    for failure in &summary.failures {
        println!("  skipped {}", failure);
    }
    Ok(())
}

fn status(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let status = app
        .store
        .expenses()
        .sync_status(app.config.max_rejections)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &status)? {
        let rows = vec![
            vec!["pending creates".into(), status.pending_creates.to_string()],
            vec!["pending deletes".into(), status.pending_deletes.to_string()],
            vec!["quarantined".into(), status.quarantined.to_string()],
            vec!["server".into(), app.config.api_base_url.clone()],
        ];
        println!("{}", pretty_table(&["Sync", "Value"], rows));
        if status.is_clean() {
            println!("All local changes are on the server.");
        }
    }
    Ok(())
}
