// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{required, App};
use crate::models::Tracker;
use crate::sync::TrackerDraft;
use crate::utils::{fmt_money, maybe_print_json, parse_date, parse_decimal, pretty_table};
use anyhow::{bail, Context, Result};

pub fn handle(app: &App, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("create", sub)) => create(app, sub)?,
        Some(("update", sub)) => update(app, sub)?,
        Some(("list", sub)) => list(app, sub)?,
        Some(("current", sub)) => current(app, sub)?,
        Some(("refresh", _)) => {
            let trackers = app.repo.refresh_trackers()?;
            println!("{} tracker(s) loaded from server", trackers.len());
        }
        _ => {}
    }
    Ok(())
}

fn create(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let draft = TrackerDraft {
        name: required(sub, "name")?.trim().to_string(),
        description: sub.get_one::<String>("description").cloned(),
        budget: parse_decimal(required(sub, "budget")?)?,
        start_date: parse_date(required(sub, "start")?)?.to_string(),
        end_date: parse_date(required(sub, "end")?)?.to_string(),
    };
    check_period(&draft)?;
    let tracker = app
        .repo
        .create_tracker(draft)
        .context("Tracker was not created")?;
    println!(
        "Created tracker '{}' ({}) budget {} from {} to {}",
        tracker.name,
        tracker.id,
        fmt_money(&tracker.budget),
        tracker.start_date,
        tracker.end_date
    );
    Ok(())
}

fn update(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let id = required(sub, "id")?;
    let cached = app
        .store
        .trackers()
        .get(id)?
        .with_context(|| format!("Tracker '{}' is not cached; run `tracker refresh`", id))?;
    let draft = merged_draft(&cached, sub)?;
    check_period(&draft)?;
    let tracker = app.repo.update_tracker(id, draft)?;
    println!("Updated tracker '{}' ({})", tracker.name, tracker.id);
    Ok(())
}

/// Command-line values over the cached tracker.
pub fn merged_draft(cached: &Tracker, sub: &clap::ArgMatches) -> Result<TrackerDraft> {
    let budget = match sub.get_one::<String>("budget") {
        Some(s) => parse_decimal(s)?,
        None => cached.budget,
    };
    let start_date = match sub.get_one::<String>("start") {
        Some(s) => parse_date(s)?.to_string(),
        None => cached.start_date.clone(),
    };
    let end_date = match sub.get_one::<String>("end") {
        Some(s) => parse_date(s)?.to_string(),
        None => cached.end_date.clone(),
    };
    Ok(TrackerDraft {
        name: sub
            .get_one::<String>("name")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| cached.name.clone()),
        description: Some(
            sub.get_one::<String>("description")
                .cloned()
                .unwrap_or_else(|| cached.description.clone()),
        ),
        budget,
        start_date,
        end_date,
    })
}

fn check_period(draft: &TrackerDraft) -> Result<()> {
    if draft.name.is_empty() {
        bail!("Tracker name must not be empty");
    }
    // ISO dates order lexically.
    if draft.end_date < draft.start_date {
        bail!(
            "End date {} is before start date {}",
            draft.end_date,
            draft.start_date
        );
    }
    Ok(())
}

fn rows(trackers: &[Tracker]) -> Vec<Vec<String>> {
    trackers
        .iter()
        .map(|t| {
            vec![
                t.id.clone(),
                t.name.clone(),
                fmt_money(&t.budget),
                t.start_date.clone(),
                t.end_date.clone(),
                if t.is_synced { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect()
}

const HEADERS: [&str; 6] = ["ID", "Name", "Budget", "Start", "End", "Synced"];

fn list(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let trackers = app.repo.get_trackers()?.current()?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &trackers)? {
        println!("{}", pretty_table(&HEADERS, rows(&trackers)));
    }
    Ok(())
}

fn current(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let Some(tracker) = app.repo.current_tracker()? else {
        println!("No tracker yet. Create one with `tracker create` or run `sync all`.");
        return Ok(());
    };
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &tracker)? {
        println!("{}", pretty_table(&HEADERS, rows(std::slice::from_ref(&tracker))));
    }
    Ok(())
}
