// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{required, App};
use crate::models::Expense;
use crate::sync::ExpenseDraft;
use crate::utils::{fmt_money, maybe_print_json, parse_date, parse_decimal, pretty_table};
use anyhow::{bail, Context, Result};
use serde::Serialize;

pub fn handle(app: &App, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            add(app, sub)?;
        }
        Some(("list", sub)) => list(app, sub)?,
        Some(("refresh", sub)) => refresh(app, sub)?,
        Some(("delete", sub)) => delete(app, sub)?,
        Some(("requeue", sub)) => requeue(app, sub)?,
        Some(("pending", sub)) => pending(app, sub)?,
        _ => {}
    }
    Ok(())
}

fn resolve_tracker(app: &App, sub: &clap::ArgMatches) -> Result<String> {
    if let Some(id) = sub.get_one::<String>("tracker") {
        return Ok(id.clone());
    }
    let current = app
        .repo
        .current_tracker()?
        .context("No tracker yet; pass --tracker or create one first")?;
    Ok(current.id)
}

pub fn add(app: &App, sub: &clap::ArgMatches) -> Result<Expense> {
    let description = required(sub, "description")?.trim().to_string();
    if description.is_empty() {
        bail!("Description must not be empty");
    }
    let draft = ExpenseDraft {
        description,
        amount: parse_decimal(required(sub, "amount")?)?,
        date: parse_date(required(sub, "date")?)?.to_string(),
        tracker_id: resolve_tracker(app, sub)?,
    };
    let expense = app.repo.add_expense(draft)?;
    if expense.is_synced {
        println!(
            "Recorded {} '{}' on {} (synced as {})",
            fmt_money(&expense.amount),
            expense.description,
            expense.date,
            expense.id
        );
    } else {
        println!(
            "Recorded {} '{}' on {} offline; it will sync in the background",
            fmt_money(&expense.amount),
            expense.description,
            expense.date
        );
    }
    Ok(expense)
}

#[derive(Serialize)]
pub struct ExpenseRow {
    pub id: String,
    pub date: String,
    pub description: String,
    pub amount: String,
    pub synced: bool,
}

impl From<&Expense> for ExpenseRow {
    fn from(e: &Expense) -> Self {
        Self {
            id: e.id.clone(),
            date: e.date.clone(),
            description: e.description.clone(),
            amount: fmt_money(&e.amount),
            synced: e.is_synced,
        }
    }
}

fn to_rows(expenses: &[Expense], limit: Option<usize>) -> Vec<ExpenseRow> {
    expenses
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(ExpenseRow::from)
        .collect()
}

pub fn query_rows(app: &App, sub: &clap::ArgMatches) -> Result<Vec<ExpenseRow>> {
    let tracker_id = resolve_tracker(app, sub)?;
    let expenses = app.repo.get_expenses(&tracker_id)?.current()?;
    Ok(to_rows(&expenses, sub.get_one::<usize>("limit").copied()))
}

fn print_rows(sub: &clap::ArgMatches, data: &[ExpenseRow]) -> Result<()> {
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.date.clone(),
                    r.description.clone(),
                    r.amount.clone(),
                    if r.synced { "yes" } else { "pending" }.to_string(),
                    r.id.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Date", "Description", "Amount", "Synced", "ID"], rows)
        );
    }
    Ok(())
}

fn list(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    if !sub.get_flag("watch") {
        return print_rows(sub, &query_rows(app, sub)?);
    }
    let tracker_id = resolve_tracker(app, sub)?;
    let limit = sub.get_one::<usize>("limit").copied();
    for snapshot in app.repo.get_expenses(&tracker_id)? {
        print_rows(sub, &to_rows(&snapshot?, limit))?;
    }
    Ok(())
}

fn refresh(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let tracker_id = resolve_tracker(app, sub)?;
    let plan = app
        .repo
        .refresh_expenses(&tracker_id)
        .with_context(|| format!("Could not refresh expenses for {}", tracker_id))?;
    println!(
        "{} expense(s) from server, {} local duplicate(s) dropped",
        plan.upserts.len() + plan.held_back,
        plan.prune.len()
    );
    Ok(())
}

fn delete(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let id = required(sub, "id")?;
    if app.repo.delete_expense(id)? {
        println!("Deleted {}; the server will be told in the background", id);
    } else {
        bail!("Expense '{}' not found", id);
    }
    Ok(())
}

fn requeue(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let id = required(sub, "id")?;
    if !app.store.expenses().requeue(id)? {
        bail!("Expense '{}' is not pending", id);
    }
    app.repo.trigger_expense_sync();
    println!("Requeued {}", id);
    Ok(())
}

fn pending(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let unsynced = app.store.expenses().list_unsynced()?;
    let quarantined = app.store.expenses().quarantined(app.config.max_rejections)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &unsynced)? {
        return Ok(());
    }
    let rows: Vec<Vec<String>> = unsynced
        .iter()
        .map(|e| {
            let kind = if e.is_deleted { "delete" } else { "create" };
            let note = quarantined
                .iter()
                .find(|q| q.expense.id == e.id)
                .map(|q| {
                    format!(
                        "quarantined after {} rejections: {}",
                        q.attempts,
                        q.last_error.clone().unwrap_or_default()
                    )
                })
                .unwrap_or_default();
            vec![
                e.id.clone(),
                kind.to_string(),
                e.date.clone(),
                e.description.clone(),
                fmt_money(&e.amount),
                note,
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["ID", "Change", "Date", "Description", "Amount", "Note"], rows)
    );
    Ok(())
}
