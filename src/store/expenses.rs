// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{decimal_column, LiveQuery, Store, Table};
use crate::error::SyncResult;
use crate::models::{Expense, SyncStatus};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::Arc;

const COLUMNS: &str =
    "id, description, amount, date, tracker_id, created_at, updated_at, is_synced, is_deleted";

fn from_row(r: &Row<'_>) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: r.get(0)?,
        description: r.get(1)?,
        amount: decimal_column(r, 2)?,
        date: r.get(3)?,
        tracker_id: r.get(4)?,
        created_at: r.get(5)?,
        updated_at: r.get(6)?,
        is_synced: r.get(7)?,
        is_deleted: r.get(8)?,
    })
}

// A synced write clears the rejection bookkeeping; a pending rewrite keeps it.
fn upsert_row(conn: &Connection, e: &Expense) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO expenses(id, description, amount, date, tracker_id, created_at, updated_at, is_synced, is_deleted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(id) DO UPDATE SET
            description=excluded.description,
            amount=excluded.amount,
            date=excluded.date,
            tracker_id=excluded.tracker_id,
            created_at=excluded.created_at,
            updated_at=excluded.updated_at,
            is_synced=excluded.is_synced,
            is_deleted=excluded.is_deleted,
            sync_attempts=CASE WHEN excluded.is_synced THEN 0 ELSE expenses.sync_attempts END,
            last_error=CASE WHEN excluded.is_synced THEN NULL ELSE expenses.last_error END",
        params![
            e.id,
            e.description,
            e.amount.to_string(),
            e.date,
            e.tracker_id,
            e.created_at,
            e.updated_at,
            e.is_synced,
            e.is_deleted
        ],
    )?;
    Ok(())
}

fn query_visible(conn: &Connection, tracker_id: &str) -> rusqlite::Result<Vec<Expense>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM expenses WHERE tracker_id=?1 AND is_deleted=0 ORDER BY date DESC, created_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![tracker_id], from_row)?;
    rows.collect()
}

/// A pending row that keeps getting rejected by the server.
#[derive(Debug, Clone)]
pub struct QuarantinedExpense {
    pub expense: Expense,
    pub attempts: u32,
    pub last_error: Option<String>,
}

pub struct ExpenseDao<'a> {
    store: &'a Store,
}

impl<'a> ExpenseDao<'a> {
    pub(super) fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Snapshot of the rows the UI may show for a tracker, newest date first.
    pub fn list_once(&self, tracker_id: &str) -> SyncResult<Vec<Expense>> {
        self.store.read(|conn| query_visible(conn, tracker_id))
    }

    pub fn get(&self, id: &str) -> SyncResult<Option<Expense>> {
        let sql = format!("SELECT {COLUMNS} FROM expenses WHERE id=?1");
        self.store
            .read(|conn| conn.query_row(&sql, params![id], from_row).optional())
    }

    pub fn upsert(&self, expense: &Expense) -> SyncResult<()> {
        self.store
            .write(Table::Expenses, |conn| upsert_row(conn, expense))
    }

    pub fn upsert_all(&self, expenses: &[Expense]) -> SyncResult<()> {
        self.store.write_tx(Table::Expenses, |tx| {
            for e in expenses {
                upsert_row(tx, e)?;
            }
            Ok(())
        })
    }

    /// Pending creates and pending deletes alike.
    pub fn list_unsynced(&self) -> SyncResult<Vec<Expense>> {
        let sql = format!("SELECT {COLUMNS} FROM expenses WHERE is_synced=0 ORDER BY created_at");
        self.store.read(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], from_row)?;
            rows.collect()
        })
    }

    /// Soft delete: the row stays until the server confirms.
    pub fn mark_deleted(&self, id: &str) -> SyncResult<bool> {
        self.store.write(Table::Expenses, |conn| {
            let n = conn.execute(
                "UPDATE expenses SET is_deleted=1, is_synced=0, sync_attempts=0, last_error=NULL WHERE id=?1",
                params![id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn delete_permanently(&self, id: &str) -> SyncResult<()> {
        self.store.write(Table::Expenses, |conn| {
            conn.execute("DELETE FROM expenses WHERE id=?1", params![id])?;
            Ok(())
        })
    }

    /// Drops `old_id` and writes `replacement` in one transaction so the two
    /// ids never coexist in a snapshot.
    pub fn replace(&self, old_id: &str, replacement: &Expense) -> SyncResult<()> {
        self.store.write_tx(Table::Expenses, |tx| {
            if old_id != replacement.id {
                tx.execute("DELETE FROM expenses WHERE id=?1", params![old_id])?;
            }
            upsert_row(tx, replacement)
        })
    }

    /// Prune, retarget, then upsert, atomically. A retarget moves a pending
    /// delete from a stale client id onto the id the server knows.
    pub fn apply_merge(
        &self,
        prune: &[String],
        retarget: &[(String, Expense)],
        upserts: &[Expense],
    ) -> SyncResult<()> {
        self.store.write_tx(Table::Expenses, |tx| {
            for id in prune {
                tx.execute("DELETE FROM expenses WHERE id=?1", params![id])?;
            }
            for (old_id, moved) in retarget {
                tx.execute("DELETE FROM expenses WHERE id=?1", params![old_id])?;
                upsert_row(tx, moved)?;
            }
            for e in upserts {
                upsert_row(tx, e)?;
            }
            Ok(())
        })
    }

    /// Soft-deleted rows of one tracker still waiting for the server.
    pub fn pending_deletes(&self, tracker_id: &str) -> SyncResult<Vec<Expense>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM expenses WHERE tracker_id=?1 AND is_deleted=1 AND is_synced=0 ORDER BY created_at"
        );
        self.store.read(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![tracker_id], from_row)?;
            rows.collect()
        })
    }

    /// Records a permanent rejection and returns the new attempt count.
    pub fn record_rejection(&self, id: &str, error: &str) -> SyncResult<u32> {
        self.store.write(Table::Expenses, |conn| {
            conn.execute(
                "UPDATE expenses SET sync_attempts=sync_attempts+1, last_error=?2 WHERE id=?1",
                params![id, error],
            )?;
            let n: Option<u32> = conn
                .query_row(
                    "SELECT sync_attempts FROM expenses WHERE id=?1",
                    params![id],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(n.unwrap_or(0))
        })
    }

    pub fn sync_attempts(&self, id: &str) -> SyncResult<u32> {
        self.store.read(|conn| {
            let n: Option<u32> = conn
                .query_row(
                    "SELECT sync_attempts FROM expenses WHERE id=?1",
                    params![id],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(n.unwrap_or(0))
        })
    }

    /// Puts a quarantined row back in the queue. Returns false if `id` is unknown.
    pub fn requeue(&self, id: &str) -> SyncResult<bool> {
        self.store.write(Table::Expenses, |conn| {
            let n = conn.execute(
                "UPDATE expenses SET sync_attempts=0, last_error=NULL WHERE id=?1 AND is_synced=0",
                params![id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn quarantined(&self, max_rejections: u32) -> SyncResult<Vec<QuarantinedExpense>> {
        let sql = format!(
            "SELECT {COLUMNS}, sync_attempts, last_error FROM expenses
             WHERE is_synced=0 AND sync_attempts>=?1 ORDER BY created_at"
        );
        self.store.read(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![max_rejections], |r| {
                Ok(QuarantinedExpense {
                    expense: from_row(r)?,
                    attempts: r.get(9)?,
                    last_error: r.get(10)?,
                })
            })?;
            rows.collect()
        })
    }

    pub fn sync_status(&self, max_rejections: u32) -> SyncResult<SyncStatus> {
        self.store.read(|conn| {
            conn.query_row(
                "SELECT
                    COALESCE(SUM(CASE WHEN is_deleted=0 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN is_deleted=1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN sync_attempts>=?1 THEN 1 ELSE 0 END), 0)
                 FROM expenses WHERE is_synced=0",
                params![max_rejections],
                |r| {
                    Ok(SyncStatus {
                        pending_creates: r.get::<_, i64>(0)? as usize,
                        pending_deletes: r.get::<_, i64>(1)? as usize,
                        quarantined: r.get::<_, i64>(2)? as usize,
                    })
                },
            )
        })
    }
}

impl Store {
    /// Live view of a tracker's visible expenses.
    pub fn watch_expenses(
        self: &Arc<Self>,
        tracker_id: &str,
    ) -> SyncResult<LiveQuery<Vec<Expense>>> {
        let tracker_id = tracker_id.to_string();
        LiveQuery::new(self, Table::Expenses, move |store| {
            store.expenses().list_once(&tracker_id)
        })
    }
}
