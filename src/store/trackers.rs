// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{decimal_column, LiveQuery, Store, Table};
use crate::error::SyncResult;
use crate::models::Tracker;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::Arc;

const COLUMNS: &str = "id, name, description, budget, start_date, end_date, is_synced, is_deleted";
const ORDER: &str = "ORDER BY start_date DESC, upsert_seq DESC";

fn from_row(r: &Row<'_>) -> rusqlite::Result<Tracker> {
    Ok(Tracker {
        id: r.get(0)?,
        name: r.get(1)?,
        description: r.get(2)?,
        budget: decimal_column(r, 3)?,
        start_date: r.get(4)?,
        end_date: r.get(5)?,
        is_synced: r.get(6)?,
        is_deleted: r.get(7)?,
    })
}

fn upsert_row(conn: &Connection, t: &Tracker) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO trackers(id, name, description, budget, start_date, end_date, is_synced, is_deleted, upsert_seq)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, (SELECT COALESCE(MAX(upsert_seq), 0) + 1 FROM trackers))
         ON CONFLICT(id) DO UPDATE SET
            name=excluded.name,
            description=excluded.description,
            budget=excluded.budget,
            start_date=excluded.start_date,
            end_date=excluded.end_date,
            is_synced=excluded.is_synced,
            is_deleted=excluded.is_deleted,
            upsert_seq=excluded.upsert_seq",
        params![
            t.id,
            t.name,
            t.description,
            t.budget.to_string(),
            t.start_date,
            t.end_date,
            t.is_synced,
            t.is_deleted
        ],
    )?;
    Ok(())
}

fn query_all(conn: &Connection) -> rusqlite::Result<Vec<Tracker>> {
    let sql = format!("SELECT {COLUMNS} FROM trackers WHERE is_deleted=0 {ORDER}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], from_row)?;
    rows.collect()
}

pub struct TrackerDao<'a> {
    store: &'a Store,
}

impl<'a> TrackerDao<'a> {
    pub(super) fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn list_once(&self) -> SyncResult<Vec<Tracker>> {
        self.store.read(query_all)
    }

    /// The "current" tracker: latest start date, most recent write on ties.
    pub fn latest(&self) -> SyncResult<Option<Tracker>> {
        let sql = format!("SELECT {COLUMNS} FROM trackers WHERE is_deleted=0 {ORDER} LIMIT 1");
        self.store
            .read(|conn| conn.query_row(&sql, [], from_row).optional())
    }

    pub fn get(&self, id: &str) -> SyncResult<Option<Tracker>> {
        let sql = format!("SELECT {COLUMNS} FROM trackers WHERE id=?1");
        self.store
            .read(|conn| conn.query_row(&sql, params![id], from_row).optional())
    }

    pub fn upsert(&self, tracker: &Tracker) -> SyncResult<()> {
        self.store
            .write(Table::Trackers, |conn| upsert_row(conn, tracker))
    }

    /// Clear-then-insert in one transaction.
    pub fn replace_all(&self, trackers: &[Tracker]) -> SyncResult<()> {
        self.store.write_tx(Table::Trackers, |tx| {
            tx.execute("DELETE FROM trackers", [])?;
            for t in trackers {
                upsert_row(tx, t)?;
            }
            Ok(())
        })
    }
}

impl Store {
    pub fn watch_trackers(self: &Arc<Self>) -> SyncResult<LiveQuery<Vec<Tracker>>> {
        LiveQuery::new(self, Table::Trackers, |store| store.trackers().list_once())
    }
}
