// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::SyncConfig;
use crate::store::Store;
use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(store: &Store) -> Result<()> {
    let cfg = SyncConfig::load(store)?;
    let rows = find_issues(store, &cfg)?;
    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

pub fn find_issues(store: &Store, cfg: &SyncConfig) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();

    // 1) Rows the server keeps refusing
    for q in store.expenses().quarantined(cfg.max_rejections)? {
        rows.push(vec![
            "quarantined".into(),
            format!(
                "{} ({} rejections: {})",
                q.expense.id,
                q.attempts,
                q.last_error.unwrap_or_default()
            ),
        ]);
    }

    // 2) Expenses pointing at a tracker we no longer cache
    let orphans = store.read(orphaned_trackers)?;
    for (tracker_id, n) in orphans {
        rows.push(vec![
            "unknown_tracker".into(),
            format!("{} expense(s) reference {}", n, tracker_id),
        ]);
    }

    // 3) No credentials configured
    if cfg.access_token.is_none() {
        rows.push(vec![
            "no_token".into(),
            "requests go out unauthenticated; set access_token".into(),
        ]);
    }
    Ok(rows)
}

fn orphaned_trackers(conn: &Connection) -> rusqlite::Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT e.tracker_id, COUNT(*) FROM expenses e
         LEFT JOIN trackers t ON t.id = e.tracker_id
         WHERE t.id IS NULL AND e.is_deleted = 0
         GROUP BY e.tracker_id ORDER BY e.tracker_id",
    )?;
    let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;
    rows.collect()
}
