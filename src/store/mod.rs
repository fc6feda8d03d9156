// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Durable local store.
//!
//! The store is the only source of truth for reads. Every committed write
//! broadcasts the touched [`Table`] to subscribers so [`LiveQuery`] readers
//! re-query without polling.

mod expenses;
mod trackers;

pub use expenses::ExpenseDao;
pub use trackers::TrackerDao;

use crate::db;
use crate::error::SyncResult;
use rusqlite::{Connection, Transaction};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Trackers,
    Expenses,
    Settings,
}

pub struct Store {
    conn: Mutex<Connection>,
    watchers: Mutex<Vec<Sender<Table>>>,
}

impl Store {
    pub fn open(path: &Path) -> SyncResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> SyncResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> SyncResult<Self> {
        db::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            watchers: Mutex::new(Vec::new()),
        })
    }

    pub fn expenses(&self) -> ExpenseDao<'_> {
        ExpenseDao::new(self)
    }

    pub fn trackers(&self) -> TrackerDao<'_> {
        TrackerDao::new(self)
    }

    pub fn get_setting(&self, key: &str) -> SyncResult<Option<String>> {
        self.read(|conn| db::get_setting(conn, key))
    }

    pub fn set_setting(&self, key: &str, value: &str) -> SyncResult<()> {
        self.write(Table::Settings, |conn| db::set_setting(conn, key, value))
    }

    pub fn all_settings(&self) -> SyncResult<Vec<(String, String)>> {
        self.read(db::all_settings)
    }

    /// Raw change notifications, one message per committed write.
    pub fn subscribe(&self) -> SyncResult<Receiver<Table>> {
        let (tx, rx) = mpsc::channel();
        self.watchers.lock()?.push(tx);
        Ok(rx)
    }

    pub(crate) fn read<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> SyncResult<T> {
        let conn = self.conn.lock()?;
        Ok(f(&conn)?)
    }

    pub(crate) fn write<T>(
        &self,
        table: Table,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> SyncResult<T> {
        let out = {
            let conn = self.conn.lock()?;
            f(&conn)?
        };
        self.notify(table);
        Ok(out)
    }

    /// Runs `f` in a transaction; subscribers hear about it only after commit.
    pub(crate) fn write_tx<T>(
        &self,
        table: Table,
        f: impl FnOnce(&Transaction<'_>) -> rusqlite::Result<T>,
    ) -> SyncResult<T> {
        let out = {
            let mut conn = self.conn.lock()?;
            let tx = conn.transaction()?;
            let out = f(&tx)?;
            tx.commit()?;
            out
        };
        self.notify(table);
        Ok(out)
    }

    fn notify(&self, table: Table) {
        if let Ok(mut watchers) = self.watchers.lock() {
            watchers.retain(|tx| tx.send(table).is_ok());
        }
    }
}

type Fetch<T> = Box<dyn Fn(&Store) -> SyncResult<T> + Send>;

/// A continuously updating read: the first item is the current snapshot,
/// each further item is a fresh snapshot taken after a write to `table`.
pub struct LiveQuery<T> {
    store: Arc<Store>,
    table: Table,
    rx: Receiver<Table>,
    fetch: Fetch<T>,
    primed: bool,
}

impl<T> LiveQuery<T> {
    pub(crate) fn new(
        store: &Arc<Store>,
        table: Table,
        fetch: impl Fn(&Store) -> SyncResult<T> + Send + 'static,
    ) -> SyncResult<Self> {
        Ok(Self {
            rx: store.subscribe()?,
            store: Arc::clone(store),
            table,
            fetch: Box::new(fetch),
            primed: false,
        })
    }

    pub fn current(&self) -> SyncResult<T> {
        (self.fetch)(&self.store)
    }

    /// Waits up to `timeout` for a relevant write. `None` on timeout.
    pub fn next_change(&mut self, timeout: Duration) -> Option<SyncResult<T>> {
        loop {
            match self.rx.recv_timeout(timeout) {
                Ok(table) if table == self.table => {
                    self.drain_pending();
                    return Some(self.current());
                }
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None;
                }
            }
        }
    }

    // Collapse a burst of notifications into one snapshot.
    fn drain_pending(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }
}

impl<T> Iterator for LiveQuery<T> {
    type Item = SyncResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.primed {
            self.primed = true;
            return Some(self.current());
        }
        loop {
            match self.rx.recv() {
                Ok(table) if table == self.table => {
                    self.drain_pending();
                    return Some(self.current());
                }
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    }
}

pub(crate) fn decimal_column(r: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let s: String = r.get(idx)?;
    s.parse::<Decimal>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
