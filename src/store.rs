//! Explicitly owned handle to the SQLite store.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::{Error, Result};
use crate::migrations;
use crate::watch::{ChangeFeed, Subscription, Table, Watch};

const DB_FILE_NAME: &str = "ppl_tracker.sqlite";

/// Default location of the database file inside the platform data dir.
pub fn default_db_path() -> Result<PathBuf> {
    let data_dir = dirs_next::data_dir().ok_or(Error::DataDir)?;
    let app_dir = data_dir.join("ppl-tracker");
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir)?;
    }
    Ok(app_dir.join(DB_FILE_NAME))
}

/// Connection plus the change feed for everything written through it.
///
/// Reads take `&self`. Writes take `&mut self`, run inside a transaction
/// and notify subscribers only after the commit succeeded.
pub struct Database {
    conn: Connection,
    feed: ChangeFeed,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        log::info!("Opening database at {}", path.as_ref().display());
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::migrate(&mut conn)?;
        Ok(Self {
            conn,
            feed: ChangeFeed::default(),
        })
    }

    /// Close the underlying connection, reporting any error SQLite raises.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| Error::Database(e))
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` in a transaction and publish `touched` once it committed.
    ///
    /// The write lock is taken up front so other handles on the same file
    /// wait for it instead of failing on a lock upgrade.
    pub(crate) fn write<T>(
        &mut self,
        touched: &[Table],
        f: impl FnOnce(&Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        self.feed.publish(touched);
        Ok(out)
    }

    /// Receive a notification for every committed write touching `tables`.
    pub fn subscribe(&mut self, tables: &[Table]) -> Subscription {
        self.feed.subscribe(tables)
    }

    /// Subscribe to `tables` and re-run `query` for a fresh snapshot after
    /// every change.
    pub fn watch<T, F>(&mut self, tables: &[Table], query: F) -> Watch<T, F>
    where
        F: Fn(&Database) -> Result<T>,
    {
        Watch::new(self.subscribe(tables), query)
    }
}
