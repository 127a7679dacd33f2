//! # Environment
//!
//! An `Environment` binds the process to a database directory and hands
//! out transactions. Opening provisions every sub-database the given
//! table definitions need — main tables, index tables, and the `__meta`
//! counter table — in one write transaction, so later read transactions
//! never observe a missing sub-database.
//!
//! ## Usage
//!
//! ```ignore
//! let env = Environment::builder()
//!     .dir("./db")
//!     .cache_size(64 * 1024 * 1024)
//!     .open(&[&user_table])?;
//!
//! let txn = env.txn_rw()?;
//! // ... insert / update / scan ...
//! txn.commit()?;
//! ```
//!
//! Lifecycle is explicit: open here, teardown by dropping the
//! `Environment` (the engine flushes and releases its file handles).
//! There is no other global state.

use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use tracing::debug;

use crate::table::{TableDef, META_TABLE};
use crate::txn::{multi_def, plain_def, ReadTxn, WriteTxn};

const DATA_FILE: &str = "data.redb";

pub struct Environment {
    db: redb::Database,
    dir: PathBuf,
}

/// Builder for configuring and opening an [`Environment`].
pub struct EnvironmentBuilder {
    dir: Option<PathBuf>,
    cache_size: Option<usize>,
}

impl Default for EnvironmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentBuilder {
    pub fn new() -> Self {
        Self {
            dir: None,
            cache_size: None,
        }
    }

    /// Directory holding the data file. Created if absent.
    pub fn dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Engine page-cache budget in bytes. The engine picks its own
    /// default when unset.
    pub fn cache_size(mut self, bytes: usize) -> Self {
        self.cache_size = Some(bytes);
        self
    }

    /// Opens (or creates) the database and provisions the sub-databases
    /// for `tables`.
    pub fn open(self, tables: &[&TableDef]) -> Result<Environment> {
        let dir = self
            .dir
            .ok_or_else(|| eyre::eyre!("database directory not specified: call .dir() first"))?;
        std::fs::create_dir_all(&dir)
            .wrap_err_with(|| format!("failed to create directory {}", dir.display()))?;

        let mut builder = redb::Builder::new();
        if let Some(bytes) = self.cache_size {
            builder.set_cache_size(bytes);
        }
        let db = builder
            .create(dir.join(DATA_FILE))
            .wrap_err_with(|| format!("failed to open database in {}", dir.display()))?;

        let env = Environment { db, dir };
        env.provision(tables)?;
        Ok(env)
    }
}

impl Environment {
    pub fn builder() -> EnvironmentBuilder {
        EnvironmentBuilder::new()
    }

    /// Opens with default engine settings.
    pub fn open<P: AsRef<Path>>(dir: P, tables: &[&TableDef]) -> Result<Self> {
        Self::builder().dir(dir).open(tables)
    }

    fn provision(&self, tables: &[&TableDef]) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            txn.open_table(META_TABLE)?;
            for table in tables {
                txn.open_table(plain_def(table.name()))?;
                for ix in table.indices() {
                    if ix.unique {
                        txn.open_table(plain_def(ix.sub_db))?;
                    } else {
                        txn.open_multimap_table(multi_def(ix.sub_db))?;
                    }
                }
            }
        }
        txn.commit()?;
        debug!(
            dir = %self.dir.display(),
            tables = tables.len(),
            "environment opened"
        );
        Ok(())
    }

    /// Begins a read-only snapshot transaction. Any number may coexist
    /// with the single writer.
    pub fn txn_ro(&self) -> Result<ReadTxn> {
        Ok(ReadTxn {
            inner: self.db.begin_read()?,
        })
    }

    /// Begins the read/write transaction, blocking while another writer
    /// is active.
    pub fn txn_rw(&self) -> Result<WriteTxn> {
        Ok(WriteTxn {
            inner: self.db.begin_write()?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}
