//! On-disk store backed by redb.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use tracing::info;

use super::Store;
use crate::error::StoreError;
use crate::Config;

/// Table for node records: big-endian id -> encoded node.
const RECORDS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("records");

/// A redb database holding one table of records.
///
/// Every `put` commits its own write transaction, so each record write is
/// atomic on its own and nothing larger is.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open the database at `path` with default configuration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_config(path, &Config::default())
    }

    /// Open the database at `path`.
    ///
    /// A missing database is created only when `config.create_if_missing` is set.
    pub fn open_with_config(path: impl AsRef<Path>, config: &Config) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let mut builder = Database::builder();
        builder.set_cache_size(config.cache_size);
        let db = if config.create_if_missing {
            builder.create(path)
        } else {
            builder.open(path)
        }
        .map_err(StoreError::redb)?;

        // Read transactions cannot open a table that was never created.
        let txn = db.begin_write().map_err(StoreError::redb)?;
        txn.open_table(RECORDS).map_err(StoreError::redb)?;
        txn.commit().map_err(StoreError::redb)?;

        info!(path = %path.display(), cache_size = config.cache_size, "opened redb store");
        Ok(Self { db })
    }
}

impl Store for RedbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let txn = self.db.begin_read().map_err(StoreError::redb)?;
        let table = txn.open_table(RECORDS).map_err(StoreError::redb)?;
        let value = table
            .get(key)
            .map_err(StoreError::redb)?
            .map(|guard| guard.value().to_vec());
        Ok(value)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(StoreError::redb)?;
        {
            let mut table = txn.open_table(RECORDS).map_err(StoreError::redb)?;
            table.insert(key, value).map_err(StoreError::redb)?;
        }
        txn.commit().map_err(StoreError::redb)?;
        Ok(())
    }

    fn last_key(&self) -> Result<Option<Vec<u8>>, StoreError> {
        let txn = self.db.begin_read().map_err(StoreError::redb)?;
        let table = txn.open_table(RECORDS).map_err(StoreError::redb)?;
        let last = table
            .last()
            .map_err(StoreError::redb)?
            .map(|(key, _)| key.value().to_vec());
        Ok(last)
    }

    fn close(self) -> Result<(), StoreError> {
        drop(self.db);
        Ok(())
    }
}
