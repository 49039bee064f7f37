//! RocksDB-backed persistent record storage.
//!
//! Implements [`RecordStore`] using two column families: `users` (key is the
//! UTF-8 username, value is a bincode [`UserRecord`]) and `metadata`
//! (schema version and last prune time). Whole-mapping writes use an atomic
//! [`WriteBatch`].

use std::collections::HashMap;
use std::path::Path;

use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};

use scorewatch_core::error::WatchError;
use scorewatch_core::traits::RecordStore;
use scorewatch_core::types::{Timestamp, UserRecord};

// --- Column family names ---

const CF_USERS: &str = "users";
const CF_METADATA: &str = "metadata";

/// All column family names.
const ALL_CFS: &[&str] = &[CF_USERS, CF_METADATA];

// --- Metadata keys ---

const META_SCHEMA_VERSION: &[u8] = b"schema_version";
const META_LAST_PRUNE: &[u8] = b"last_prune";

/// On-disk layout version written on first open.
pub const SCHEMA_VERSION: u64 = 1;

/// RocksDB-backed persistent storage for user records.
pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Open or create a RocksDB database at the given path.
    ///
    /// Creates all column families if they don't exist and stamps the schema
    /// version on a fresh database.
    ///
    /// # Errors
    ///
    /// [`WatchError::Storage`] if RocksDB fails to open, or if the database
    /// was written with a different schema version.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WatchError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&db_opts, path.as_ref(), cf_descriptors)
            .map_err(|e| WatchError::Storage(e.to_string()))?;

        let store = Self { db };

        match store.get_meta_u64(META_SCHEMA_VERSION)? {
            None => store.put_meta_u64(META_SCHEMA_VERSION, SCHEMA_VERSION)?,
            Some(SCHEMA_VERSION) => {}
            Some(other) => {
                return Err(WatchError::Storage(format!(
                    "unsupported schema version {other}, expected {SCHEMA_VERSION}"
                )));
            }
        }

        Ok(store)
    }

    /// Open an existing database without taking its write lock.
    ///
    /// Works while another process holds the database open for writing, and
    /// sees the data as of the moment it was opened. Every write through
    /// [`RecordStore`] fails with [`WatchError::Storage`].
    ///
    /// # Errors
    ///
    /// [`WatchError::Storage`] if the database does not exist, cannot be
    /// read, or was written with a different schema version.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self, WatchError> {
        let db = DB::open_cf_for_read_only(&Options::default(), path.as_ref(), ALL_CFS, false)
            .map_err(|e| WatchError::Storage(e.to_string()))?;

        let store = Self { db };
        match store.get_meta_u64(META_SCHEMA_VERSION)? {
            None | Some(SCHEMA_VERSION) => Ok(store),
            Some(other) => Err(WatchError::Storage(format!(
                "unsupported schema version {other}, expected {SCHEMA_VERSION}"
            ))),
        }
    }

    /// Look up a single user's record.
    pub fn get_user(&self, username: &str) -> Result<Option<UserRecord>, WatchError> {
        let cf = self.cf_handle(CF_USERS)?;
        self.db
            .get_cf(&cf, username.as_bytes())
            .map_err(|e| WatchError::Storage(e.to_string()))?
            .map(|bytes| Self::decode_record(&bytes))
            .transpose()
    }

    /// Persisted usernames in key order.
    pub fn usernames(&self) -> Result<Vec<String>, WatchError> {
        let cf = self.cf_handle(CF_USERS)?;
        let mut names = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, _) = item.map_err(|e| WatchError::Storage(e.to_string()))?;
            names.push(Self::decode_key(&key)?);
        }
        Ok(names)
    }

    /// Flush all in-memory buffers to disk.
    pub fn flush(&self) -> Result<(), WatchError> {
        self.db
            .flush()
            .map_err(|e| WatchError::Storage(e.to_string()))
    }

    /// Trigger manual compaction across all column families.
    ///
    /// Reclaims space left by pruned and deleted records.
    pub fn compact(&self) -> Result<(), WatchError> {
        for cf_name in ALL_CFS {
            let cf = self.cf_handle(cf_name)?;
            self.db.compact_range_cf(&cf, None::<&[u8]>, None::<&[u8]>);
        }
        Ok(())
    }

    // --- Internal helpers ---

    /// Get a column family handle.
    fn cf_handle(&self, name: &str) -> Result<&rocksdb::ColumnFamily, WatchError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| WatchError::Storage(format!("missing column family: {name}")))
    }

    /// Get a u64 from the metadata column family.
    fn get_meta_u64(&self, key: &[u8]) -> Result<Option<u64>, WatchError> {
        let cf = self.cf_handle(CF_METADATA)?;
        match self
            .db
            .get_cf(&cf, key)
            .map_err(|e| WatchError::Storage(e.to_string()))?
        {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| WatchError::Storage("invalid metadata value length".into()))?;
                Ok(Some(u64::from_le_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    fn put_meta_u64(&self, key: &[u8], value: u64) -> Result<(), WatchError> {
        let cf = self.cf_handle(CF_METADATA)?;
        self.db
            .put_cf(&cf, key, value.to_le_bytes())
            .map_err(|e| WatchError::Storage(e.to_string()))
    }

    fn encode_record(record: &UserRecord) -> Result<Vec<u8>, WatchError> {
        bincode::encode_to_vec(record, bincode::config::standard())
            .map_err(|e| WatchError::Storage(e.to_string()))
    }

    fn decode_record(bytes: &[u8]) -> Result<UserRecord, WatchError> {
        let (record, _): (UserRecord, _) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| WatchError::Storage(e.to_string()))?;
        Ok(record)
    }

    fn decode_key(key: &[u8]) -> Result<String, WatchError> {
        String::from_utf8(key.to_vec())
            .map_err(|e| WatchError::Storage(format!("invalid username key: {e}")))
    }
}

impl RecordStore for RocksStore {
    fn load_all(&self) -> Result<HashMap<String, UserRecord>, WatchError> {
        let cf = self.cf_handle(CF_USERS)?;
        let mut records = HashMap::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, value) = item.map_err(|e| WatchError::Storage(e.to_string()))?;
            records.insert(Self::decode_key(&key)?, Self::decode_record(&value)?);
        }
        tracing::debug!(users = records.len(), "loaded user records");
        Ok(records)
    }

    fn save_user(&mut self, username: &str, record: &UserRecord) -> Result<(), WatchError> {
        let cf = self.cf_handle(CF_USERS)?;
        let bytes = Self::encode_record(record)?;
        self.db
            .put_cf(&cf, username.as_bytes(), bytes)
            .map_err(|e| WatchError::Storage(e.to_string()))
    }

    fn save_all(&mut self, records: &HashMap<String, UserRecord>) -> Result<(), WatchError> {
        let cf = self.cf_handle(CF_USERS)?;
        let mut batch = WriteBatch::default();

        for username in self.usernames()? {
            if !records.contains_key(&username) {
                batch.delete_cf(cf, username.as_bytes());
            }
        }
        for (username, record) in records {
            batch.put_cf(cf, username.as_bytes(), Self::encode_record(record)?);
        }

        self.db
            .write(batch)
            .map_err(|e| WatchError::Storage(e.to_string()))?;
        tracing::debug!(users = records.len(), "wrote full record snapshot");
        Ok(())
    }

    fn delete_user(&mut self, username: &str) -> Result<(), WatchError> {
        let cf = self.cf_handle(CF_USERS)?;
        self.db
            .delete_cf(&cf, username.as_bytes())
            .map_err(|e| WatchError::Storage(e.to_string()))
    }

    fn clear(&mut self) -> Result<(), WatchError> {
        let cf = self.cf_handle(CF_USERS)?;
        let mut batch = WriteBatch::default();
        let names = self.usernames()?;
        for username in &names {
            batch.delete_cf(cf, username.as_bytes());
        }
        self.db
            .write(batch)
            .map_err(|e| WatchError::Storage(e.to_string()))?;
        tracing::info!(users = names.len(), "cleared all persisted records");
        Ok(())
    }

    fn set_last_prune(&mut self, at: Timestamp) -> Result<(), WatchError> {
        self.put_meta_u64(META_LAST_PRUNE, at.as_millis() as u64)
    }

    fn last_prune(&self) -> Result<Option<Timestamp>, WatchError> {
        Ok(self
            .get_meta_u64(META_LAST_PRUNE)?
            .map(|millis| Timestamp::from_millis(millis as i64)))
    }
}
