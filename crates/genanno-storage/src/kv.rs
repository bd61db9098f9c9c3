// Copyright 2026 Forome
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The narrow KV-engine interface the core consumes, and two bindings:
//! [`RocksKv`] (on-disk, `rocksdb`-backed) and [`MemKv`] (in-memory, for
//! tests and `transformRecord`-style sanity checks that must not touch disk).
//!
//! The core never sees the engine's native handle type. A column handle is
//! just its mangled name (`"<schema>_base"` / `"<schema>_str"`); both
//! bindings re-resolve the name to their native handle on every call, which
//! keeps [`IOController`](crate::io::IOController) generic over `K` without
//! fighting rocksdb's borrowed `&ColumnFamily` lifetime.

use std::collections::BTreeMap;
use std::path::Path;

use parking_lot::Mutex;

use crate::error::{Error, Result};

pub type ColumnHandle = String;

/// One key's payload for one column, `put`/`get` in a single round trip.
pub trait KvEngine: Send + Sync {
    /// Registers (creating if necessary) a column identified by its full
    /// mangled name. Idempotent.
    fn reg_column(&self, full_name: &str) -> Result<ColumnHandle>;

    /// Writes (or, for `None`, deletes) one payload per listed column at `key`.
    fn put_data(&self, key: &[u8], values: &[(&ColumnHandle, Option<&[u8]>)]) -> Result<()>;

    /// Reads one payload per listed column at `key`; `None` if absent.
    fn get_data(&self, key: &[u8], columns: &[&ColumnHandle]) -> Result<Vec<Option<Vec<u8>>>>;

    /// Least key `>= seek_key` in `column`, with its payload; `None` if no
    /// such key exists.
    fn seek_data(&self, seek_key: &[u8], column: &ColumnHandle) -> Result<Option<(Vec<u8>, Vec<u8>)>>;

    /// Closes the connection. A no-op for engines that close on drop.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// `rocksdb`-backed engine: one column family per registered column.
pub struct RocksKv {
    db: rocksdb::DB,
}

impl RocksKv {
    /// Opens (creating if missing) the database at `path`, re-opening any
    /// column families already present.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let existing = rocksdb::DB::list_cf(&opts, &path).unwrap_or_default();
        let cf_descriptors: Vec<rocksdb::ColumnFamilyDescriptor> = if existing.is_empty() {
            vec![rocksdb::ColumnFamilyDescriptor::new(
                "default",
                rocksdb::Options::default(),
            )]
        } else {
            existing
                .iter()
                .map(|name| {
                    rocksdb::ColumnFamilyDescriptor::new(name, rocksdb::Options::default())
                })
                .collect()
        };

        let db = rocksdb::DB::open_cf_descriptors(&opts, &path, cf_descriptors)
            .map_err(|e| Error::Engine(e.to_string()))?;
        Ok(Self { db })
    }

    fn cf(&self, handle: &ColumnHandle) -> Result<std::sync::Arc<rocksdb::BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(handle)
            .ok_or_else(|| Error::Engine(format!("unregistered column {handle:?}")))
    }
}

impl KvEngine for RocksKv {
    fn reg_column(&self, full_name: &str) -> Result<ColumnHandle> {
        if self.db.cf_handle(full_name).is_none() {
            self.db
                .create_cf(full_name, &rocksdb::Options::default())
                .map_err(|e| Error::Engine(e.to_string()))?;
        }
        Ok(full_name.to_string())
    }

    fn put_data(&self, key: &[u8], values: &[(&ColumnHandle, Option<&[u8]>)]) -> Result<()> {
        for (handle, payload) in values {
            let cf = self.cf(handle)?;
            match payload {
                Some(bytes) => self
                    .db
                    .put_cf(&cf, key, bytes)
                    .map_err(|e| Error::Engine(e.to_string()))?,
                None => self
                    .db
                    .delete_cf(&cf, key)
                    .map_err(|e| Error::Engine(e.to_string()))?,
            }
        }
        Ok(())
    }

    fn get_data(&self, key: &[u8], columns: &[&ColumnHandle]) -> Result<Vec<Option<Vec<u8>>>> {
        columns
            .iter()
            .map(|handle| {
                let cf = self.cf(handle)?;
                self.db
                    .get_cf(&cf, key)
                    .map_err(|e| Error::Engine(e.to_string()))
            })
            .collect()
    }

    fn seek_data(&self, seek_key: &[u8], column: &ColumnHandle) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let cf = self.cf(column)?;
        let mut iter = self.db.raw_iterator_cf(&cf);
        iter.seek(seek_key);
        if !iter.valid() {
            return Ok(None);
        }
        Ok(Some((
            iter.key().expect("valid iterator has a key").to_vec(),
            iter.value().expect("valid iterator has a value").to_vec(),
        )))
    }
}

/// In-memory engine, one `BTreeMap` per column, guarded by a single mutex.
/// Used by the test suite and by callers that want `transformRecord`-style
/// round trips without touching disk.
#[derive(Default)]
pub struct MemKv {
    columns: Mutex<std::collections::HashMap<ColumnHandle, BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvEngine for MemKv {
    fn reg_column(&self, full_name: &str) -> Result<ColumnHandle> {
        self.columns
            .lock()
            .entry(full_name.to_string())
            .or_default();
        Ok(full_name.to_string())
    }

    fn put_data(&self, key: &[u8], values: &[(&ColumnHandle, Option<&[u8]>)]) -> Result<()> {
        let mut columns = self.columns.lock();
        for (handle, payload) in values {
            let column = columns
                .get_mut(*handle)
                .ok_or_else(|| Error::Engine(format!("unregistered column {handle:?}")))?;
            match payload {
                Some(bytes) => {
                    column.insert(key.to_vec(), bytes.to_vec());
                }
                None => {
                    column.remove(key);
                }
            }
        }
        Ok(())
    }

    fn get_data(&self, key: &[u8], columns: &[&ColumnHandle]) -> Result<Vec<Option<Vec<u8>>>> {
        let guard = self.columns.lock();
        columns
            .iter()
            .map(|handle| {
                let column = guard
                    .get(*handle)
                    .ok_or_else(|| Error::Engine(format!("unregistered column {handle:?}")))?;
                Ok(column.get(key).cloned())
            })
            .collect()
    }

    fn seek_data(&self, seek_key: &[u8], column: &ColumnHandle) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let guard = self.columns.lock();
        let column = guard
            .get(column)
            .ok_or_else(|| Error::Engine(format!("unregistered column {column:?}")))?;
        Ok(column
            .range(seek_key.to_vec()..)
            .next()
            .map(|(k, v)| (k.clone(), v.clone())))
    }
}
