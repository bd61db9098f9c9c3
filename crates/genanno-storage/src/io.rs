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

//! [`IOController`]: owns one storage stream end to end — schema, key codec,
//! KV connection, registered columns, block codec, the one open write block,
//! and the read-block cache.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::block::{BlockCodec, BlockSource, Key, ReadBlock, SeekResult};
use crate::error::{Error, Result};
use crate::kv::{ColumnHandle, KvEngine};
use crate::record::{Record, RecordCodec};
use crate::{DecodeEnv, EncodeEnv};
use genanno_key::KeyCodec;

/// Resolved configuration options for one [`IOController::open`] call. Every
/// option supplied must be consumed by `open`/the block codec it selects;
/// whatever is left over at [`IoDescriptor::check_fully_consumed`] is a fatal
/// configuration error.
#[derive(Debug, Default)]
pub struct IoDescriptor {
    values: HashMap<String, String>,
    consumed: std::collections::HashSet<String>,
}

impl IoDescriptor {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self {
            values,
            consumed: Default::default(),
        }
    }

    fn mark(&mut self, key: &str) {
        self.consumed.insert(key.to_string());
    }

    pub fn get(&mut self, key: &str) -> Option<String> {
        self.mark(key);
        self.values.get(key).cloned()
    }

    pub fn get_required(&mut self, key: &'static str) -> Result<String> {
        self.get(key).ok_or(Error::MissingOption(key))
    }

    pub fn get_or(&mut self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Errors if any supplied option was never read via `get`/`get_or`.
    pub fn check_fully_consumed(&self) -> Result<()> {
        for key in self.values.keys() {
            if !self.consumed.contains(key) {
                return Err(Error::UnconsumedOption(key.clone()));
            }
        }
        Ok(())
    }
}

fn make_block_codec(descriptor: &mut IoDescriptor) -> Result<Box<dyn BlockCodec>> {
    let block_type = descriptor.get_required("block-type")?;
    match block_type.as_str() {
        "range" => {
            let span: u32 = descriptor
                .get_or("range-span", "1000")
                .parse()
                .map_err(|_| Error::MissingOption("range-span"))?;
            Ok(Box::new(crate::block::RangeBlockCodec::new(span)))
        }
        other => Err(Error::UnknownBlockType(other.to_string())),
    }
}

/// Read-block cache: a plain MRU-ordered list guarded by a single mutex.
/// Not a hash-keyed cache, because membership is a predicate
/// ([`ReadBlock::good_to_read`]) rather than exact-key lookup — a seeked
/// block answers for a whole range, not just its anchor.
struct ReadCache {
    entries: Vec<Arc<dyn ReadBlock>>,
    bound: usize,
}

impl ReadCache {
    fn find_and_promote(&mut self, key: &Key) -> Option<Arc<dyn ReadBlock>> {
        let pos = self.entries.iter().position(|b| b.good_to_read(key))?;
        let block = self.entries.remove(pos);
        self.entries.insert(0, block.clone());
        Some(block)
    }

    fn insert_front_and_evict(&mut self, block: Arc<dyn ReadBlock>) {
        self.entries.insert(0, block);
        while self.entries.len() > self.bound {
            self.entries.pop();
            tracing::debug!("read-block cache evicted tail entry");
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

struct KvBlockSource<'a, K: KvEngine> {
    kv: &'a K,
    base_col: &'a ColumnHandle,
    str_col: Option<&'a ColumnHandle>,
}

impl<'a, K: KvEngine> BlockSource for KvBlockSource<'a, K> {
    fn seek(&self, query_key: Key) -> Result<Option<SeekResult>> {
        let Some((found_key, col0)) = self.kv.seek_data(&query_key, self.base_col)? else {
            return Ok(None);
        };
        let anchor_key: Key = found_key
            .as_slice()
            .try_into()
            .map_err(|_| Error::Engine("engine returned a non-4-byte key".to_string()))?;
        let col1 = match self.str_col {
            Some(str_col) => self
                .kv
                .get_data(&anchor_key, &[str_col])?
                .into_iter()
                .next()
                .flatten(),
            None => None,
        };
        Ok(Some(SeekResult {
            anchor_key,
            col0,
            col1,
        }))
    }
}

/// Owns one storage stream: at most one open write block, a bounded
/// read-block cache, and the columns registered for this schema.
///
/// Write access (`put_record`/`flush`/`close`) takes `&mut self`: the type
/// system enforces the "callers must serialize writes" rule from the
/// concurrency model instead of a runtime lock. Read access (`get_record`)
/// takes `&self` and guards only the cache's internal mutation.
pub struct IOController<K: KvEngine> {
    schema_name: String,
    write_mode: bool,
    key_codec: KeyCodec,
    kv: K,
    base_col: ColumnHandle,
    str_col: Option<ColumnHandle>,
    block_codec: Box<dyn BlockCodec>,
    write_block: Option<Box<dyn crate::block::WriteBlock>>,
    read_cache: Mutex<ReadCache>,
}

impl<K: KvEngine> IOController<K> {
    /// Opens one stream on `kv`. `with_str` decides whether the `str` column
    /// is registered. Column registration is one-time here, at open.
    pub fn open(
        kv: K,
        schema_name: impl Into<String>,
        write_mode: bool,
        key_codec: KeyCodec,
        with_str: bool,
        mut descriptor: IoDescriptor,
    ) -> Result<Self> {
        let schema_name = schema_name.into();
        let block_codec = make_block_codec(&mut descriptor)?;
        let cache_bound: usize = descriptor
            .get_or("cache-size", "3")
            .parse()
            .map_err(|_| Error::MissingOption("cache-size"))?;
        descriptor.check_fully_consumed()?;

        let base_col = kv.reg_column(&format!("{schema_name}_base"))?;
        let str_col = if with_str {
            Some(kv.reg_column(&format!("{schema_name}_str"))?)
        } else {
            None
        };

        Ok(Self {
            schema_name,
            write_mode,
            key_codec,
            kv,
            base_col,
            str_col,
            block_codec,
            write_block: None,
            read_cache: Mutex::new(ReadCache {
                entries: Vec::new(),
                bound: cache_bound,
            }),
        })
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn encode_key(&self, chrom: &str, pos: u32) -> genanno_key::Result<Key> {
        self.key_codec.encode(chrom, pos)
    }

    pub fn decode_key(&self, key: &Key) -> genanno_key::Result<(&'static str, u32)> {
        self.key_codec.decode(key)
    }

    /// Writes one record at `key`, opening or sealing write blocks as the
    /// block codec's membership policy dictates.
    pub fn put_record(&mut self, key: Key, record: &Record, codec: &dyn RecordCodec) -> Result<()> {
        if !self.write_mode {
            return Err(Error::WriteOnReadOnly);
        }
        if let Some(block) = &self.write_block {
            if !block.good_to_write(&key) {
                self.seal_write_block()?;
            }
        }
        if self.write_block.is_none() {
            let with_str = self.str_col.is_some();
            self.write_block = Some(self.block_codec.create_write_block(key, with_str));
        }
        self.write_block
            .as_mut()
            .expect("just created if absent")
            .add_record(key, record, codec)
    }

    fn seal_write_block(&mut self) -> Result<()> {
        let Some(block) = self.write_block.take() else {
            return Ok(());
        };
        let anchor = block.anchor_key();
        let (col0, col1) = block.finish_up()?;
        let mut values: Vec<(&ColumnHandle, Option<&[u8]>)> = vec![(&self.base_col, Some(&col0))];
        if let Some(str_col) = &self.str_col {
            values.push((str_col, col1.as_deref()));
        }
        self.kv.put_data(&anchor, &values)?;
        tracing::debug!(anchor = ?anchor, "sealed write block");
        Ok(())
    }

    /// Seals any open write block.
    pub fn flush(&mut self) -> Result<()> {
        self.seal_write_block()
    }

    /// Flushes, then closes the KV connection. Consumes the controller.
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        self.kv.close()
    }

    /// Looks up the record at `key`. `NotFound` (no key at or past the query
    /// in the engine) surfaces as `Ok(None)`, matching §7's error policy.
    pub fn get_record(&self, key: Key, codec: &dyn RecordCodec) -> Result<Option<Record>> {
        if self.write_mode {
            return Err(Error::ReadOnWriteOnly);
        }

        if let Some(block) = self.read_cache.lock().find_and_promote(&key) {
            return block.get_record(&key, codec);
        }

        let source = KvBlockSource {
            kv: &self.kv,
            base_col: &self.base_col,
            str_col: self.str_col.as_ref(),
        };
        let block: Arc<dyn ReadBlock> = match self.block_codec.create_read_block(&source, key) {
            Ok(block) => Arc::from(block),
            Err(Error::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };

        self.read_cache.lock().insert_front_and_evict(block.clone());
        block.get_record(&key, codec)
    }

    /// Encodes then immediately decodes `record`, touching neither the write
    /// block nor the KV engine. A round-trip sanity helper.
    pub fn transform_record(&self, record: &Record, codec: &dyn RecordCodec) -> Result<Record> {
        let mut env = EncodeEnv::new(self.str_col.is_some());
        env.put(record, codec)?;
        let cols = env.result();
        let decode = DecodeEnv::from_columns(&cols.col0, cols.col1.as_deref());
        decode.get(0, codec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemKv;
    use crate::record::{JsonRecordCodec, Variant};
    use serde_json::json;

    fn descriptor(cache_size: usize) -> IoDescriptor {
        let mut values = HashMap::new();
        values.insert("block-type".to_string(), "range".to_string());
        values.insert("range-span".to_string(), "100".to_string());
        values.insert("cache-size".to_string(), cache_size.to_string());
        IoDescriptor::new(values)
    }

    fn variant(i: u32) -> Record {
        vec![Variant {
            fields: json!({"i": i}).as_object().unwrap().clone(),
            facets: vec![],
        }]
    }

    fn open_write(kv: MemKv, cache_size: usize) -> IOController<MemKv> {
        IOController::open(
            kv,
            "dbnsfp",
            true,
            KeyCodec::new(&genanno_key::HG38),
            false,
            descriptor(cache_size),
        )
        .unwrap()
    }

    #[test]
    fn unconsumed_option_is_a_config_error() {
        let mut values = HashMap::new();
        values.insert("block-type".to_string(), "range".to_string());
        values.insert("bogus".to_string(), "1".to_string());
        let result = IOController::open(
            MemKv::new(),
            "dbnsfp",
            true,
            KeyCodec::new(&genanno_key::HG38),
            false,
            IoDescriptor::new(values),
        );
        assert!(matches!(result, Err(Error::UnconsumedOption(ref k)) if k == "bogus"));
    }

    #[test]
    fn unknown_block_type_is_a_config_error() {
        let mut values = HashMap::new();
        values.insert("block-type".to_string(), "unknown".to_string());
        let result = IOController::open(
            MemKv::new(),
            "dbnsfp",
            true,
            KeyCodec::new(&genanno_key::HG38),
            false,
            IoDescriptor::new(values),
        );
        assert!(matches!(result, Err(Error::UnknownBlockType(_))));
    }

    #[test]
    fn write_then_read_round_trips_through_a_sealed_block() {
        let kv = MemKv::new();
        let codec = JsonRecordCodec;
        let mut writer = open_write(kv, 3);
        for k in [10u32, 42, 99] {
            writer
                .put_record(k.to_be_bytes(), &variant(k), &codec)
                .unwrap();
        }
        writer.flush().unwrap();
        let IOController { kv, .. } = writer;

        let reader = IOController::open(
            kv,
            "dbnsfp",
            false,
            KeyCodec::new(&genanno_key::HG38),
            false,
            descriptor(3),
        )
        .unwrap();
        assert_eq!(
            reader.get_record(42u32.to_be_bytes(), &codec).unwrap(),
            Some(variant(42))
        );
        assert_eq!(reader.get_record(100u32.to_be_bytes(), &codec).unwrap(), None);
    }

    #[test]
    fn read_on_write_only_schema_is_rejected() {
        let writer = open_write(MemKv::new(), 3);
        assert!(matches!(
            writer.get_record(10u32.to_be_bytes(), &JsonRecordCodec),
            Err(Error::ReadOnWriteOnly)
        ));
    }

    #[test]
    fn write_on_read_only_schema_is_rejected() {
        let mut reader = IOController::open(
            MemKv::new(),
            "dbnsfp",
            false,
            KeyCodec::new(&genanno_key::HG38),
            false,
            descriptor(3),
        )
        .unwrap();
        assert!(matches!(
            reader.put_record(10u32.to_be_bytes(), &variant(1), &JsonRecordCodec),
            Err(Error::WriteOnReadOnly)
        ));
    }

    #[test]
    fn transform_record_round_trips_without_touching_the_engine() {
        let controller = open_write(MemKv::new(), 3);
        let record = variant(7);
        let got = controller
            .transform_record(&record, &JsonRecordCodec)
            .unwrap();
        assert_eq!(got, record);
    }

    #[test]
    fn cache_bound_is_respected_and_mru_promotes_on_hit() {
        let kv = MemKv::new();
        let codec = JsonRecordCodec;
        let mut writer = open_write(kv, 2);
        // Three disjoint range blocks, span 100: anchors 0, 100, 200.
        for base in [0u32, 100, 200] {
            writer
                .put_record(base.to_be_bytes(), &variant(base), &codec)
                .unwrap();
            writer.flush().unwrap();
        }
        let IOController { kv, .. } = writer;
        let reader = IOController::open(
            kv,
            "dbnsfp",
            false,
            KeyCodec::new(&genanno_key::HG38),
            false,
            descriptor(2),
        )
        .unwrap();

        reader.get_record(0u32.to_be_bytes(), &codec).unwrap();
        reader.get_record(100u32.to_be_bytes(), &codec).unwrap();
        assert_eq!(reader.read_cache.lock().len(), 2);

        reader.get_record(200u32.to_be_bytes(), &codec).unwrap();
        assert_eq!(reader.read_cache.lock().len(), 2, "bound of 2 stays respected");

        // Promote the 0-anchored block back to front, then insert a fresh
        // miss; the 100-anchored block (now least-recently-used) is evicted,
        // not the just-promoted 0-anchored one.
        reader.get_record(0u32.to_be_bytes(), &codec).unwrap();
        assert!(reader
            .read_cache
            .lock()
            .entries
            .first()
            .unwrap()
            .good_to_read(&0u32.to_be_bytes()));
    }

    proptest::proptest! {
        #[test]
        fn prop_read_cache_never_exceeds_its_bound(
            bound in 1usize..5,
            num_blocks in 1usize..6,
            reads in proptest::collection::vec(0usize..6, 1..20),
        ) {
            let kv = MemKv::new();
            let codec = JsonRecordCodec;
            let mut writer = open_write(kv, bound);
            for i in 0..num_blocks {
                let base = (i as u32) * 100;
                writer.put_record(base.to_be_bytes(), &variant(base), &codec).unwrap();
                writer.flush().unwrap();
            }
            let IOController { kv, .. } = writer;
            let reader = IOController::open(
                kv,
                "dbnsfp",
                false,
                KeyCodec::new(&genanno_key::HG38),
                false,
                descriptor(bound),
            )
            .unwrap();

            for idx in reads {
                let base = ((idx % num_blocks) as u32) * 100;
                let _ = reader.get_record(base.to_be_bytes(), &codec);
                proptest::prop_assert!(reader.read_cache.lock().len() <= bound);
            }
        }

        #[test]
        fn prop_mru_hit_promotes_block_to_front(
            bound in 2usize..5,
            num_blocks in 2usize..6,
        ) {
            let kv = MemKv::new();
            let codec = JsonRecordCodec;
            let mut writer = open_write(kv, bound);
            for i in 0..num_blocks {
                let base = (i as u32) * 100;
                writer.put_record(base.to_be_bytes(), &variant(base), &codec).unwrap();
                writer.flush().unwrap();
            }
            let IOController { kv, .. } = writer;
            let reader = IOController::open(
                kv,
                "dbnsfp",
                false,
                KeyCodec::new(&genanno_key::HG38),
                false,
                descriptor(bound),
            )
            .unwrap();

            // Fill the cache, then re-hit the first block; it must come back to front.
            for i in 0..num_blocks.min(bound) {
                let base = (i as u32) * 100;
                reader.get_record(base.to_be_bytes(), &codec).unwrap();
            }
            reader.get_record(0u32.to_be_bytes(), &codec).unwrap();
            proptest::prop_assert!(reader
                .read_cache
                .lock()
                .entries
                .first()
                .unwrap()
                .good_to_read(&0u32.to_be_bytes()));
        }
    }
}
