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

//! Pluggable block-codec policy surface, and the canonical range block.

use crate::env::{DecodeEnv, EncodeEnv};
use crate::error::{Error, Result};
use crate::record::{Record, RecordCodec};

pub type Key = [u8; 4];

fn addr(key: &Key) -> u32 {
    u32::from_be_bytes(*key)
}

/// An in-memory accumulator for one not-yet-sealed block.
pub trait WriteBlock: Send {
    fn anchor_key(&self) -> Key;
    /// Membership policy: must be monotone in key order.
    fn good_to_write(&self, key: &Key) -> bool;
    fn add_record(&mut self, key: Key, record: &Record, codec: &dyn RecordCodec) -> Result<()>;
    /// Seals the block, returning the columns to persist at the anchor key.
    fn finish_up(self: Box<Self>) -> Result<(Vec<u8>, Option<Vec<u8>>)>;
}

/// A decoded block retrieved by forward-seek from a query key.
pub trait ReadBlock: Send + Sync {
    fn good_to_read(&self, key: &Key) -> bool;
    fn get_record(&self, key: &Key, codec: &dyn RecordCodec) -> Result<Option<Record>>;
}

/// Columns fetched by a forward-seek, ready to be wrapped into a read block.
pub struct SeekResult {
    pub anchor_key: Key,
    pub col0: Vec<u8>,
    pub col1: Option<Vec<u8>>,
}

/// Something that can forward-seek in the KV engine's column 0 and fetch the
/// matching column 1 payload, without the block codec needing to know the
/// concrete KV engine type.
pub trait BlockSource {
    fn seek(&self, query_key: Key) -> Result<Option<SeekResult>>;
}

/// A pluggable block-type policy, identified by `block-type`.
pub trait BlockCodec: Send + Sync {
    fn block_type(&self) -> &'static str;
    fn create_write_block(&self, first_key: Key, with_str: bool) -> Box<dyn WriteBlock>;
    fn create_read_block(
        &self,
        source: &dyn BlockSource,
        query_key: Key,
    ) -> Result<Box<dyn ReadBlock>>;
}

/// `first_key <= key < first_key + span`; span is carried in the block
/// header (frame 0). Records sharing a key are fused into one frame via the
/// record codec (decode, extend, re-encode).
pub struct RangeBlockCodec {
    span: u32,
}

impl RangeBlockCodec {
    pub fn new(span: u32) -> Self {
        Self { span }
    }
}

// The header is frame 0, sharing the NUL-joined object column with every
// other frame, so it must be textual (no embedded NUL) like any other frame
// rather than raw big-endian bytes. `span:delta,delta,...`.
fn encode_header(span: u32, anchor: u32, keys: &[Key]) -> Vec<u8> {
    let deltas: Vec<String> = keys
        .iter()
        .map(|k| addr(k).wrapping_sub(anchor).to_string())
        .collect();
    format!("{}:{}", span, deltas.join(",")).into_bytes()
}

fn decode_header(anchor: u32, frame: &[u8]) -> Result<(u32, Vec<Key>)> {
    let text = std::str::from_utf8(frame)
        .map_err(|_| Error::Engine("non-utf8 range block header".to_string()))?;
    let (span_str, rest) = text
        .split_once(':')
        .ok_or_else(|| Error::Engine("malformed range block header".to_string()))?;
    let span: u32 = span_str
        .parse()
        .map_err(|_| Error::Engine("malformed range block header span".to_string()))?;
    let keys = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(',')
            .map(|d| {
                d.parse::<u32>()
                    .map(|delta| anchor.wrapping_add(delta).to_be_bytes())
                    .map_err(|_| Error::Engine("malformed range block header delta".to_string()))
            })
            .collect::<Result<Vec<_>>>()?
    };
    Ok((span, keys))
}

struct RangeWriteBlock {
    anchor: Key,
    span: u32,
    env: EncodeEnv,
    keys: Vec<Key>,
}

impl WriteBlock for RangeWriteBlock {
    fn anchor_key(&self) -> Key {
        self.anchor
    }

    fn good_to_write(&self, key: &Key) -> bool {
        let anchor = addr(&self.anchor) as u64;
        let span = self.span as u64;
        let k = addr(key) as u64;
        k >= anchor && k < anchor + span
    }

    fn add_record(&mut self, key: Key, record: &Record, codec: &dyn RecordCodec) -> Result<()> {
        if let Some(&last) = self.keys.last() {
            if last == key {
                let last_idx = self.keys.len(); // header occupies index 0
                let mut existing = self.env_get(last_idx, codec)?;
                existing.extend(record.iter().cloned());
                self.env.set_frame(last_idx, codec.encode(&existing)?)?;
                return Ok(());
            }
        }
        self.env.put(record, codec)?;
        self.keys.push(key);
        Ok(())
    }

    fn finish_up(mut self: Box<Self>) -> Result<(Vec<u8>, Option<Vec<u8>>)> {
        let header = encode_header(self.span, addr(&self.anchor), &self.keys);
        self.env.set_frame(0, header)?;
        let cols = self.env.result();
        Ok((cols.col0, cols.col1))
    }
}

impl RangeWriteBlock {
    fn env_get(&self, index: usize, codec: &dyn RecordCodec) -> Result<Record> {
        // Frames aren't decodable from EncodeEnv directly; re-derive via a
        // throwaway DecodeEnv over the object column built so far.
        let cols_preview = self.env.preview_col0();
        let decode = DecodeEnv::from_columns(&cols_preview, None);
        decode.get(index, codec)
    }
}

struct RangeReadBlock {
    anchor: Key,
    span: u32,
    keys: Vec<Key>,
    decode: DecodeEnv,
}

impl ReadBlock for RangeReadBlock {
    fn good_to_read(&self, key: &Key) -> bool {
        let anchor = addr(&self.anchor) as u64;
        let span = self.span as u64;
        let k = addr(key) as u64;
        k >= anchor && k < anchor + span
    }

    fn get_record(&self, key: &Key, codec: &dyn RecordCodec) -> Result<Option<Record>> {
        match self.keys.binary_search(key) {
            Ok(pos) => Ok(Some(self.decode.get(pos + 1, codec)?)),
            Err(_) => Ok(None),
        }
    }
}

impl BlockCodec for RangeBlockCodec {
    fn block_type(&self) -> &'static str {
        "range"
    }

    fn create_write_block(&self, first_key: Key, with_str: bool) -> Box<dyn WriteBlock> {
        let mut env = EncodeEnv::new(with_str);
        // Reserve frame 0 for the header; real span/keys spliced in at finish_up.
        env.set_frame(0, Vec::new()).expect("placeholder header");
        Box::new(RangeWriteBlock {
            anchor: first_key,
            span: self.span,
            env,
            keys: Vec::new(),
        })
    }

    fn create_read_block(
        &self,
        source: &dyn BlockSource,
        query_key: Key,
    ) -> Result<Box<dyn ReadBlock>> {
        let seek = source.seek(query_key)?.ok_or(Error::NotFound)?;
        let decode = DecodeEnv::from_columns(&seek.col0, seek.col1.as_deref());
        let header = decode.get_value_str(0)?;
        let (span, keys) = decode_header(addr(&seek.anchor_key), header)?;
        Ok(Box::new(RangeReadBlock {
            anchor: seek.anchor_key,
            span,
            keys,
            decode,
        }))
    }
}
