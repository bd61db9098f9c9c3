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

//! The record shape produced by ingest and consumed by the block codec: a
//! list of variants, each carrying nested facets and per-facet transcripts.

use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::error::{Error, Result};

pub type Fields = Map<String, serde_json::Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(flatten)]
    pub fields: Fields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Facet {
    #[serde(flatten)]
    pub fields: Fields,
    #[serde(default)]
    pub transcripts: Vec<Transcript>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    #[serde(flatten)]
    pub fields: Fields,
    #[serde(default)]
    pub facets: Vec<Facet>,
}

/// A record for one key: a list of variants. The empty list is the null
/// record that an empty frame decodes to.
pub type Record = Vec<Variant>;

/// A pluggable (de)serialization strategy from a `Record` to an opaque frame.
/// Frames must never contain a raw NUL byte (`\0` is the reserved
/// inter-frame/inter-string separator used by [`crate::env::EncodeEnv`]).
pub trait RecordCodec: Send + Sync {
    fn encode(&self, record: &Record) -> Result<Vec<u8>>;
    fn decode(&self, frame: &[u8]) -> Result<Record>;
}

/// The reference record codec: one JSON object frame per record.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRecordCodec;

impl RecordCodec for JsonRecordCodec {
    fn encode(&self, record: &Record) -> Result<Vec<u8>> {
        let bytes = serde_json::to_vec(record)?;
        if bytes.contains(&0u8) {
            return Err(Error::ReservedNulInFrame);
        }
        Ok(bytes)
    }

    fn decode(&self, frame: &[u8]) -> Result<Record> {
        if frame.is_empty() {
            return Ok(Record::default());
        }
        Ok(serde_json::from_slice(frame)?)
    }
}
