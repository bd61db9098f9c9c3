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

//! Block codec, encode/decode environment, and the storage stream
//! (`IOController`) that batches records into blocks at write time and
//! serves point lookups through a cached decoding pipeline at read time.

pub mod block;
pub mod env;
mod error;
pub mod io;
pub mod kv;
pub mod record;

pub use block::{BlockCodec, BlockSource, Key, RangeBlockCodec, ReadBlock, SeekResult, WriteBlock};
pub use env::{DecodeEnv, EncodeEnv, EncodedColumns};
pub use error::{Error, Result};
pub use io::{IOController, IoDescriptor};
pub use kv::{ColumnHandle, KvEngine, MemKv, RocksKv};
pub use record::{Facet, Fields, JsonRecordCodec, Record, RecordCodec, Transcript, Variant};
