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

//! Parses DBNSFP4 per-chromosome annotation shards into the ordered record
//! stream the storage core consumes.

mod error;
mod filename;
mod reader;
mod schema;

pub use error::{Error, Result};
pub use filename::detect_chrom;
pub use reader::{IngestReader, ShardReport};
pub use schema::{canonicalize, FieldGroup, FieldLayout, FieldSpec, ResolvedField, ValueType, REFERENCE_FIELDS};
