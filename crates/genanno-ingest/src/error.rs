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

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("dbNSFP4 header column {0} must look like {1:?} (got {2:?})")]
    BadHeaderColumn(usize, &'static str, String),

    #[error("declared field {0:?} not found in header; available fields: {1:?}")]
    SchemaFieldMissing(String, Vec<String>),

    #[error("could not detect a chromosome token in filename {0:?}")]
    ChromDetectionFailed(String),

    #[error("key codec error: {0}")]
    Key(#[from] genanno_key::Error),

    #[error("storage error: {0}")]
    Storage(#[from] genanno_storage::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
