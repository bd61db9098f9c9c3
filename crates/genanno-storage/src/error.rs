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
    #[error("string column is disabled on this encode environment")]
    StringColumnDisabled,

    #[error("decode environment has no string column")]
    NoStringColumn,

    #[error("frame index {0} out of range (len {1})")]
    FrameIndexOutOfRange(usize, usize),

    #[error("record frame contains a reserved NUL byte")]
    ReservedNulInFrame,

    #[error("record codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("unknown block-type {0:?}")]
    UnknownBlockType(String),

    #[error("config error: unconsumed option {0:?}")]
    UnconsumedOption(String),

    #[error("config error: missing option {0:?}")]
    MissingOption(&'static str),

    #[error("no key >= seek key was found")]
    NotFound,

    #[error("write attempted on a read-only schema")]
    WriteOnReadOnly,

    #[error("read attempted on a write-only schema")]
    ReadOnWriteOnly,

    #[error("key codec error: {0}")]
    Key(#[from] genanno_key::Error),

    #[error("storage engine error: {0}")]
    Engine(String),
}
