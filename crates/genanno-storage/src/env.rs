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

//! Two-column encode/decode environment: an object-frame column (`base`) and
//! an optional string-intern column (`str`), both `\0`-joined.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::record::{Record, RecordCodec};

const SEP: u8 = 0;

/// Columns produced by [`EncodeEnv::result`]: always `col0`, plus `col1` iff
/// the environment was constructed `with_str`.
pub struct EncodedColumns {
    pub col0: Vec<u8>,
    pub col1: Option<Vec<u8>>,
}

/// Accumulates object frames (and, optionally, interned strings) for one
/// key's payload.
pub struct EncodeEnv {
    with_str: bool,
    frames: Vec<Vec<u8>>,
    strings: Vec<String>,
    dict: HashMap<String, usize>,
}

impl EncodeEnv {
    pub fn new(with_str: bool) -> Self {
        Self {
            with_str,
            frames: Vec::new(),
            strings: Vec::new(),
            dict: HashMap::new(),
        }
    }

    pub fn with_str(&self) -> bool {
        self.with_str
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Interns `text`. If `repeatable` and `text` was already interned,
    /// returns the cached index; otherwise appends and, if `repeatable`,
    /// remembers the mapping.
    pub fn add_str(&mut self, text: &str, repeatable: bool) -> Result<usize> {
        if !self.with_str {
            return Err(Error::StringColumnDisabled);
        }
        if repeatable {
            if let Some(&idx) = self.dict.get(text) {
                return Ok(idx);
            }
        }
        let idx = self.strings.len();
        self.strings.push(text.to_string());
        if repeatable {
            self.dict.insert(text.to_string(), idx);
        }
        Ok(idx)
    }

    /// Delegates to `codec` to produce a frame, then appends it.
    pub fn put(&mut self, record: &Record, codec: &dyn RecordCodec) -> Result<()> {
        let frame = codec.encode(record)?;
        self.push_frame(frame)
    }

    /// Appends `s` directly as a frame (for codecs that pre-serialize).
    pub fn put_value_str(&mut self, s: impl Into<Vec<u8>>) -> Result<()> {
        self.push_frame(s.into())
    }

    fn push_frame(&mut self, frame: Vec<u8>) -> Result<()> {
        if frame.contains(&SEP) {
            return Err(Error::ReservedNulInFrame);
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Overwrites frame 0 in place (used by the range block codec to splice
    /// in its header after the span is known).
    pub fn set_frame(&mut self, index: usize, frame: Vec<u8>) -> Result<()> {
        if frame.contains(&SEP) {
            return Err(Error::ReservedNulInFrame);
        }
        if index >= self.frames.len() {
            self.frames.push(frame);
        } else {
            self.frames[index] = frame;
        }
        Ok(())
    }

    pub fn result(self) -> EncodedColumns {
        let col0 = join_with_nul(self.frames.iter().map(Vec::as_slice));
        let col1 = self
            .with_str
            .then(|| join_with_nul(self.strings.iter().map(String::as_bytes)));
        EncodedColumns { col0, col1 }
    }

    /// Snapshot of the object column as built so far, without consuming the
    /// environment. Used by block codecs that need to read back a frame
    /// they've already pushed (e.g. to fuse a repeated key).
    pub fn preview_col0(&self) -> Vec<u8> {
        join_with_nul(self.frames.iter().map(Vec::as_slice))
    }
}

fn join_with_nul<'a>(parts: impl Iterator<Item = &'a [u8]>) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, part) in parts.enumerate() {
        if i > 0 {
            out.push(SEP);
        }
        out.extend_from_slice(part);
    }
    out
}

/// Splits a one- or two-element column payload back into frames and an
/// optional string table.
pub struct DecodeEnv {
    frames: Vec<Vec<u8>>,
    strings: Option<Vec<String>>,
}

impl DecodeEnv {
    pub fn from_columns(col0: &[u8], col1: Option<&[u8]>) -> Self {
        let frames = if col0.is_empty() {
            Vec::new()
        } else {
            col0.split(|&b| b == SEP).map(|s| s.to_vec()).collect()
        };
        let strings = col1.map(|bytes| {
            if bytes.is_empty() {
                Vec::new()
            } else {
                bytes
                    .split(|&b| b == SEP)
                    .map(|s| String::from_utf8_lossy(s).into_owned())
                    .collect()
            }
        });
        Self { frames, strings }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get_str(&self, index: usize) -> Result<&str> {
        let strings = self.strings.as_ref().ok_or(Error::NoStringColumn)?;
        strings
            .get(index)
            .map(String::as_str)
            .ok_or(Error::FrameIndexOutOfRange(index, strings.len()))
    }

    pub fn get_value_str(&self, index: usize) -> Result<&[u8]> {
        self.frames
            .get(index)
            .map(Vec::as_slice)
            .ok_or(Error::FrameIndexOutOfRange(index, self.frames.len()))
    }

    pub fn get(&self, index: usize, codec: &dyn RecordCodec) -> Result<Record> {
        let frame = self.get_value_str(index)?;
        codec.decode(frame)
    }
}
