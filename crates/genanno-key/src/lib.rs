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

//! Genomic key codec: maps `(chromosome, position)` to a dense, sort-preserving
//! 32-bit big-endian address under a named reference build.

mod build;
mod error;

pub use build::{by_name, Build, Chrom, HG19, HG38};
pub use error::{Error, Result};

/// Encodes and decodes `(chrom, pos)` pairs against one reference build.
///
/// Byte order on encoded keys equals `(chrom_index, pos)` order: the codec's
/// whole purpose is to make that hold for every valid input.
#[derive(Debug, Clone, Copy)]
pub struct KeyCodec {
    build: &'static Build,
}

impl KeyCodec {
    pub fn new(build: &'static Build) -> Self {
        Self { build }
    }

    pub fn for_build_name(name: &str) -> Option<Self> {
        by_name(name).map(Self::new)
    }

    pub fn build(&self) -> &'static Build {
        self.build
    }

    /// Encodes `(chrom, pos)` as 4 big-endian bytes. Does not bounds-check
    /// `pos` against the chromosome's `real_length`; an out-of-range `pos`
    /// yields a well-defined but biologically meaningless address as long as
    /// it stays within `bound_length`.
    pub fn encode(&self, chrom: &str, pos: u32) -> Result<[u8; 4]> {
        let idx = self
            .build
            .find(chrom)
            .ok_or_else(|| Error::UnknownChromosome(chrom.to_string(), self.build.name))?;
        let addr = self.build.chroms[idx].start.wrapping_add(pos);
        Ok(addr.to_be_bytes())
    }

    /// Decodes 4 big-endian bytes back to `(chrom, pos)`.
    pub fn decode(&self, bytes: &[u8; 4]) -> Result<(&'static str, u32)> {
        let addr = u32::from_be_bytes(*bytes);
        let idx = self
            .build
            .locate(addr)
            .ok_or(Error::KeyOutOfRange(addr, self.build.name))?;
        let chrom = &self.build.chroms[idx];
        Ok((chrom.name, addr - chrom.start))
    }
}
