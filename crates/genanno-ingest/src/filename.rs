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

//! Chromosome-from-filename detection for the ingest CLI's per-shard glob
//! expansion (`spec.md` §6).

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Error, Result};

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\bchr[_.]?(1[0-9]|2[0-2]|[1-9]|[mxy])\b").expect("static regex is valid")
    })
}

/// Detects the `chrN`/`chrM`/`chrX`/`chrY` token in a shard filename (case
/// insensitive, on a word boundary either side of a `chr` hint). Fails with
/// `ChromDetectionFailed` if no such token is present.
pub fn detect_chrom(filename: &str) -> Result<String> {
    let caps = pattern()
        .captures(filename)
        .ok_or_else(|| Error::ChromDetectionFailed(filename.to_string()))?;
    let token = caps.get(1).expect("group 1 always matches").as_str();
    Ok(format!("chr{}", token.to_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_numeric_autosome() {
        assert_eq!(
            detect_chrom("dbNSFP4.3a_variant.chr17.gz").unwrap(),
            "chr17"
        );
    }

    #[test]
    fn detects_mitochondrial_case_insensitively() {
        assert_eq!(detect_chrom("shard.CHRM.tsv.gz").unwrap(), "chrM");
    }

    #[test]
    fn detects_x_and_y() {
        assert_eq!(detect_chrom("anno.chrX.gz").unwrap(), "chrX");
        assert_eq!(detect_chrom("anno.chrY.gz").unwrap(), "chrY");
    }

    #[test]
    fn rejects_out_of_range_token() {
        assert!(detect_chrom("anno.chr23.gz").is_err());
    }

    #[test]
    fn fails_without_any_chrom_hint() {
        assert!(detect_chrom("dbnsfp_annotations.gz").is_err());
    }
}
