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

//! DBNSFP4 shard reader: parses one gzip-compressed, tab-separated
//! per-chromosome annotation file into `(key, [Record])` pairs consumed by
//! [`genanno_merge::JoinedReader`].

use std::fs::File;
use std::io::{BufRead, BufReader};

use flate2::read::GzDecoder;
use genanno_key::KeyCodec;
use genanno_merge::SubReader;
use genanno_storage::record::{Facet, Fields, Transcript, Variant};
use genanno_storage::{Key, Record};

use crate::error::{Error, Result};
use crate::schema::{parse_value, FieldLayout, ResolvedField};

/// End-of-shard totals, reported by the CLI the way the original
/// implementation logs its per-file summary on EOF.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShardReport {
    pub yielded: u64,
    pub skipped_rows: u64,
}

struct ParsedRow {
    key: Key,
    variant_identity: Vec<String>,
    variant_fields: Fields,
    facet_fields: Fields,
    transcripts: Vec<Transcript>,
}

fn take_field(fields: &mut Fields, name: &'static str, value: serde_json::Value) {
    fields.insert(name.to_string(), value);
}

fn build_fields(cols: &[&str], resolved: &[ResolvedField]) -> Option<Fields> {
    let mut out = Fields::new();
    for field in resolved {
        let raw = cols.get(field.index)?;
        take_field(&mut out, field.name, parse_value(raw, field.value_type));
    }
    Some(out)
}

fn build_transcripts(cols: &[&str], resolved: &[ResolvedField]) -> Option<Vec<Transcript>> {
    let split_per_col: Vec<Vec<&str>> = resolved
        .iter()
        .map(|field| cols.get(field.index).map(|s| s.split(';').collect()))
        .collect::<Option<Vec<_>>>()?;
    let count = split_per_col.iter().map(Vec::len).max().unwrap_or(0);
    Some(
        (0..count)
            .map(|i| {
                let mut fields = Fields::new();
                for (col_idx, field) in resolved.iter().enumerate() {
                    let raw = split_per_col[col_idx].get(i).copied().unwrap_or(".");
                    take_field(&mut fields, field.name, parse_value(raw, field.value_type));
                }
                Transcript { fields }
            })
            .collect(),
    )
}

/// Parses one per-chromosome DBNSFP4 shard, gzip-compressed and
/// tab-separated, into an ordered `(key, Record)` stream keyed by
/// `(chrom, pos)`. Implements [`SubReader`] so it plugs directly into the
/// k-way merge.
pub struct IngestReader {
    lines: std::io::Lines<BufReader<GzDecoder<File>>>,
    layout: FieldLayout,
    key_codec: KeyCodec,
    next_row: Option<ParsedRow>,
    current: Option<(Key, Vec<Variant>, Vec<String>)>,
    report: ShardReport,
}

impl IngestReader {
    /// Opens `path`, validates the header's first two columns are
    /// `chr*`/`pos*`, and resolves the declared field layout.
    pub fn open(path: &std::path::Path, key_codec: KeyCodec) -> Result<Self> {
        let file = File::open(path)?;
        let decoder = GzDecoder::new(file);
        let mut lines = BufReader::new(decoder).lines();

        let header_line = lines
            .next()
            .ok_or_else(|| Error::BadHeaderColumn(0, "chr*", "<empty file>".to_string()))??;
        let header_line = header_line.trim_start_matches('#');
        let header_cols: Vec<&str> = header_line.split('\t').collect();

        let col0 = header_cols
            .first()
            .copied()
            .unwrap_or("")
            .to_ascii_lowercase();
        if !col0.starts_with("chr") {
            return Err(Error::BadHeaderColumn(0, "chr*", col0));
        }
        let col1 = header_cols
            .get(1)
            .copied()
            .unwrap_or("")
            .to_ascii_lowercase();
        if !col1.starts_with("pos") {
            return Err(Error::BadHeaderColumn(1, "pos*", col1));
        }

        let layout = FieldLayout::resolve(&header_cols)?;

        let mut reader = Self {
            lines,
            layout,
            key_codec,
            next_row: None,
            current: None,
            report: ShardReport::default(),
        };
        reader.next_row = reader.read_row()?;
        Ok(reader)
    }

    pub fn report(&self) -> ShardReport {
        self.report
    }

    fn read_row(&mut self) -> Result<Option<ParsedRow>> {
        loop {
            let Some(line) = self.lines.next() else {
                return Ok(None);
            };
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let cols: Vec<&str> = line.split('\t').collect();

            let Some(chrom_raw) = cols.first() else {
                self.report.skipped_rows += 1;
                continue;
            };
            let Some(pos_raw) = cols.get(1) else {
                self.report.skipped_rows += 1;
                continue;
            };
            let Ok(pos) = pos_raw.parse::<u32>() else {
                self.report.skipped_rows += 1;
                continue;
            };
            let chrom = format!("chr{chrom_raw}");
            let key = match self.key_codec.encode(&chrom, pos) {
                Ok(key) => key,
                Err(_) => {
                    self.report.skipped_rows += 1;
                    continue;
                }
            };

            let Some(variant_fields) = build_fields(&cols, &self.layout.variant) else {
                self.report.skipped_rows += 1;
                continue;
            };
            let Some(facet_fields) = build_fields(&cols, &self.layout.facet) else {
                self.report.skipped_rows += 1;
                continue;
            };
            let Some(transcripts) = build_transcripts(&cols, &self.layout.transcript) else {
                self.report.skipped_rows += 1;
                continue;
            };
            let variant_identity: Vec<String> = self
                .layout
                .variant
                .iter()
                .filter_map(|f| cols.get(f.index).map(|s| s.to_string()))
                .collect();

            return Ok(Some(ParsedRow {
                key,
                variant_identity,
                variant_fields,
                facet_fields,
                transcripts,
            }));
        }
    }

    fn facet_from(row: &ParsedRow) -> Facet {
        Facet {
            fields: row.facet_fields.clone(),
            transcripts: row.transcripts.clone(),
        }
    }

    fn variant_from(row: &ParsedRow) -> Variant {
        Variant {
            fields: row.variant_fields.clone(),
            facets: vec![Self::facet_from(row)],
        }
    }
}

impl SubReader for IngestReader {
    fn next_one(&mut self) -> anyhow::Result<Option<(Key, Vec<Record>)>> {
        loop {
            let Some(row) = self.next_row.take() else {
                let completed = self.current.take();
                if completed.is_some() {
                    self.report.yielded += 1;
                }
                return Ok(completed.map(|(key, variants, _)| (key, vec![variants])));
            };
            self.next_row = self.read_row()?;

            match &mut self.current {
                None => {
                    let identity = row.variant_identity.clone();
                    self.current = Some((row.key, vec![Self::variant_from(&row)], identity));
                }
                Some((cur_key, variants, last_identity)) if *cur_key == row.key => {
                    if *last_identity == row.variant_identity {
                        variants
                            .last_mut()
                            .expect("a started record always has a variant")
                            .facets
                            .push(Self::facet_from(&row));
                    } else {
                        *last_identity = row.variant_identity.clone();
                        variants.push(Self::variant_from(&row));
                    }
                }
                Some(_) => {
                    let completed = self.current.take().expect("checked Some above");
                    let identity = row.variant_identity.clone();
                    self.current = Some((row.key, vec![Self::variant_from(&row)], identity));
                    self.report.yielded += 1;
                    return Ok(Some((completed.0, vec![completed.1])));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn write_shard(rows: &[&str]) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut encoder = GzEncoder::new(file.reopen().unwrap(), Compression::default());
        for row in rows {
            writeln!(encoder, "{row}").unwrap();
        }
        encoder.finish().unwrap();
        file
    }

    const HEADER: &str = "#chr\tpos(1-based)\tref\talt\taaref\taaalt\tSIFT_score\tPolyphen2_HDIV_score\tCADD_raw\tEigen_pred_coding\tclinvar_clnsig\tEnsembl_geneid\tEnsembl_transcriptid\tgenename";

    #[test]
    fn groups_rows_by_key_and_yields_on_key_advance() {
        let mut rows = vec![HEADER.to_string()];
        rows.push("1\t100\tA\tG\tA\tV\t0.1\t0.2\t1.0\t0.3\tbenign\tENSG1\tENST1;ENST2\tGENEA;GENEB".to_string());
        rows.push("1\t200\tC\tT\tL\tP\t0.5\t0.6\t2.0\t0.4\tpathogenic\tENSG2\tENST3\tGENEC".to_string());
        let row_refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let shard = write_shard(&row_refs);

        let mut reader = IngestReader::open(shard.path(), KeyCodec::new(&genanno_key::HG38)).unwrap();
        let (key, records) = reader.next_one().unwrap().unwrap();
        assert_eq!(reader.key_codec.decode(&key).unwrap(), ("chr1", 100));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].len(), 1);
        assert_eq!(records[0][0].facets[0].transcripts.len(), 2);

        let (key2, records2) = reader.next_one().unwrap().unwrap();
        assert_eq!(reader.key_codec.decode(&key2).unwrap(), ("chr1", 200));
        assert_eq!(records2[0].len(), 1);

        assert!(reader.next_one().unwrap().is_none());
    }

    #[test]
    fn new_variant_identity_starts_a_new_variant_same_identity_appends_facet() {
        let mut rows = vec![HEADER.to_string()];
        // Two rows at (chr1,100) with different ALT -> two variants.
        rows.push("1\t100\tA\tG\tA\tV\t0.1\t0.2\t1.0\t0.3\tbenign\tENSG1\tENST1\tGENEA".to_string());
        rows.push("1\t100\tA\tC\tA\tV\t0.1\t0.2\t1.0\t0.3\tbenign\tENSG1\tENST1\tGENEA".to_string());
        // Third row, same variant tuple as the second -> appends a facet to variant 2.
        rows.push("1\t100\tA\tC\tA\tV\t0.9\t0.9\t9.0\t0.9\tbenign\tENSG1\tENST1\tGENEA".to_string());
        let row_refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let shard = write_shard(&row_refs);

        let mut reader = IngestReader::open(shard.path(), KeyCodec::new(&genanno_key::HG38)).unwrap();
        let (_, records) = reader.next_one().unwrap().unwrap();
        assert_eq!(records[0].len(), 2, "two distinct variants at the same key");
        assert_eq!(records[0][0].facets.len(), 1);
        assert_eq!(records[0][1].facets.len(), 2, "third row appended to variant 2");
    }

    #[test]
    fn missing_value_dot_decodes_to_null() {
        let mut rows = vec![HEADER.to_string()];
        rows.push("1\t100\tA\tG\tA\tV\t.\t0.2\t1.0\t0.3\t.\tENSG1\tENST1\tGENEA".to_string());
        let row_refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let shard = write_shard(&row_refs);

        let mut reader = IngestReader::open(shard.path(), KeyCodec::new(&genanno_key::HG38)).unwrap();
        let (_, records) = reader.next_one().unwrap().unwrap();
        let facet = &records[0][0].facets[0];
        assert_eq!(facet.fields["SIFT_score"], serde_json::Value::Null);
        assert_eq!(facet.fields["clinvar_clnsig"], serde_json::Value::Null);
    }

    #[test]
    fn eof_flush_counts_the_final_record_as_yielded() {
        let mut rows = vec![HEADER.to_string()];
        rows.push("1\t100\tA\tG\tA\tV\t0.1\t0.2\t1.0\t0.3\tbenign\tENSG1\tENST1\tGENEA".to_string());
        let row_refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let shard = write_shard(&row_refs);

        let mut reader = IngestReader::open(shard.path(), KeyCodec::new(&genanno_key::HG38)).unwrap();
        assert!(reader.next_one().unwrap().is_some());
        assert!(reader.next_one().unwrap().is_none());
        assert_eq!(reader.report().yielded, 1);
    }

    #[test]
    fn short_row_is_skipped_and_counted_not_fatal() {
        let mut rows = vec![HEADER.to_string()];
        rows.push("1\t100\tA".to_string()); // far too short
        rows.push("1\t200\tC\tT\tL\tP\t0.5\t0.6\t2.0\t0.4\tpathogenic\tENSG2\tENST3\tGENEC".to_string());
        let row_refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let shard = write_shard(&row_refs);

        let mut reader = IngestReader::open(shard.path(), KeyCodec::new(&genanno_key::HG38)).unwrap();
        let (key, _) = reader.next_one().unwrap().unwrap();
        assert_eq!(reader.key_codec.decode(&key).unwrap(), ("chr1", 200));
        assert_eq!(reader.report().skipped_rows, 1);
    }

    #[test]
    fn bad_header_first_column_is_rejected() {
        let mut rows = vec!["#nope\tpos\tref\talt\taaref\taaalt\tSIFT_score\tPolyphen2_HDIV_score\tCADD_raw\tEigen_pred_coding\tclinvar_clnsig\tEnsembl_geneid\tEnsembl_transcriptid\tgenename".to_string()];
        rows.push("1\t100\tA\tG\tA\tV\t0.1\t0.2\t1.0\t0.3\tbenign\tENSG1\tENST1\tGENEA".to_string());
        let row_refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let shard = write_shard(&row_refs);
        let result = IngestReader::open(shard.path(), KeyCodec::new(&genanno_key::HG38));
        assert!(matches!(result, Err(Error::BadHeaderColumn(0, _, _))));
    }
}
