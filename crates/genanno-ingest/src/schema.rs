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

//! Per-file `FieldLayout`: a header-to-index binding resolved once per shard
//! and consumed by a stateless row parser, replacing the original
//! implementation's module-level mutable field tables (see `spec.md` §9's
//! "Global mutable header tables in ingest" design note).

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{Error, Result};

/// Which of the three output schemas a declared field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldGroup {
    Variant,
    Facet,
    Transcript,
}

/// The declared value type for a field; `"."`  always decodes to JSON null
/// regardless of type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Str,
    Float,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub group: FieldGroup,
    pub value_type: ValueType,
}

const fn field(name: &'static str, group: FieldGroup, value_type: ValueType) -> FieldSpec {
    FieldSpec {
        name,
        group,
        value_type,
    }
}

/// The reference DBNSFP4 field declaration: the fixed set of fields this
/// ingest reader requires to be present (by canonical name, after alias
/// resolution) in every shard's header. A production deployment's full
/// dbNSFP column list is much larger; this is a representative subset
/// spanning all three schemas.
pub static REFERENCE_FIELDS: &[FieldSpec] = &[
    field("REF", FieldGroup::Variant, ValueType::Str),
    field("ALT", FieldGroup::Variant, ValueType::Str),
    field("aaref", FieldGroup::Variant, ValueType::Str),
    field("aaalt", FieldGroup::Variant, ValueType::Str),
    field("SIFT_score", FieldGroup::Facet, ValueType::Float),
    field("Polyphen2_HDIV_score", FieldGroup::Facet, ValueType::Float),
    field("CADD_raw", FieldGroup::Facet, ValueType::Float),
    field("Eigen_phred_coding", FieldGroup::Facet, ValueType::Float),
    field("clinvar_clnsig", FieldGroup::Facet, ValueType::Str),
    field("Ensembl_geneid", FieldGroup::Transcript, ValueType::Str),
    field("Ensembl_transcriptid", FieldGroup::Transcript, ValueType::Str),
    field("genename", FieldGroup::Transcript, ValueType::Str),
];

/// Normalizes a raw header name: `-` becomes `_`, then the fixed alias table
/// maps a handful of DBNSFP column spellings to their canonical name.
pub fn canonicalize(raw: &str) -> String {
    let dashed = raw.replace('-', "_");
    match dashed.as_str() {
        "ref" => "REF".to_string(),
        "alt" => "ALT".to_string(),
        "Eigen_pred_coding" => "Eigen_phred_coding".to_string(),
        other => other.to_string(),
    }
}

pub(crate) fn parse_value(raw: &str, value_type: ValueType) -> Value {
    if raw == "." {
        return Value::Null;
    }
    match value_type {
        ValueType::Str => Value::String(raw.to_string()),
        ValueType::Float => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
    }
}

/// One resolved field: its column index in the row, its canonical name, and
/// how to parse its raw text.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedField {
    pub index: usize,
    pub name: &'static str,
    pub value_type: ValueType,
}

/// The header-to-index binding for one shard file, resolved once from the
/// header line and then reused, stateless, for every row.
#[derive(Debug, Clone)]
pub struct FieldLayout {
    pub variant: Vec<ResolvedField>,
    pub facet: Vec<ResolvedField>,
    pub transcript: Vec<ResolvedField>,
}

impl FieldLayout {
    /// Resolves `REFERENCE_FIELDS` against a parsed header line. Columns 0
    /// and 1 (`chr*`/`pos*`) are validated by the caller, not resolved here.
    pub fn resolve(header_cols: &[&str]) -> Result<Self> {
        let mut by_name: HashMap<String, usize> = HashMap::new();
        for (idx, raw) in header_cols.iter().enumerate() {
            by_name.insert(canonicalize(raw), idx);
        }

        let mut variant = Vec::new();
        let mut facet = Vec::new();
        let mut transcript = Vec::new();

        for spec in REFERENCE_FIELDS {
            let Some(&index) = by_name.get(spec.name) else {
                let available: Vec<String> = header_cols.iter().map(|s| s.to_string()).collect();
                tracing::error!(field = spec.name, ?available, "declared field missing from header");
                return Err(Error::SchemaFieldMissing(spec.name.to_string(), available));
            };
            let resolved = ResolvedField {
                index,
                name: spec.name,
                value_type: spec.value_type,
            };
            match spec.group {
                FieldGroup::Variant => variant.push(resolved),
                FieldGroup::Facet => facet.push(resolved),
                FieldGroup::Transcript => transcript.push(resolved),
            }
        }

        Ok(Self {
            variant,
            facet,
            transcript,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<&'static str> {
        vec![
            "chr",
            "pos(1-based)",
            "ref",
            "alt",
            "aaref",
            "aaalt",
            "SIFT_score",
            "Polyphen2_HDIV_score",
            "CADD_raw",
            "Eigen_pred_coding",
            "clinvar_clnsig",
            "Ensembl_geneid",
            "Ensembl_transcriptid",
            "genename",
        ]
    }

    #[test]
    fn resolves_aliased_names() {
        let layout = FieldLayout::resolve(&header()).unwrap();
        assert_eq!(layout.variant.len(), 4);
        assert_eq!(layout.facet.len(), 5);
        assert_eq!(layout.transcript.len(), 3);
        let eigen = layout
            .facet
            .iter()
            .find(|f| f.name == "Eigen_phred_coding")
            .unwrap();
        assert_eq!(eigen.index, 9);
    }

    #[test]
    fn missing_declared_field_is_fatal() {
        let mut cols = header();
        cols.retain(|c| *c != "SIFT_score");
        let err = FieldLayout::resolve(&cols).unwrap_err();
        assert!(matches!(err, Error::SchemaFieldMissing(name, _) if name == "SIFT_score"));
    }

    #[test]
    fn missing_value_is_null() {
        assert_eq!(parse_value(".", ValueType::Float), Value::Null);
        assert_eq!(parse_value(".", ValueType::Str), Value::Null);
    }

    #[test]
    fn float_parses_and_str_passes_through() {
        assert_eq!(parse_value("0.5", ValueType::Float), serde_json::json!(0.5));
        assert_eq!(parse_value("A", ValueType::Str), serde_json::json!("A"));
    }
}
