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

//! `genanno-ingest`: reads one or more DBNSFP4 shards (a single file or a
//! glob), k-way merges them in key order, and writes the result into a
//! RocksDB-backed storage stream.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;

use genanno_ingest::IngestReader;
use genanno_key::KeyCodec;
use genanno_merge::JoinedReader;
use genanno_storage::{IOController, IoDescriptor, JsonRecordCodec, Record, RocksKv};

/// Ingests DBNSFP4 annotation shards into a genanno storage stream.
#[derive(Debug, Parser)]
#[command(name = "genanno-ingest", version)]
struct Args {
    /// A shard file path or glob (e.g. `dbNSFP4.3a_variant.chr*.gz`).
    input: String,

    /// Directory for the RocksDB-backed output store.
    #[arg(long, default_value = "genanno.db")]
    db: PathBuf,

    /// Reference build fixing the key layout (`hg19` or `hg38`).
    #[arg(long, default_value = "hg38")]
    build: String,

    /// Schema name; mangled into the `<name>_base`/`<name>_str` columns.
    #[arg(long, default_value = "dbnsfp")]
    schema: String,

    /// Block-codec policy.
    #[arg(long, default_value = "range")]
    block_type: String,

    /// Range-block span (keys per sealed block).
    #[arg(long, default_value_t = 1000)]
    range_span: u32,

    /// Read-block cache bound.
    #[arg(long, default_value_t = 3)]
    cache_size: usize,

    /// Registers the `str` (interned-string) column alongside `base`.
    #[arg(long)]
    with_str: bool,
}

fn expand_glob(pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = glob::glob(pattern)
        .with_context(|| format!("invalid glob pattern {pattern:?}"))?
        .collect::<Result<_, _>>()?;
    paths.sort();
    Ok(paths)
}

fn run(args: Args) -> anyhow::Result<()> {
    let build = genanno_key::by_name(&args.build)
        .ok_or_else(|| anyhow::anyhow!("unknown reference build {:?}", args.build))?;
    let key_codec = KeyCodec::new(build);

    let paths = expand_glob(&args.input)?;
    anyhow::ensure!(!paths.is_empty(), "no shard files matched {:?}", args.input);

    let mut readers = Vec::with_capacity(paths.len());
    for path in &paths {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let chrom = genanno_ingest::detect_chrom(filename)
            .with_context(|| format!("detecting chromosome from {path:?}"))?;
        tracing::debug!(?path, chrom, "opening shard");
        readers.push(IngestReader::open(path, key_codec)?);
    }

    let mut options = HashMap::new();
    options.insert("block-type".to_string(), args.block_type.clone());
    options.insert("range-span".to_string(), args.range_span.to_string());
    options.insert("cache-size".to_string(), args.cache_size.to_string());
    let descriptor = IoDescriptor::new(options);

    let kv = RocksKv::open(&args.db)
        .with_context(|| format!("opening RocksDB store at {:?}", args.db))?;
    let mut controller = IOController::open(
        kv,
        args.schema.clone(),
        true,
        key_codec,
        args.with_str,
        descriptor,
    )?;

    let mut joined = JoinedReader::new(readers, None)?;
    let codec = JsonRecordCodec;
    let started = Instant::now();
    let mut total_keys = 0u64;

    while let Some((key, records)) = joined.next_one()? {
        let fused: Record = records.into_iter().flatten().collect();
        controller.put_record(key, &fused, &codec)?;
        total_keys += 1;
    }

    controller.close()?;

    for (path, reader) in paths.iter().zip(joined.into_readers()) {
        let report = reader.report();
        tracing::info!(
            ?path,
            yielded = report.yielded,
            skipped_rows = report.skipped_rows,
            "shard done"
        );
    }

    tracing::info!(
        total_keys,
        elapsed_secs = started.elapsed().as_secs_f64(),
        "ingest complete"
    );
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if let Err(err) = run(args) {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
}
