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

//! K-way merge of ordered sub-readers into a single globally ordered stream,
//! fusing equal-keyed record lists.

use genanno_storage::{Key, Record};

/// One ordered source of `(key, records)` pairs. Implemented by
/// `genanno-ingest`'s per-chromosome shard reader; kept generic here so the
/// merge has no dependency on the ingest format.
pub trait SubReader: Send {
    /// Pulls the next key and its record list, in non-decreasing key order.
    /// `Ok(None)` signals end of stream.
    fn next_one(&mut self) -> anyhow::Result<Option<(Key, Vec<Record>)>>;
}

type Lookahead = Option<(Key, Vec<Record>)>;

/// Merges `N` ordered sub-readers into one ordered stream. Equal keys across
/// readers are fused by concatenating their record lists in reader-index
/// order, matching `spec.md` §4.6's fuse rule.
pub struct JoinedReader<R: SubReader> {
    readers: Vec<R>,
    buffers: Vec<Lookahead>,
    done: bool,
    max_count: Option<u64>,
    emitted: u64,
}

impl<R: SubReader> JoinedReader<R> {
    /// Primes every sub-reader's one-element lookahead buffer.
    pub fn new(readers: Vec<R>, max_count: Option<u64>) -> anyhow::Result<Self> {
        let mut readers = readers;
        let mut buffers = Vec::with_capacity(readers.len());
        for reader in readers.iter_mut() {
            buffers.push(reader.next_one()?);
        }
        Ok(Self {
            readers,
            buffers,
            done: false,
            max_count,
            emitted: 0,
        })
    }

    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }

    /// Unwraps the merge, returning the sub-readers for end-of-stream
    /// bookkeeping (e.g. per-shard row-skip totals) that only the concrete
    /// `SubReader` implementation knows how to report.
    pub fn into_readers(self) -> Vec<R> {
        self.readers
    }

    /// Advances the merge by one emitted key. `Ok(None)` once every
    /// sub-reader is exhausted or the `max_count` cap has been hit.
    pub fn next_one(&mut self) -> anyhow::Result<Option<(Key, Vec<Record>)>> {
        if self.done {
            return Ok(None);
        }

        for (idx, slot) in self.buffers.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = self.readers[idx].next_one()?;
            }
        }

        let Some(min_key) = self.buffers.iter().flatten().map(|(k, _)| *k).min() else {
            self.done = true;
            tracing::debug!(emitted = self.emitted, "joined reader exhausted");
            return Ok(None);
        };

        let mut fused = Vec::new();
        for slot in self.buffers.iter_mut() {
            let matches = matches!(slot, Some((k, _)) if *k == min_key);
            if matches {
                let (_, records) = slot.take().expect("checked Some above");
                fused.extend(records);
            }
        }

        self.emitted += 1;
        if let Some(max) = self.max_count {
            if self.emitted >= max {
                self.done = true;
            }
        }

        Ok(Some((min_key, fused)))
    }
}

impl<R: SubReader> Iterator for JoinedReader<R> {
    type Item = anyhow::Result<(Key, Vec<Record>)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_one().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genanno_storage::Variant;
    use serde_json::json;

    struct VecReader {
        items: std::vec::IntoIter<(Key, Vec<Record>)>,
    }

    impl VecReader {
        fn new(items: Vec<(Key, Vec<Record>)>) -> Self {
            Self {
                items: items.into_iter(),
            }
        }
    }

    impl SubReader for VecReader {
        fn next_one(&mut self) -> anyhow::Result<Option<(Key, Vec<Record>)>> {
            Ok(self.items.next())
        }
    }

    fn key(v: u32) -> Key {
        v.to_be_bytes()
    }

    fn tagged(tag: &str) -> Record {
        vec![Variant {
            fields: json!({"tag": tag}).as_object().unwrap().clone(),
            facets: vec![],
        }]
    }

    fn tags(record: &[Record]) -> Vec<String> {
        record
            .iter()
            .flat_map(|r| r.iter())
            .map(|v| v.fields["tag"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn fuses_equal_keys_in_reader_index_order() {
        // A: (5,[a1]),(8,[a2])  B: (5,[b1]),(7,[b2])
        let a = VecReader::new(vec![
            (key(5), vec![tagged("a1")]),
            (key(8), vec![tagged("a2")]),
        ]);
        let b = VecReader::new(vec![
            (key(5), vec![tagged("b1")]),
            (key(7), vec![tagged("b2")]),
        ]);
        let mut joined = JoinedReader::new(vec![a, b], None).unwrap();

        let (k, recs) = joined.next_one().unwrap().unwrap();
        assert_eq!(k, key(5));
        assert_eq!(tags(&recs), vec!["a1", "b1"]);

        let (k, recs) = joined.next_one().unwrap().unwrap();
        assert_eq!(k, key(7));
        assert_eq!(tags(&recs), vec!["b2"]);

        let (k, recs) = joined.next_one().unwrap().unwrap();
        assert_eq!(k, key(8));
        assert_eq!(tags(&recs), vec!["a2"]);

        assert!(joined.next_one().unwrap().is_none());
    }

    #[test]
    fn keys_are_emitted_non_decreasing() {
        let a = VecReader::new(vec![(key(1), vec![]), (key(10), vec![])]);
        let b = VecReader::new(vec![(key(3), vec![]), (key(4), vec![])]);
        let mut joined = JoinedReader::new(vec![a, b], None).unwrap();
        let mut last = None;
        while let Some((k, _)) = joined.next_one().unwrap() {
            if let Some(prev) = last {
                assert!(k >= prev);
            }
            last = Some(k);
        }
    }

    #[test]
    fn max_count_caps_emission() {
        let a = VecReader::new(vec![(key(1), vec![]), (key(2), vec![]), (key(3), vec![])]);
        let mut joined = JoinedReader::new(vec![a], Some(2)).unwrap();
        assert!(joined.next_one().unwrap().is_some());
        assert!(joined.next_one().unwrap().is_some());
        assert!(joined.next_one().unwrap().is_none());
    }

    #[test]
    fn single_empty_reader_yields_nothing() {
        let a: VecReader = VecReader::new(vec![]);
        let mut joined = JoinedReader::new(vec![a], None).unwrap();
        assert!(joined.next_one().unwrap().is_none());
    }

    proptest::proptest! {
        #[test]
        fn prop_merge_of_sorted_streams_is_sorted(
            a in proptest::collection::vec(0u32..50, 0..12),
            b in proptest::collection::vec(0u32..50, 0..12),
            c in proptest::collection::vec(0u32..50, 0..12),
        ) {
            let mut a = a; a.sort_unstable();
            let mut b = b; b.sort_unstable();
            let mut c = c; c.sort_unstable();
            let to_items = |ks: Vec<u32>| ks.into_iter().map(|k| (key(k), vec![])).collect();
            let readers = vec![
                VecReader::new(to_items(a)),
                VecReader::new(to_items(b)),
                VecReader::new(to_items(c)),
            ];
            let mut joined = JoinedReader::new(readers, None).unwrap();
            let mut last = None;
            while let Some((k, _)) = joined.next_one().unwrap() {
                if let Some(prev) = last {
                    proptest::prop_assert!(k >= prev);
                }
                last = Some(k);
            }
        }
    }
}
