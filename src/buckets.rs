//! Grouping of aligned inference rows into per-cluster buckets.

use indexmap::IndexMap;
use indexmap::map::Iter;

use crate::data::{ClusterCode, ScoreRecord, ScoredExample};
use crate::errors::AcquisitionError;

/// Cluster code → `(score, identifier)` records, keyed in first-seen order.
///
/// Key order is what breaks ties between clusters with equal mean scores.
#[derive(Clone, Debug, Default)]
pub struct ClusterBuckets {
    buckets: IndexMap<ClusterCode, Vec<ScoreRecord>>,
}

impl ClusterBuckets {
    /// Empty bucket map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record under `code`, creating the bucket on first sight.
    pub fn push(&mut self, code: ClusterCode, record: ScoreRecord) {
        self.buckets.entry(code).or_default().push(record);
    }

    /// Records stored under `code`.
    pub fn get(&self, code: &ClusterCode) -> Option<&[ScoreRecord]> {
        self.buckets.get(code).map(Vec::as_slice)
    }

    /// Number of distinct cluster codes.
    pub fn cluster_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total records across every bucket.
    pub fn record_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Buckets in first-seen order.
    pub fn iter(&self) -> Iter<'_, ClusterCode, Vec<ScoreRecord>> {
        self.buckets.iter()
    }

    /// Cluster codes in first-seen order.
    pub fn codes(&self) -> impl Iterator<Item = &ClusterCode> {
        self.buckets.keys()
    }
}

impl<'a> IntoIterator for &'a ClusterBuckets {
    type Item = (&'a ClusterCode, &'a Vec<ScoreRecord>);
    type IntoIter = Iter<'a, ClusterCode, Vec<ScoreRecord>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Builds [`ClusterBuckets`] from an aligned `(identifier, code, score)` stream.
///
/// The collector knows how many rows the inference pass was asked for and
/// refuses to finish on any other count.
#[derive(Debug)]
pub struct BatchScoreCollector {
    expected: usize,
    received: usize,
    buckets: ClusterBuckets,
}

impl BatchScoreCollector {
    /// Collector for a pass over `expected` identifiers.
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            received: 0,
            buckets: ClusterBuckets::new(),
        }
    }

    /// Add one aligned row.
    pub fn push(&mut self, row: ScoredExample) {
        self.received += 1;
        self.buckets.push(
            row.code,
            ScoreRecord {
                score: row.score,
                id: row.id,
            },
        );
    }

    /// Add every row of `rows` in order.
    pub fn extend<I>(&mut self, rows: I)
    where
        I: IntoIterator<Item = ScoredExample>,
    {
        for row in rows {
            self.push(row);
        }
    }

    /// Rows received so far.
    pub fn received(&self) -> usize {
        self.received
    }

    /// Finish collection, failing on a row-count mismatch.
    pub fn finish(self) -> Result<ClusterBuckets, AcquisitionError> {
        if self.received != self.expected {
            return Err(AcquisitionError::Alignment {
                expected: self.expected,
                received: self.received,
                details: "inference stream length differs from identifier list".to_string(),
            });
        }
        Ok(self.buckets)
    }
}

/// Convenience: collect a complete stream of `expected` rows into buckets.
pub fn bucket_scores(
    expected: usize,
    rows: impl IntoIterator<Item = ScoredExample>,
) -> Result<ClusterBuckets, AcquisitionError> {
    let mut collector = BatchScoreCollector::new(expected);
    collector.extend(rows);
    collector.finish()
}
