use serde::{Deserialize, Serialize};

pub use crate::types::{ExampleId, Score};

/// Opaque cluster code assigned to an example by an external encoder.
///
/// Usually a single codebook index or a tuple of quantized integers; only
/// equality and hashing are meaningful.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterCode(pub Vec<i64>);

impl ClusterCode {
    /// Build a code from a single codebook index.
    pub fn single(index: i64) -> Self {
        Self(vec![index])
    }
}

impl From<i64> for ClusterCode {
    fn from(value: i64) -> Self {
        Self::single(value)
    }
}

impl From<Vec<i64>> for ClusterCode {
    fn from(value: Vec<i64>) -> Self {
        Self(value)
    }
}

impl<const N: usize> From<[i64; N]> for ClusterCode {
    fn from(value: [i64; N]) -> Self {
        Self(value.to_vec())
    }
}

/// One output row of the external inference pass (code + informativeness).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterScore {
    pub code: ClusterCode,
    pub score: Score,
}

impl ClusterScore {
    pub fn new(code: impl Into<ClusterCode>, score: Score) -> Self {
        Self {
            code: code.into(),
            score,
        }
    }
}

/// An inference row with the identifier it was computed for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredExample {
    pub id: ExampleId,
    pub code: ClusterCode,
    pub score: Score,
}

impl ScoredExample {
    pub fn new(id: ExampleId, code: impl Into<ClusterCode>, score: Score) -> Self {
        Self {
            id,
            code: code.into(),
            score,
        }
    }
}

/// `(score, identifier)` pair stored inside a cluster bucket.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub score: Score,
    pub id: ExampleId,
}

/// Identifiers chosen for labeling in one round.
///
/// Only [`crate::validate::validate_selection`] builds one, so holding a
/// value means cardinality and uniqueness were checked. Serialize-only for
/// the same reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectionBatch {
    ids: Vec<ExampleId>,
}

impl SelectionBatch {
    pub(crate) fn new_unchecked(ids: Vec<ExampleId>) -> Self {
        Self { ids }
    }

    pub fn ids(&self) -> &[ExampleId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn into_ids(self) -> Vec<ExampleId> {
        self.ids
    }
}

/// Stable descending order on scores; NaN follows IEEE total order.
pub(crate) fn by_score_desc(a: &ScoreRecord, b: &ScoreRecord) -> std::cmp::Ordering {
    b.score.total_cmp(&a.score)
}
