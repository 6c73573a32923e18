//! Score provider interface and the ordered inference pass.
//!
//! Ownership model:
//! - `ScoreProvider` is the engine-facing seam to the external encoder and
//!   informativeness model. It sees identifiers, never positions.
//! - `collect_scores` owns batching and pairs every output row with the
//!   identifier of its batch slot, so attribution never depends on a counter.

use tracing::debug;

use crate::constants::synthetic::{CLUSTER_SALT, SCORE_SALT};
use crate::data::{ClusterScore, ScoredExample};
use crate::errors::AcquisitionError;
use crate::hash::{stable_hash_id, unit_interval};
use crate::sampler::OrderedIndexSampler;
use crate::types::ExampleId;

/// External collaborator computing a cluster code and a score per example.
///
/// Implementations must return exactly one row per requested identifier, in
/// the order given. Any internal parallelism has to be hidden behind that
/// ordered contract.
pub trait ScoreProvider {
    /// Score one mini-batch; row `i` belongs to `batch[i]`.
    fn score_and_cluster(
        &mut self,
        batch: &[ExampleId],
    ) -> Result<Vec<ClusterScore>, AcquisitionError>;
}

impl<F> ScoreProvider for F
where
    F: FnMut(&[ExampleId]) -> Result<Vec<ClusterScore>, AcquisitionError>,
{
    fn score_and_cluster(
        &mut self,
        batch: &[ExampleId],
    ) -> Result<Vec<ClusterScore>, AcquisitionError> {
        self(batch)
    }
}

/// Run the ordered inference pass over `ids` and attach identifiers to every row.
///
/// Fails with [`AcquisitionError::Alignment`] as soon as a batch comes back
/// with a different row count than was requested.
pub fn collect_scores<P>(
    ids: &[ExampleId],
    batch_size: usize,
    provider: &mut P,
) -> Result<Vec<ScoredExample>, AcquisitionError>
where
    P: ScoreProvider + ?Sized,
{
    let batches = OrderedIndexSampler::new(ids.to_vec()).batches(batch_size);
    let batch_count = batches.batch_count();
    let mut scored = Vec::with_capacity(ids.len());
    for (batch_idx, batch) in batches.enumerate() {
        let rows = provider.score_and_cluster(&batch)?;
        if rows.len() != batch.len() {
            return Err(AcquisitionError::Alignment {
                expected: batch.len(),
                received: rows.len(),
                details: format!("batch {batch_idx} of {batch_count}"),
            });
        }
        scored.extend(
            batch
                .into_iter()
                .zip(rows)
                .map(|(id, row)| ScoredExample {
                    id,
                    code: row.code,
                    score: row.score,
                }),
        );
    }
    debug!(
        rows = scored.len(),
        batches = batch_count,
        "collected inference scores"
    );
    Ok(scored)
}

/// Deterministic stand-in for the encoder + loss predictor.
///
/// Cluster codes and scores are pure functions of `(seed, id)`. Each cluster
/// gets its own score offset so cluster means differ.
#[derive(Clone, Debug)]
pub struct SyntheticScoreProvider {
    seed: u64,
    clusters: usize,
    calls: usize,
}

impl SyntheticScoreProvider {
    /// Provider assigning identifiers to `clusters` codes (at least one).
    pub fn new(seed: u64, clusters: usize) -> Self {
        Self {
            seed,
            clusters: clusters.max(1),
            calls: 0,
        }
    }

    /// Number of batches scored so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Row this provider emits for `id`.
    pub fn row_for(&self, id: ExampleId) -> ClusterScore {
        let cluster = stable_hash_id(self.seed, CLUSTER_SALT, id) % self.clusters as u64;
        let jitter = unit_interval(stable_hash_id(self.seed, SCORE_SALT, id));
        let offset = unit_interval(stable_hash_id(self.seed, SCORE_SALT, cluster as usize));
        ClusterScore::new(cluster as i64, offset + jitter)
    }
}

impl ScoreProvider for SyntheticScoreProvider {
    fn score_and_cluster(
        &mut self,
        batch: &[ExampleId],
    ) -> Result<Vec<ClusterScore>, AcquisitionError> {
        self.calls += 1;
        Ok(batch.iter().map(|id| self.row_for(*id)).collect())
    }
}
