//! Per-cluster quota allocation.
//!
//! Both policies share one walk over the ranked clusters:
//! - `CappedTopK { cap }`: quota is `budget / cap`; only the first `cap`
//!   ranked clusters draw, the rest overflow whole.
//! - `UniformAllClusters`: quota is `budget / cluster_count`; every cluster draws.
//!
//! Every record lands in exactly one of `selected` or `remainder`.

use rand::Rng;
use rand::seq::index;

use crate::buckets::ClusterBuckets;
use crate::config::{DrawMode, QuotaPolicy};
use crate::data::{ScoreRecord, by_score_desc};
use crate::ranking::RankedClusters;
use crate::types::ExampleId;

/// Output of the quota phase.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Allocation {
    /// Identifiers drawn within cluster quotas, in rank order.
    pub selected: Vec<ExampleId>,
    /// Records not drawn, available to the fill step.
    pub remainder: Vec<ScoreRecord>,
    /// Per-cluster quota used for this allocation.
    pub quota: usize,
    /// Number of clusters that received a quota.
    pub drawing_clusters: usize,
}

/// Decides how many records each cluster contributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuotaAllocator {
    policy: QuotaPolicy,
    draw: DrawMode,
}

impl QuotaAllocator {
    pub fn new(policy: QuotaPolicy, draw: DrawMode) -> Self {
        Self { policy, draw }
    }

    pub fn policy(&self) -> QuotaPolicy {
        self.policy
    }

    pub fn draw(&self) -> DrawMode {
        self.draw
    }

    /// Per-cluster quota for `budget` over `cluster_count` clusters.
    pub fn quota(&self, budget: usize, cluster_count: usize) -> usize {
        match self.policy {
            QuotaPolicy::CappedTopK { cap } => budget.checked_div(cap).unwrap_or(0),
            QuotaPolicy::UniformAllClusters => budget.checked_div(cluster_count).unwrap_or(0),
        }
    }

    /// Number of ranked clusters that receive a quota.
    pub fn drawing_clusters(&self, cluster_count: usize) -> usize {
        match self.policy {
            QuotaPolicy::CappedTopK { cap } => cap.min(cluster_count),
            QuotaPolicy::UniformAllClusters => cluster_count,
        }
    }

    /// Draw per-cluster quotas from `buckets` in `ranked` order.
    ///
    /// `rng` is only consulted in [`DrawMode::UniformRandom`].
    pub fn allocate<R>(
        &self,
        ranked: &RankedClusters,
        buckets: &ClusterBuckets,
        budget: usize,
        rng: &mut R,
    ) -> Allocation
    where
        R: Rng + ?Sized,
    {
        let quota = self.quota(budget, ranked.len());
        let drawing_clusters = self.drawing_clusters(ranked.len());
        let mut allocation = Allocation {
            selected: Vec::with_capacity(quota.saturating_mul(drawing_clusters).min(budget)),
            remainder: Vec::new(),
            quota,
            drawing_clusters,
        };

        for (rank, (_, records)) in ranked.with_records(buckets).enumerate() {
            if rank >= drawing_clusters {
                allocation.remainder.extend_from_slice(records);
                continue;
            }
            match self.draw {
                DrawMode::TopScore => draw_top(records, quota, &mut allocation),
                DrawMode::UniformRandom => draw_random(records, quota, rng, &mut allocation),
            }
        }
        allocation
    }
}

fn draw_top(records: &[ScoreRecord], quota: usize, allocation: &mut Allocation) {
    let mut sorted = records.to_vec();
    sorted.sort_by(by_score_desc);
    let take = quota.min(sorted.len());
    allocation
        .selected
        .extend(sorted[..take].iter().map(|record| record.id));
    allocation.remainder.extend_from_slice(&sorted[take..]);
}

fn draw_random<R>(records: &[ScoreRecord], quota: usize, rng: &mut R, allocation: &mut Allocation)
where
    R: Rng + ?Sized,
{
    if records.len() <= quota {
        allocation
            .selected
            .extend(records.iter().map(|record| record.id));
        return;
    }
    let mut picked = vec![false; records.len()];
    for position in index::sample(rng, records.len(), quota) {
        picked[position] = true;
        allocation.selected.push(records[position].id);
    }
    allocation.remainder.extend(
        records
            .iter()
            .zip(&picked)
            .filter(|(_, taken)| !**taken)
            .map(|(record, _)| *record),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buckets::bucket_scores;
    use crate::data::ScoredExample;
    use crate::ranking::ClusterRanker;
    use crate::rng::DeterministicRng;
    use std::collections::HashSet;

    /// `clusters` clusters of `size` records; cluster `c` scores `100 - c` plus a per-record offset.
    fn graded_buckets(clusters: usize, size: usize) -> ClusterBuckets {
        let mut rows = Vec::new();
        for c in 0..clusters {
            for r in 0..size {
                rows.push(ScoredExample::new(
                    c * size + r,
                    c as i64,
                    100.0 - c as f64 + r as f64 / size as f64,
                ));
            }
        }
        bucket_scores(clusters * size, rows).unwrap()
    }

    fn assert_partitioned(allocation: &Allocation, total: usize) {
        let mut seen: HashSet<ExampleId> = allocation.selected.iter().copied().collect();
        assert_eq!(seen.len(), allocation.selected.len());
        for record in &allocation.remainder {
            assert!(seen.insert(record.id), "record {} placed twice", record.id);
        }
        assert_eq!(seen.len(), total);
    }

    #[test]
    fn capped_quota_uses_fixed_cap_not_cluster_count() {
        let allocator = QuotaAllocator::new(QuotaPolicy::CappedTopK { cap: 100 }, DrawMode::TopScore);
        assert_eq!(allocator.quota(1000, 3), 10);
        assert_eq!(allocator.quota(4, 3), 0);
        assert_eq!(allocator.drawing_clusters(3), 3);
        assert_eq!(allocator.drawing_clusters(250), 100);
    }

    #[test]
    fn uniform_quota_uses_actual_cluster_count() {
        let allocator = QuotaAllocator::new(QuotaPolicy::UniformAllClusters, DrawMode::TopScore);
        assert_eq!(allocator.quota(10, 3), 3);
        assert_eq!(allocator.quota(10, 0), 0);
        assert_eq!(allocator.drawing_clusters(7), 7);
    }

    #[test]
    fn capped_draws_top_scores_and_overflows_the_rest() {
        let buckets = graded_buckets(5, 4);
        let ranked = ClusterRanker::rank(&buckets);
        let allocator = QuotaAllocator::new(QuotaPolicy::CappedTopK { cap: 3 }, DrawMode::TopScore);
        let mut rng = DeterministicRng::new(0);
        let allocation = allocator.allocate(&ranked, &buckets, 6, &mut rng);

        assert_eq!(allocation.quota, 2);
        assert_eq!(allocation.drawing_clusters, 3);
        // best two of clusters 0, 1, 2 (highest offsets are the last records)
        assert_eq!(allocation.selected, vec![3, 2, 7, 6, 11, 10]);
        assert_partitioned(&allocation, 20);
        // clusters 3 and 4 overflow in full
        for id in 12..20 {
            assert!(allocation.remainder.iter().any(|record| record.id == id));
        }
    }

    #[test]
    fn small_clusters_are_taken_whole_without_padding() {
        let buckets = bucket_scores(
            5,
            vec![
                ScoredExample::new(0, 1, 9.0),
                ScoredExample::new(1, 2, 5.0),
                ScoredExample::new(2, 2, 4.0),
                ScoredExample::new(3, 2, 3.0),
                ScoredExample::new(4, 2, 2.0),
            ],
        )
        .unwrap();
        let ranked = ClusterRanker::rank(&buckets);
        let allocator = QuotaAllocator::new(QuotaPolicy::CappedTopK { cap: 2 }, DrawMode::TopScore);
        let allocation = allocator.allocate(&ranked, &buckets, 6, &mut DeterministicRng::new(0));
        assert_eq!(allocation.quota, 3);
        assert_eq!(allocation.selected, vec![0, 1, 2, 3]);
        assert_eq!(allocation.remainder.len(), 1);
        assert_eq!(allocation.remainder[0].id, 4);
    }

    #[test]
    fn preference_is_monotonic_in_cluster_mean() {
        let buckets = graded_buckets(4, 5);
        let ranked = ClusterRanker::rank(&buckets);
        let allocator =
            QuotaAllocator::new(QuotaPolicy::CappedTopK { cap: 100 }, DrawMode::TopScore);
        let allocation = allocator.allocate(&ranked, &buckets, 400, &mut DeterministicRng::new(0));
        let per_cluster = |c: usize| {
            allocation
                .selected
                .iter()
                .filter(|id| **id / 5 == c)
                .count()
        };
        for c in 1..4 {
            assert!(per_cluster(c - 1) >= per_cluster(c));
        }
    }

    #[test]
    fn uniform_random_draws_quota_per_cluster() {
        let buckets = graded_buckets(3, 10);
        let ranked = ClusterRanker::rank(&buckets);
        let allocator =
            QuotaAllocator::new(QuotaPolicy::UniformAllClusters, DrawMode::UniformRandom);
        let mut rng = DeterministicRng::new(17);
        let allocation = allocator.allocate(&ranked, &buckets, 10, &mut rng);
        assert_eq!(allocation.quota, 3);
        assert_eq!(allocation.selected.len(), 9);
        for c in 0..3 {
            let drawn = allocation
                .selected
                .iter()
                .filter(|id| **id / 10 == c)
                .count();
            assert_eq!(drawn, 3);
        }
        assert_partitioned(&allocation, 30);
    }

    #[test]
    fn uniform_random_depends_on_rng_state() {
        let buckets = graded_buckets(2, 50);
        let ranked = ClusterRanker::rank(&buckets);
        let allocator =
            QuotaAllocator::new(QuotaPolicy::UniformAllClusters, DrawMode::UniformRandom);
        let a = allocator.allocate(&ranked, &buckets, 20, &mut DeterministicRng::new(1));
        let b = allocator.allocate(&ranked, &buckets, 20, &mut DeterministicRng::new(2));
        let c = allocator.allocate(&ranked, &buckets, 20, &mut DeterministicRng::new(1));
        assert_eq!(a, c);
        assert_ne!(a.selected, b.selected);
    }

    #[test]
    fn selected_never_exceeds_budget() {
        for (clusters, size, budget, policy) in [
            (3, 4, 7, QuotaPolicy::UniformAllClusters),
            (150, 2, 250, QuotaPolicy::CappedTopK { cap: 100 }),
            (7, 9, 13, QuotaPolicy::CappedTopK { cap: 4 }),
        ] {
            let buckets = graded_buckets(clusters, size);
            let ranked = ClusterRanker::rank(&buckets);
            let allocation = QuotaAllocator::new(policy, DrawMode::TopScore).allocate(
                &ranked,
                &buckets,
                budget,
                &mut DeterministicRng::new(0),
            );
            assert!(allocation.selected.len() <= budget);
            assert_partitioned(&allocation, clusters * size);
        }
    }

    #[test]
    fn clusters_ranked_past_the_cap_overflow_whole() {
        let buckets = graded_buckets(150, 2);
        let ranked = ClusterRanker::rank(&buckets);
        let allocator = QuotaAllocator::new(QuotaPolicy::CappedTopK { cap: 100 }, DrawMode::TopScore);
        let allocation = allocator.allocate(&ranked, &buckets, 250, &mut DeterministicRng::new(0));

        assert_eq!(allocation.quota, 2);
        assert_eq!(allocation.drawing_clusters, 100);
        assert_eq!(allocation.selected.len(), 200);
        assert!(allocation.selected.iter().all(|id| id / 2 < 100));
        assert_eq!(allocation.remainder.len(), 100);
        assert!(allocation.remainder.iter().all(|record| record.id / 2 >= 100));
    }
}
