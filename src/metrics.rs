use serde::{Deserialize, Serialize};

use crate::buckets::ClusterBuckets;
use crate::data::{ClusterCode, ScoreRecord};
use crate::ranking::RankedClusters;
use crate::types::Score;

/// min/max/mean/std over a set of scores (population std).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub min: Score,
    pub max: Score,
    pub mean: Score,
    pub std: Score,
}

/// Score distribution of one cluster bucket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterStats {
    pub code: ClusterCode,
    pub count: usize,
    pub scores: ScoreSummary,
}

/// Diagnostics for one round's clustering, in ranked order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionStats {
    /// Number of distinct cluster codes.
    pub cluster_count: usize,
    /// Per-cluster distributions, best mean first.
    pub clusters: Vec<ClusterStats>,
    /// Distribution of the per-cluster means; `None` without clusters.
    pub cluster_means: Option<ScoreSummary>,
}

/// Summarize `scores`; `None` when empty.
pub fn summarize<I>(scores: I) -> Option<ScoreSummary>
where
    I: IntoIterator<Item = Score>,
{
    let values: Vec<Score> = scores.into_iter().collect();
    if values.is_empty() {
        return None;
    }
    let n = values.len() as Score;
    let mean = values.iter().sum::<Score>() / n;
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<Score>()
        / n;
    let min = values.iter().copied().fold(Score::INFINITY, Score::min);
    let max = values.iter().copied().fold(Score::NEG_INFINITY, Score::max);
    Some(ScoreSummary {
        min,
        max,
        mean,
        std: variance.sqrt(),
    })
}

/// Compute per-cluster and global diagnostics from ranked buckets.
pub fn selection_stats(ranked: &RankedClusters, buckets: &ClusterBuckets) -> SelectionStats {
    let clusters: Vec<ClusterStats> = ranked
        .with_records(buckets)
        .filter_map(|(entry, records)| {
            summarize(records.iter().map(|record: &ScoreRecord| record.score)).map(|scores| {
                ClusterStats {
                    code: entry.code.clone(),
                    count: records.len(),
                    scores,
                }
            })
        })
        .collect();
    let cluster_means = summarize(clusters.iter().map(|stats| stats.scores.mean));
    SelectionStats {
        cluster_count: buckets.cluster_count(),
        clusters,
        cluster_means,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buckets::bucket_scores;
    use crate::data::ScoredExample;
    use crate::ranking::ClusterRanker;

    #[test]
    fn summarize_matches_population_statistics() {
        let summary = summarize([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).expect("summary");
        assert_eq!(summary.min, 2.0);
        assert_eq!(summary.max, 9.0);
        assert!((summary.mean - 5.0).abs() < 1e-12);
        assert!((summary.std - 2.0).abs() < 1e-12);
        assert!(summarize(Vec::new()).is_none());
    }

    #[test]
    fn reports_clusters_in_rank_order() {
        let buckets = bucket_scores(
            5,
            vec![
                ScoredExample::new(0, 1, 1.0),
                ScoredExample::new(1, 1, 3.0),
                ScoredExample::new(2, 2, 6.0),
                ScoredExample::new(3, 2, 8.0),
                ScoredExample::new(4, 2, 10.0),
            ],
        )
        .unwrap();
        let ranked = ClusterRanker::rank(&buckets);
        let stats = selection_stats(&ranked, &buckets);
        assert_eq!(stats.cluster_count, 2);
        assert_eq!(stats.clusters[0].code, ClusterCode::single(2));
        assert_eq!(stats.clusters[0].count, 3);
        assert_eq!(stats.clusters[0].scores.min, 6.0);
        assert_eq!(stats.clusters[0].scores.max, 10.0);
        assert!((stats.clusters[0].scores.mean - 8.0).abs() < 1e-12);
        assert_eq!(stats.clusters[1].scores.mean, 2.0);
        assert!((stats.clusters[1].scores.std - 1.0).abs() < 1e-12);

        let means = stats.cluster_means.expect("means");
        assert_eq!(means.min, 2.0);
        assert_eq!(means.max, 8.0);
        assert!((means.mean - 5.0).abs() < 1e-12);
        assert!((means.std - 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_round_has_no_global_summary() {
        let buckets = ClusterBuckets::new();
        let stats = selection_stats(&ClusterRanker::rank(&buckets), &buckets);
        assert_eq!(stats.cluster_count, 0);
        assert!(stats.clusters.is_empty());
        assert!(stats.cluster_means.is_none());
    }
}
