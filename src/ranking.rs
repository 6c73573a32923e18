use crate::buckets::ClusterBuckets;
use crate::data::{ClusterCode, ScoreRecord};
use crate::types::Score;

/// One entry of a [`RankedClusters`] list.
#[derive(Clone, Debug, PartialEq)]
pub struct RankedCluster {
    /// Cluster code.
    pub code: ClusterCode,
    /// Mean score of the bucket.
    pub mean: Score,
    /// Number of records in the bucket.
    pub len: usize,
    position: usize,
}

impl RankedCluster {
    /// First-seen position of this cluster in its bucket map.
    pub fn position(&self) -> usize {
        self.position
    }
}

/// Cluster codes ordered by descending mean score.
///
/// Equal means keep first-seen order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RankedClusters {
    entries: Vec<RankedCluster>,
}

impl RankedClusters {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from best to worst.
    pub fn entries(&self) -> &[RankedCluster] {
        &self.entries
    }

    /// Codes from best to worst.
    pub fn codes(&self) -> impl Iterator<Item = &ClusterCode> {
        self.entries.iter().map(|entry| &entry.code)
    }

    /// Resolve each entry to its bucket records, best cluster first.
    pub fn with_records<'a>(
        &'a self,
        buckets: &'a ClusterBuckets,
    ) -> impl Iterator<Item = (&'a RankedCluster, &'a [ScoreRecord])> {
        self.entries
            .iter()
            .filter_map(move |entry| buckets.get(&entry.code).map(|records| (entry, records)))
    }
}

/// Orders cluster buckets by mean score.
pub struct ClusterRanker;

impl ClusterRanker {
    /// Rank every bucket of `buckets` by descending mean score.
    pub fn rank(buckets: &ClusterBuckets) -> RankedClusters {
        let mut entries: Vec<RankedCluster> = buckets
            .iter()
            .enumerate()
            .map(|(position, (code, records))| RankedCluster {
                code: code.clone(),
                mean: mean_score(records),
                len: records.len(),
                position,
            })
            .collect();
        // `sort_by` is stable, so equal means stay in first-seen order.
        entries.sort_by(|a, b| b.mean.total_cmp(&a.mean));
        RankedClusters { entries }
    }
}

pub(crate) fn mean_score(records: &[ScoreRecord]) -> Score {
    if records.is_empty() {
        return 0.0;
    }
    records.iter().map(|record| record.score).sum::<Score>() / records.len() as Score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buckets::bucket_scores;
    use crate::data::ScoredExample;

    fn buckets() -> ClusterBuckets {
        bucket_scores(
            7,
            vec![
                ScoredExample::new(0, 1, 1.0),
                ScoredExample::new(1, 2, 5.0),
                ScoredExample::new(2, 3, 3.0),
                ScoredExample::new(3, 1, 1.0),
                ScoredExample::new(4, 4, 3.0),
                ScoredExample::new(5, 2, 3.0),
                ScoredExample::new(6, 3, 3.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn orders_by_descending_mean() {
        let ranked = ClusterRanker::rank(&buckets());
        let codes: Vec<i64> = ranked.codes().map(|code| code.0[0]).collect();
        // cluster 2 mean 4.0, clusters 3 and 4 tie at 3.0 (3 seen first), cluster 1 mean 1.0
        assert_eq!(codes, vec![2, 3, 4, 1]);
        assert_eq!(ranked.entries()[0].mean, 4.0);
        assert_eq!(ranked.entries()[0].len, 2);
        assert_eq!(ranked.entries()[0].position(), 1);
    }

    #[test]
    fn ranking_is_idempotent() {
        let buckets = buckets();
        let first = ClusterRanker::rank(&buckets);
        let second = ClusterRanker::rank(&buckets);
        assert_eq!(first, second);
    }

    #[test]
    fn resolves_records_in_rank_order() {
        let buckets = buckets();
        let ranked = ClusterRanker::rank(&buckets);
        let ids: Vec<Vec<usize>> = ranked
            .with_records(&buckets)
            .map(|(_, records)| records.iter().map(|record| record.id).collect())
            .collect();
        assert_eq!(ids, vec![vec![1, 5], vec![2, 6], vec![4], vec![0, 3]]);
    }

    #[test]
    fn empty_buckets_rank_to_empty_list() {
        let ranked = ClusterRanker::rank(&ClusterBuckets::new());
        assert!(ranked.is_empty());
        assert_eq!(ranked.len(), 0);
    }
}
