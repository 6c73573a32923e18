use std::collections::{BTreeSet, HashSet};

use cluster_acquisition::{
    AcquisitionConfig, AcquisitionEngine, AcquisitionError, ClusterScore, DeterministicRng,
    DrawMode, FirstRoundMode, PoolSnapshot, QuotaPolicy, ScoredExample, SelectionParams,
    SyntheticScoreProvider, plan_selection,
};

fn config(seed: u64, budget: usize, initial_size: usize) -> AcquisitionConfig {
    AcquisitionConfig {
        seed,
        budget,
        initial_size,
        inference_batch_size: 16,
        ..AcquisitionConfig::default()
    }
}

/// Engine over `0..pool_size`, past round zero, with nothing labeled yet.
fn engine_after_first_round(config: AcquisitionConfig, pool_size: usize) -> AcquisitionEngine {
    let snapshot = PoolSnapshot {
        version: 1,
        seed: config.seed,
        completed_rounds: 1,
        labeled: Vec::new(),
        unlabeled: (0..pool_size).collect(),
    };
    AcquisitionEngine::resume(config, &snapshot).unwrap()
}

fn three_cluster_rows() -> Vec<ScoredExample> {
    let mut rows = Vec::new();
    for (id, score) in [(0, 9.0), (1, 8.0), (2, 7.0)] {
        rows.push(ScoredExample::new(id, 1, score));
    }
    for id in 3..=5 {
        rows.push(ScoredExample::new(id, 2, 5.0));
    }
    for id in 6..=9 {
        rows.push(ScoredExample::new(id, 3, 1.0));
    }
    rows
}

#[test]
fn few_clusters_route_capped_selection_through_the_remainder() {
    let mut engine = engine_after_first_round(config(42, 4, 1), 10);
    let report = engine.sample_scored(1, three_cluster_rows()).unwrap();

    assert_eq!(report.quota, 0);
    assert_eq!(report.from_quota, 0);
    assert_eq!(report.from_remainder, 4);
    assert_eq!(report.selection.ids(), &[0, 1, 2, 3]);
    assert_eq!(engine.labeled(), &[0, 1, 2, 3]);
    assert_eq!(engine.unlabeled_len(), 6);
}

#[test]
fn first_round_draws_a_seeded_random_subset() {
    let mut subsets = Vec::new();
    for seed in [3, 4] {
        let mut engine = AcquisitionEngine::new(config(seed, 10, 10), 100).unwrap();
        let mut provider = SyntheticScoreProvider::new(seed, 8);
        let report = engine.sample(0, &mut provider).unwrap();

        assert_eq!(provider.calls(), 0);
        assert_eq!(report.selection.len(), 10);
        assert_eq!(engine.unlabeled_len(), 90);
        let distinct: BTreeSet<_> = report.selection.ids().iter().copied().collect();
        assert_eq!(distinct.len(), 10);
        assert!(distinct.iter().all(|id| *id < 100));
        subsets.push(distinct);
    }
    assert_ne!(subsets[0], subsets[1]);
}

#[test]
fn first_round_is_reproducible_for_a_fixed_seed() {
    let run = || {
        let mut engine = AcquisitionEngine::new(config(11, 10, 10), 100).unwrap();
        let mut provider = SyntheticScoreProvider::new(11, 8);
        engine.sample(0, &mut provider).unwrap().selection
    };
    assert_eq!(run(), run());
}

#[test]
fn identifier_in_two_buckets_is_an_integrity_failure() {
    // id 3 lands in two clusters and id 4 is missing, so row counts still match.
    let mut rows = vec![
        ScoredExample::new(0, 1, 9.0),
        ScoredExample::new(1, 1, 8.0),
        ScoredExample::new(3, 1, 8.5),
        ScoredExample::new(3, 2, 8.4),
        ScoredExample::new(2, 2, 5.0),
        ScoredExample::new(5, 2, 5.0),
    ];
    rows.extend((6..=9).map(|id| ScoredExample::new(id, 3, 1.0)));
    assert_eq!(rows.len(), 10);

    let mut engine = engine_after_first_round(config(42, 4, 1), 10);
    let err = engine.sample_scored(1, rows).unwrap_err();
    match err {
        AcquisitionError::SelectionIntegrity {
            expected, details, ..
        } => {
            assert_eq!(expected, 4);
            assert!(details.contains("identifier 3 scored 2 times"), "{details}");
        }
        other => panic!("expected integrity failure, got {other:?}"),
    }
    assert_eq!(engine.labeled_len(), 0);
    assert_eq!(engine.unlabeled_len(), 10);
    assert_eq!(engine.completed_rounds(), 1);
}

#[test]
fn short_inference_stream_is_an_alignment_failure() {
    let mut rows = three_cluster_rows();
    rows.pop();
    let mut engine = engine_after_first_round(config(42, 4, 1), 10);
    let err = engine.sample_scored(1, rows).unwrap_err();
    assert!(matches!(
        err,
        AcquisitionError::Alignment {
            expected: 10,
            received: 9,
            ..
        }
    ));
    assert_eq!(engine.unlabeled_len(), 10);
}

#[test]
fn rounds_select_exactly_budget_and_keep_the_partition_disjoint() {
    let pool_size = 600;
    let mut engine = AcquisitionEngine::new(config(5, 50, 40), pool_size).unwrap();
    let mut provider = SyntheticScoreProvider::new(5, 12);
    let mut seen = HashSet::new();

    for round in 0..6 {
        let report = engine.sample(round, &mut provider).unwrap();
        let expected = if round == 0 { 40 } else { 50 };
        assert_eq!(report.selection.len(), expected);
        for id in report.selection.ids() {
            assert!(seen.insert(*id), "identifier {id} labeled twice");
        }

        let partition = engine.partition();
        assert_eq!(partition.labeled_len() + partition.unlabeled_len(), pool_size);
        for id in partition.labeled() {
            assert!(!partition.unlabeled().contains(id));
        }
    }
    assert_eq!(engine.labeled_len(), 40 + 5 * 50);
}

#[test]
fn capped_policy_prefers_higher_mean_clusters() {
    // 200 clusters of 5; cluster c has every score equal to 200 - c.
    let rows: Vec<ScoredExample> = (0..1000)
        .map(|id| {
            let cluster = (id / 5) as i64;
            ScoredExample::new(id, cluster, 200.0 - cluster as f64)
        })
        .collect();
    let unlabeled: BTreeSet<usize> = (0..1000).collect();
    let params = SelectionParams {
        budget: 200,
        policy: QuotaPolicy::CappedTopK { cap: 100 },
        draw: DrawMode::TopScore,
    };
    let mut rng = DeterministicRng::for_round(1, 1);
    let plan = plan_selection(rows, 1000, &unlabeled, params, &mut rng).unwrap();

    assert_eq!(plan.quota, 2);
    assert_eq!(plan.from_quota, 200);
    assert_eq!(plan.from_remainder, 0);
    assert!(plan.batch.ids().iter().all(|id| id / 5 < 100));
    for cluster in 0..100 {
        let drawn = plan.batch.ids().iter().filter(|id| *id / 5 == cluster).count();
        assert_eq!(drawn, 2, "cluster {cluster}");
    }
}

#[test]
fn uniform_policy_spreads_quota_and_fills_the_rest() {
    let rows: Vec<ScoredExample> = (0..40)
        .map(|id| ScoredExample::new(id, (id % 4) as i64, id as f64))
        .collect();
    let unlabeled: BTreeSet<usize> = (0..40).collect();
    let params = SelectionParams {
        budget: 10,
        policy: QuotaPolicy::UniformAllClusters,
        draw: DrawMode::TopScore,
    };
    let mut rng = DeterministicRng::for_round(9, 2);
    let plan = plan_selection(rows, 40, &unlabeled, params, &mut rng).unwrap();

    assert_eq!(plan.quota, 2);
    assert_eq!(plan.from_quota, 8);
    assert_eq!(plan.from_remainder, 2);
    assert_eq!(plan.batch.len(), 10);
    for cluster in 0..4 {
        let drawn = plan.batch.ids().iter().filter(|id| *id % 4 == cluster).count();
        assert!(drawn >= 2, "cluster {cluster} drew {drawn}");
    }
    assert_eq!(plan.stats.cluster_count, 4);
}

#[test]
fn cluster_uniform_first_round_scores_the_pool() {
    let mut cfg = config(8, 20, 30);
    cfg.first_round = FirstRoundMode::ClusterUniform;
    let mut engine = AcquisitionEngine::new(cfg, 300).unwrap();
    let mut provider = SyntheticScoreProvider::new(8, 6);

    let report = engine.sample(0, &mut provider).unwrap();
    assert!(provider.calls() > 0);
    assert_eq!(report.selection.len(), 30);
    assert_eq!(report.quota, 5);
    assert!(report.stats.is_some());
    assert_eq!(engine.unlabeled_len(), 270);
}

#[test]
fn exhausted_pool_fails_before_inference() {
    let mut engine = AcquisitionEngine::new(config(1, 30, 30), 70).unwrap();
    let mut provider = SyntheticScoreProvider::new(1, 4);
    engine.sample(0, &mut provider).unwrap();
    engine.sample(1, &mut provider).unwrap();
    let calls = provider.calls();

    let err = engine.sample(2, &mut provider).unwrap_err();
    assert!(matches!(
        err,
        AcquisitionError::InsufficientPool {
            budget: 30,
            available: 10
        }
    ));
    assert_eq!(provider.calls(), calls);
}

#[test]
fn provider_closure_rows_must_match_each_batch() {
    let mut engine = engine_after_first_round(config(2, 4, 1), 20);
    let mut provider = |batch: &[usize]| -> Result<Vec<ClusterScore>, AcquisitionError> {
        Ok(batch
            .iter()
            .skip(1)
            .map(|id| ClusterScore::new(*id as i64 % 3, 1.0))
            .collect())
    };
    let err = engine.sample(1, &mut provider).unwrap_err();
    assert!(matches!(err, AcquisitionError::Alignment { .. }));
    assert_eq!(engine.labeled_len(), 0);
}

/// Rows for `0..10` with 0 and 1 scoring highest, then `edit` applied.
fn rows_with(edit: impl FnOnce(&mut Vec<ScoredExample>)) -> Vec<ScoredExample> {
    let mut rows: Vec<ScoredExample> = (0..10)
        .map(|id| {
            let score = if id < 2 { 9.0 - id as f64 } else { 1.0 };
            ScoredExample::new(id, (id % 3) as i64, score)
        })
        .collect();
    edit(&mut rows);
    rows
}

#[test]
fn unselected_repeat_in_scored_stream_still_fails_the_round() {
    // Same length as the pool: 9 repeats in place of 4, and 77 replaces 8.
    let rows = rows_with(|rows| {
        rows[4] = ScoredExample::new(9, 4, 0.1);
        rows[8] = ScoredExample::new(77, 3, 0.5);
    });
    assert_eq!(rows.len(), 10);

    let mut engine = engine_after_first_round(config(42, 2, 1), 10);
    let err = engine.sample_scored(1, rows).unwrap_err();
    match err {
        AcquisitionError::SelectionIntegrity { details, .. } => {
            assert!(details.contains("identifier 9 scored 2 times"), "{details}");
        }
        other => panic!("expected integrity failure, got {other:?}"),
    }
    assert_eq!(engine.labeled_len(), 0);
    assert_eq!(engine.unlabeled_len(), 10);
    assert_eq!(engine.completed_rounds(), 1);
}

#[test]
fn foreign_identifier_in_scored_stream_is_an_alignment_failure() {
    let rows = rows_with(|rows| rows[4] = ScoredExample::new(77, 1, 0.5));

    let mut engine = engine_after_first_round(config(42, 2, 1), 10);
    let err = engine.sample_scored(1, rows).unwrap_err();
    match err {
        AcquisitionError::Alignment { details, .. } => {
            assert!(details.contains("missing identifiers [4]"), "{details}");
            assert!(details.contains("unexpected identifiers [77]"), "{details}");
        }
        other => panic!("expected alignment failure, got {other:?}"),
    }
    assert_eq!(engine.labeled_len(), 0);
}

#[test]
fn reordered_scored_stream_is_an_alignment_failure() {
    let rows = rows_with(|rows| rows.swap(5, 6));

    let mut engine = engine_after_first_round(config(42, 2, 1), 10);
    let err = engine.sample_scored(1, rows).unwrap_err();
    assert!(matches!(err, AcquisitionError::Alignment { .. }));
    assert_eq!(engine.unlabeled_len(), 10);

    let report = engine.sample_scored(1, rows_with(|_| {})).unwrap();
    assert_eq!(report.selection.ids(), &[0, 1]);
}
