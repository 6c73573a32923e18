#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Per-cluster quota allocation.
pub mod allocator;
/// Cluster buckets and the batch score collector.
pub mod buckets;
/// Acquisition configuration types.
pub mod config;
/// Centralized constants used across allocation, rounds, and persistence.
pub mod constants;
/// Cluster codes, scored rows, and validated selection batches.
pub mod data;
/// Round orchestration and the composed selection pipeline.
pub mod engine;
/// Reusable example runners shared by downstream crates.
pub mod example_apps;
/// Remainder fill after quota draws.
pub mod fill;
mod hash;
/// Score providers and batched inference collection.
pub mod inference;
/// Aggregate score and cluster statistics.
pub mod metrics;
/// Pool snapshots and the round log.
pub mod persistence;
/// Labeled/unlabeled partition and its mutator.
pub mod pool;
/// Cluster ranking by mean score.
pub mod ranking;
/// Deterministic per-round random number generator.
pub mod rng;
/// Ordered index sampling for inference and training passes.
pub mod sampler;
/// Shared type aliases.
pub mod types;
/// Selection integrity checks.
pub mod validate;

mod errors;

pub use allocator::{Allocation, QuotaAllocator};
pub use buckets::{BatchScoreCollector, ClusterBuckets, bucket_scores};
pub use config::{AcquisitionConfig, DrawMode, FirstRoundMode, QuotaPolicy};
pub use data::{ClusterCode, ClusterScore, ScoreRecord, ScoredExample, SelectionBatch};
pub use engine::{
    AcquisitionEngine, RoundReport, SelectionParams, SelectionPlan, plan_selection,
};
pub use errors::AcquisitionError;
pub use fill::{DraftSelection, RemainderFiller};
pub use inference::{ScoreProvider, SyntheticScoreProvider, collect_scores};
pub use metrics::{ClusterStats, ScoreSummary, SelectionStats};
pub use persistence::{PoolSnapshot, RoundLog, RoundLogEntry};
pub use pool::{PoolMutator, PoolPartition};
pub use ranking::{ClusterRanker, RankedCluster, RankedClusters};
pub use rng::DeterministicRng;
pub use sampler::{IndexBatches, OrderedIndexSampler};
pub use types::{Details, ExampleId, RoundIndex, Score};
pub use validate::{validate_selection, validate_stream};
