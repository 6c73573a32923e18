//! Round driver: inference → buckets → ranking → quotas → fill → validate → commit.

use chrono::Utc;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::allocator::QuotaAllocator;
use crate::buckets::bucket_scores;
use crate::config::{AcquisitionConfig, DrawMode, FirstRoundMode, QuotaPolicy};
use crate::constants::engine::FIRST_ROUND;
use crate::data::{ScoredExample, SelectionBatch};
use crate::errors::AcquisitionError;
use crate::fill::RemainderFiller;
use crate::inference::{ScoreProvider, collect_scores};
use crate::metrics::{SelectionStats, selection_stats};
use crate::persistence::{PoolSnapshot, RoundLog, RoundLogEntry};
use crate::pool::{PoolMutator, PoolPartition};
use crate::ranking::ClusterRanker;
use crate::rng::DeterministicRng;
use crate::sampler::OrderedIndexSampler;
use crate::types::{ExampleId, RoundIndex};
use crate::validate::{validate_selection, validate_stream};

/// Parameters of one selection pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionParams {
    /// Exact number of identifiers to select.
    pub budget: usize,
    /// Quota policy.
    pub policy: QuotaPolicy,
    /// Draw mode for quotas and remainder fill.
    pub draw: DrawMode,
}

/// A validated selection plus the diagnostics that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionPlan {
    pub batch: SelectionBatch,
    pub stats: SelectionStats,
    pub quota: usize,
    pub from_quota: usize,
    pub from_remainder: usize,
}

/// Select exactly `params.budget` identifiers from aligned inference rows.
///
/// `expected` is the number of identifiers the inference pass was asked to
/// score; `unlabeled` is the start-of-round unlabeled set. Nothing is mutated.
pub fn plan_selection<R>(
    scored: Vec<ScoredExample>,
    expected: usize,
    unlabeled: &BTreeSet<ExampleId>,
    params: SelectionParams,
    rng: &mut R,
) -> Result<SelectionPlan, AcquisitionError>
where
    R: rand::Rng + ?Sized,
{
    let buckets = bucket_scores(expected, scored)?;
    let ranked = ClusterRanker::rank(&buckets);
    let stats = selection_stats(&ranked, &buckets);

    let allocation =
        QuotaAllocator::new(params.policy, params.draw).allocate(&ranked, &buckets, params.budget, rng);
    let quota = allocation.quota;
    let draft = RemainderFiller::new(params.draw).fill(allocation, params.budget, rng);
    let (from_quota, from_remainder) = (draft.from_quota, draft.from_remainder);
    let batch = validate_selection(draft.ids, params.budget, unlabeled)?;

    Ok(SelectionPlan {
        batch,
        stats,
        quota,
        from_quota,
        from_remainder,
    })
}

/// Outcome of a committed round.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundReport {
    pub round: RoundIndex,
    /// Identifiers labeled this round, in selection order.
    pub selection: SelectionBatch,
    /// Cluster diagnostics; `None` for a shuffled first round.
    pub stats: Option<SelectionStats>,
    pub quota: usize,
    pub from_quota: usize,
    pub from_remainder: usize,
}

/// Owns the pool partition and runs acquisition rounds.
#[derive(Debug)]
pub struct AcquisitionEngine {
    config: AcquisitionConfig,
    partition: PoolPartition,
    completed_rounds: usize,
    round_log: Option<RoundLog>,
}

impl AcquisitionEngine {
    /// Engine over a fresh pool of `pool_size` unlabeled examples.
    pub fn new(config: AcquisitionConfig, pool_size: usize) -> Result<Self, AcquisitionError> {
        config.validate(pool_size)?;
        Ok(Self {
            config,
            partition: PoolPartition::new(pool_size),
            completed_rounds: 0,
            round_log: None,
        })
    }

    /// Continue an experiment from a snapshot taken with the same seed.
    pub fn resume(
        config: AcquisitionConfig,
        snapshot: &PoolSnapshot,
    ) -> Result<Self, AcquisitionError> {
        if snapshot.seed != config.seed {
            return Err(AcquisitionError::Configuration(format!(
                "snapshot seed {} does not match configured seed {}",
                snapshot.seed, config.seed
            )));
        }
        let partition = snapshot.partition()?;
        config.validate(partition.pool_size())?;
        Ok(Self {
            config,
            partition,
            completed_rounds: snapshot.completed_rounds,
            round_log: None,
        })
    }

    /// Append per-round diagnostics to `log`.
    pub fn with_round_log(mut self, log: RoundLog) -> Self {
        self.round_log = Some(log);
        self
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    pub fn partition(&self) -> &PoolPartition {
        &self.partition
    }

    /// Labeled identifiers in acquisition order.
    pub fn labeled(&self) -> &[ExampleId] {
        self.partition.labeled()
    }

    pub fn labeled_len(&self) -> usize {
        self.partition.labeled_len()
    }

    pub fn unlabeled_len(&self) -> usize {
        self.partition.unlabeled_len()
    }

    pub fn completed_rounds(&self) -> usize {
        self.completed_rounds
    }

    /// Ordered sampler over the labeled set for the training phase.
    pub fn training_sampler(&self) -> OrderedIndexSampler {
        OrderedIndexSampler::new(self.partition.labeled().to_vec())
    }

    /// Capture the current state for [`AcquisitionEngine::resume`].
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot::capture(&self.partition, self.config.seed, self.completed_rounds)
    }

    /// Run round `round`, scoring the unlabeled pool through `provider`.
    ///
    /// A shuffled first round never calls the provider.
    pub fn sample<P>(
        &mut self,
        round: RoundIndex,
        provider: &mut P,
    ) -> Result<RoundReport, AcquisitionError>
    where
        P: ScoreProvider + ?Sized,
    {
        self.check_round(round)?;
        if self.is_shuffled_first_round(round) {
            return self.seed_round(round);
        }
        let params = self.params_for(round);
        self.check_pool(params.budget)?;
        let ids = self.partition.unlabeled_ids();
        let scored = collect_scores(&ids, self.config.inference_batch_size, provider)?;
        self.select_and_commit(round, scored, params)
    }

    /// Run round `round` from inference rows computed by the caller.
    ///
    /// `scored` must hold exactly one row per unlabeled identifier, in
    /// ascending identifier order. A shuffled first round ignores it.
    pub fn sample_scored(
        &mut self,
        round: RoundIndex,
        scored: Vec<ScoredExample>,
    ) -> Result<RoundReport, AcquisitionError> {
        self.check_round(round)?;
        if self.is_shuffled_first_round(round) {
            return self.seed_round(round);
        }
        let params = self.params_for(round);
        self.check_pool(params.budget)?;
        validate_stream(&scored, &self.partition.unlabeled_ids())?;
        self.select_and_commit(round, scored, params)
    }

    fn check_round(&self, round: RoundIndex) -> Result<(), AcquisitionError> {
        if round != self.completed_rounds {
            return Err(AcquisitionError::Configuration(format!(
                "round {round} requested after {} completed rounds",
                self.completed_rounds
            )));
        }
        Ok(())
    }

    fn check_pool(&self, budget: usize) -> Result<(), AcquisitionError> {
        let available = self.partition.unlabeled_len();
        if available < budget {
            return Err(AcquisitionError::InsufficientPool { budget, available });
        }
        Ok(())
    }

    fn is_shuffled_first_round(&self, round: RoundIndex) -> bool {
        round == FIRST_ROUND && self.config.first_round == FirstRoundMode::Shuffle
    }

    fn params_for(&self, round: RoundIndex) -> SelectionParams {
        if round == FIRST_ROUND {
            SelectionParams {
                budget: self.config.initial_size,
                policy: QuotaPolicy::UniformAllClusters,
                draw: DrawMode::UniformRandom,
            }
        } else {
            SelectionParams {
                budget: self.config.budget,
                policy: self.config.incremental_policy,
                draw: DrawMode::TopScore,
            }
        }
    }

    fn seed_round(&mut self, round: RoundIndex) -> Result<RoundReport, AcquisitionError> {
        let mut rng = DeterministicRng::for_round(self.config.seed, round);
        let selection =
            PoolMutator::seed_initial(&mut self.partition, self.config.initial_size, &mut rng)?;
        info!(
            round,
            selected = selection.len(),
            unlabeled = self.partition.unlabeled_len(),
            "seeded labeled set with a random subset"
        );
        let report = RoundReport {
            round,
            from_remainder: selection.len(),
            selection,
            stats: None,
            quota: 0,
            from_quota: 0,
        };
        self.finish_round(&report);
        Ok(report)
    }

    fn select_and_commit(
        &mut self,
        round: RoundIndex,
        scored: Vec<ScoredExample>,
        params: SelectionParams,
    ) -> Result<RoundReport, AcquisitionError> {
        let mut rng = DeterministicRng::for_round(self.config.seed, round);
        let expected = self.partition.unlabeled_len();
        let plan = plan_selection(scored, expected, self.partition.unlabeled(), params, &mut rng)?;
        log_stats(round, &plan);

        PoolMutator::commit(&mut self.partition, plan.batch.clone())?;
        let report = RoundReport {
            round,
            selection: plan.batch,
            stats: Some(plan.stats),
            quota: plan.quota,
            from_quota: plan.from_quota,
            from_remainder: plan.from_remainder,
        };
        self.finish_round(&report);
        Ok(report)
    }

    fn finish_round(&mut self, report: &RoundReport) {
        self.completed_rounds += 1;
        let Some(log) = self.round_log.as_ref() else {
            return;
        };
        let entry = RoundLogEntry {
            round: report.round,
            recorded_at: Utc::now(),
            selected: report.selection.len(),
            from_quota: report.from_quota,
            from_remainder: report.from_remainder,
            quota: report.quota,
            labeled: self.partition.labeled_len(),
            unlabeled: self.partition.unlabeled_len(),
            stats: report.stats.clone(),
        };
        if let Err(err) = log.append(&entry) {
            warn!(round = report.round, error = %err, "failed to append round log entry");
        }
    }
}

fn log_stats(round: RoundIndex, plan: &SelectionPlan) {
    info!(
        round,
        clusters = plan.stats.cluster_count,
        quota = plan.quota,
        from_quota = plan.from_quota,
        from_remainder = plan.from_remainder,
        "selected labeling batch"
    );
    if let Some(means) = plan.stats.cluster_means {
        info!(
            round,
            min = means.min,
            max = means.max,
            mean = means.mean,
            std = means.std,
            "cluster mean score distribution"
        );
    }
    for cluster in &plan.stats.clusters {
        debug!(
            round,
            code = ?cluster.code.0,
            count = cluster.count,
            min = cluster.scores.min,
            max = cluster.scores.max,
            mean = cluster.scores.mean,
            std = cluster.scores.std,
            "cluster score distribution"
        );
    }
}
