use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::constants::allocator::DEFAULT_CLUSTER_CAP;
use crate::constants::config::{
    DEFAULT_BUDGET, DEFAULT_INFERENCE_BATCH_SIZE, DEFAULT_INITIAL_SIZE, DEFAULT_SEED,
};
use crate::errors::AcquisitionError;

/// How many examples each cluster contributes before overflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaPolicy {
    /// Only the top `cap` clusters by mean score receive a quota of
    /// `budget / cap`; every other cluster overflows in full.
    CappedTopK {
        /// Number of top-ranked clusters considered.
        cap: usize,
    },
    /// Every cluster receives a quota of `budget / cluster_count`.
    UniformAllClusters,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        QuotaPolicy::CappedTopK {
            cap: DEFAULT_CLUSTER_CAP,
        }
    }
}

/// How records are drawn within a cluster quota and from the remainder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawMode {
    /// Highest scores first.
    TopScore,
    /// Uniform random without replacement; scores are ignored.
    UniformRandom,
}

/// How round zero seeds the labeled set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstRoundMode {
    /// Shuffle the pool and take the first `initial_size` identifiers.
    #[default]
    Shuffle,
    /// Uniform quota over every cluster with random draws, then a random fill.
    ClusterUniform,
}

/// Top-level acquisition configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// RNG seed controlling every random draw.
    pub seed: u64,
    /// Examples moved to the labeled set per incremental round.
    pub budget: usize,
    /// Examples moved to the labeled set in round zero.
    pub initial_size: usize,
    /// Mini-batch size used for the ordered inference pass.
    pub inference_batch_size: usize,
    /// Quota policy for incremental rounds.
    pub incremental_policy: QuotaPolicy,
    /// Strategy for round zero.
    pub first_round: FirstRoundMode,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            budget: DEFAULT_BUDGET,
            initial_size: DEFAULT_INITIAL_SIZE,
            inference_batch_size: DEFAULT_INFERENCE_BATCH_SIZE,
            incremental_policy: QuotaPolicy::default(),
            first_round: FirstRoundMode::default(),
        }
    }
}

impl AcquisitionConfig {
    /// Load a configuration from a JSON file; absent fields keep their defaults.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, AcquisitionError> {
        let raw = fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&raw).map_err(|err| {
            AcquisitionError::Configuration(format!(
                "failed to parse {}: {err}",
                path.as_ref().display()
            ))
        })
    }

    /// Reject values that cannot produce an exact-size batch from `pool_size` examples.
    pub fn validate(&self, pool_size: usize) -> Result<(), AcquisitionError> {
        if self.budget == 0 {
            return Err(AcquisitionError::Configuration(
                "budget must be positive".to_string(),
            ));
        }
        if self.initial_size == 0 {
            return Err(AcquisitionError::Configuration(
                "initial_size must be positive".to_string(),
            ));
        }
        if self.inference_batch_size == 0 {
            return Err(AcquisitionError::Configuration(
                "inference_batch_size must be positive".to_string(),
            ));
        }
        if let QuotaPolicy::CappedTopK { cap: 0 } = self.incremental_policy {
            return Err(AcquisitionError::Configuration(
                "cluster cap must be positive".to_string(),
            ));
        }
        if self.budget > pool_size {
            return Err(AcquisitionError::Configuration(format!(
                "budget {} exceeds pool size {pool_size}",
                self.budget
            )));
        }
        if self.initial_size > pool_size {
            return Err(AcquisitionError::Configuration(format!(
                "initial_size {} exceeds pool size {pool_size}",
                self.initial_size
            )));
        }
        Ok(())
    }
}
