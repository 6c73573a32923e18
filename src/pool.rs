//! Labeled/unlabeled partition of the example pool.
//!
//! `PoolPartition` is read-only to everyone; `PoolMutator` is the single
//! writer. Invariant: `labeled ∩ unlabeled = ∅` and their union is the pool.

use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use crate::data::SelectionBatch;
use crate::errors::AcquisitionError;
use crate::types::ExampleId;
use crate::validate::validate_selection;

/// Disjoint labeled (append-only, ordered) and unlabeled (set) identifiers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolPartition {
    labeled: Vec<ExampleId>,
    labeled_index: HashSet<ExampleId>,
    unlabeled: BTreeSet<ExampleId>,
}

impl PoolPartition {
    /// Fresh partition with `0..pool_size` unlabeled.
    pub fn new(pool_size: usize) -> Self {
        Self {
            labeled: Vec::new(),
            labeled_index: HashSet::new(),
            unlabeled: (0..pool_size).collect(),
        }
    }

    /// Rebuild a partition, rejecting overlap or repeated labeled identifiers.
    pub fn from_parts(
        labeled: Vec<ExampleId>,
        unlabeled: BTreeSet<ExampleId>,
    ) -> Result<Self, AcquisitionError> {
        let mut seen = HashSet::with_capacity(labeled.len());
        for id in &labeled {
            if !seen.insert(*id) {
                return Err(AcquisitionError::Configuration(format!(
                    "identifier {id} labeled more than once"
                )));
            }
            if unlabeled.contains(id) {
                return Err(AcquisitionError::Configuration(format!(
                    "identifier {id} is both labeled and unlabeled"
                )));
            }
        }
        Ok(Self {
            labeled,
            labeled_index: seen,
            unlabeled,
        })
    }

    /// Labeled identifiers in the order they were acquired.
    pub fn labeled(&self) -> &[ExampleId] {
        &self.labeled
    }

    /// Unlabeled identifiers (ascending).
    pub fn unlabeled(&self) -> &BTreeSet<ExampleId> {
        &self.unlabeled
    }

    /// Unlabeled identifiers as an ordered list, the order inference runs in.
    pub fn unlabeled_ids(&self) -> Vec<ExampleId> {
        self.unlabeled.iter().copied().collect()
    }

    pub fn labeled_len(&self) -> usize {
        self.labeled.len()
    }

    pub fn unlabeled_len(&self) -> usize {
        self.unlabeled.len()
    }

    /// Size of the whole pool.
    pub fn pool_size(&self) -> usize {
        self.labeled.len() + self.unlabeled.len()
    }

    pub fn is_labeled(&self, id: ExampleId) -> bool {
        self.labeled_index.contains(&id)
    }
}

/// The only writer of a [`PoolPartition`].
pub struct PoolMutator;

impl PoolMutator {
    /// Move every identifier of `batch` from unlabeled to labeled.
    ///
    /// All identifiers are checked before anything changes, so a failed
    /// commit leaves the partition untouched.
    pub fn commit(
        partition: &mut PoolPartition,
        batch: SelectionBatch,
    ) -> Result<(), AcquisitionError> {
        let missing: Vec<ExampleId> = batch
            .ids()
            .iter()
            .copied()
            .filter(|id| !partition.unlabeled.contains(id))
            .collect();
        if !missing.is_empty() {
            return Err(AcquisitionError::SelectionIntegrity {
                expected: batch.len(),
                distinct: batch.len() - missing.len(),
                details: format!("identifiers no longer unlabeled at commit: {missing:?}"),
            });
        }
        for id in batch.ids() {
            partition.unlabeled.remove(id);
            partition.labeled_index.insert(*id);
        }
        let committed = batch.len();
        partition.labeled.extend(batch.into_ids());
        debug!(
            committed,
            labeled = partition.labeled.len(),
            unlabeled = partition.unlabeled.len(),
            "committed selection"
        );
        Ok(())
    }

    /// Shuffle the unlabeled pool and label its first `initial_size` identifiers.
    pub fn seed_initial<R>(
        partition: &mut PoolPartition,
        initial_size: usize,
        rng: &mut R,
    ) -> Result<SelectionBatch, AcquisitionError>
    where
        R: Rng + ?Sized,
    {
        if partition.unlabeled.len() < initial_size {
            return Err(AcquisitionError::InsufficientPool {
                budget: initial_size,
                available: partition.unlabeled.len(),
            });
        }
        let mut shuffled = partition.unlabeled_ids();
        shuffled.shuffle(rng);
        shuffled.truncate(initial_size);
        let batch = validate_selection(shuffled, initial_size, &partition.unlabeled)?;
        Self::commit(partition, batch.clone())?;
        Ok(batch)
    }
}
