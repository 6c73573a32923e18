//! Ordered identifier iteration for batched inference.
//!
//! Row `i` of any pass driven by an [`OrderedIndexSampler`] belongs to
//! `identifiers[i]`: no shuffling, no dropped rows, and a short final batch
//! instead of padding.

use std::sync::Arc;

use crate::types::ExampleId;

/// Deterministic iterator over an explicit list of pool identifiers.
///
/// Cloning is cheap and restarts share the same backing list.
#[derive(Clone, Debug)]
pub struct OrderedIndexSampler {
    ids: Arc<[ExampleId]>,
    cursor: usize,
}

impl OrderedIndexSampler {
    /// Build a sampler that yields `ids` in order.
    pub fn new(ids: impl Into<Arc<[ExampleId]>>) -> Self {
        Self {
            ids: ids.into(),
            cursor: 0,
        }
    }

    /// Identifiers this sampler walks, in emission order.
    pub fn identifiers(&self) -> &[ExampleId] {
        &self.ids
    }

    /// Total identifiers per pass (independent of the current cursor).
    pub fn total(&self) -> usize {
        self.ids.len()
    }

    /// Fresh sampler positioned at the first identifier.
    pub fn restart(&self) -> Self {
        Self {
            ids: Arc::clone(&self.ids),
            cursor: 0,
        }
    }

    /// Group the remaining identifiers into consecutive batches of `batch_size`.
    ///
    /// The last batch holds whatever is left. `batch_size == 0` is treated as `1`.
    pub fn batches(self, batch_size: usize) -> IndexBatches {
        IndexBatches {
            sampler: self,
            batch_size: batch_size.max(1),
        }
    }
}

impl Iterator for OrderedIndexSampler {
    type Item = ExampleId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.ids.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.ids.len() - self.cursor;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for OrderedIndexSampler {}

/// Consecutive mini-batches drawn from an [`OrderedIndexSampler`].
#[derive(Clone, Debug)]
pub struct IndexBatches {
    sampler: OrderedIndexSampler,
    batch_size: usize,
}

impl IndexBatches {
    /// Number of batches a full pass produces.
    pub fn batch_count(&self) -> usize {
        self.sampler.len().div_ceil(self.batch_size)
    }
}

impl Iterator for IndexBatches {
    type Item = Vec<ExampleId>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch: Vec<ExampleId> = self.sampler.by_ref().take(self.batch_size).collect();
        if batch.is_empty() { None } else { Some(batch) }
    }
}
