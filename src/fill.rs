use rand::Rng;
use rand::seq::index;

use crate::allocator::Allocation;
use crate::config::DrawMode;
use crate::data::by_score_desc;
use crate::types::ExampleId;

/// Candidate batch after the fill step, before validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DraftSelection {
    /// Quota draws followed by remainder draws.
    pub ids: Vec<ExampleId>,
    /// How many identifiers came from cluster quotas.
    pub from_quota: usize,
    /// How many identifiers came from the remainder pool.
    pub from_remainder: usize,
}

/// Tops a quota allocation up to the exact budget from its remainder pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemainderFiller {
    draw: DrawMode,
}

impl RemainderFiller {
    pub fn new(draw: DrawMode) -> Self {
        Self { draw }
    }

    /// Append `budget - selected` identifiers from the remainder pool.
    ///
    /// A remainder pool smaller than the shortfall yields a short draft; the
    /// validator rejects it.
    pub fn fill<R>(&self, allocation: Allocation, budget: usize, rng: &mut R) -> DraftSelection
    where
        R: Rng + ?Sized,
    {
        let Allocation {
            selected: mut ids,
            mut remainder,
            ..
        } = allocation;
        let from_quota = ids.len();
        let needed = budget.saturating_sub(from_quota).min(remainder.len());
        match self.draw {
            DrawMode::TopScore => {
                remainder.sort_by(by_score_desc);
                ids.extend(remainder[..needed].iter().map(|record| record.id));
            }
            DrawMode::UniformRandom => {
                ids.extend(
                    index::sample(rng, remainder.len(), needed)
                        .into_iter()
                        .map(|position| remainder[position].id),
                );
            }
        }
        DraftSelection {
            ids,
            from_quota,
            from_remainder: needed,
        }
    }
}
