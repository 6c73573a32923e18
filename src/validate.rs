use std::collections::{BTreeSet, HashMap};

use crate::data::{ScoredExample, SelectionBatch};
use crate::errors::AcquisitionError;
use crate::types::ExampleId;

/// Check a candidate batch and seal it as a [`SelectionBatch`].
///
/// Requires exactly `budget` distinct identifiers, all members of
/// `unlabeled` (the start-of-round set). Duplicates are reported, never
/// collapsed away.
pub fn validate_selection(
    ids: Vec<ExampleId>,
    budget: usize,
    unlabeled: &BTreeSet<ExampleId>,
) -> Result<SelectionBatch, AcquisitionError> {
    let mut counts: HashMap<ExampleId, usize> = HashMap::with_capacity(ids.len());
    for id in &ids {
        *counts.entry(*id).or_insert(0) += 1;
    }
    let distinct = counts.len();

    let mut repeated: Vec<(ExampleId, usize)> = counts
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(id, count)| (*id, *count))
        .collect();
    if !repeated.is_empty() {
        repeated.sort_unstable();
        let listed: Vec<String> = repeated
            .iter()
            .map(|(id, count)| format!("identifier {id} drawn {count} times"))
            .collect();
        return Err(AcquisitionError::SelectionIntegrity {
            expected: budget,
            distinct,
            details: listed.join(", "),
        });
    }

    if distinct != budget {
        return Err(AcquisitionError::SelectionIntegrity {
            expected: budget,
            distinct,
            details: format!("batch holds {} identifiers", ids.len()),
        });
    }

    let mut foreign: Vec<ExampleId> = ids
        .iter()
        .copied()
        .filter(|id| !unlabeled.contains(id))
        .collect();
    if !foreign.is_empty() {
        foreign.sort_unstable();
        return Err(AcquisitionError::SelectionIntegrity {
            expected: budget,
            distinct,
            details: format!("identifiers not in the unlabeled pool: {foreign:?}"),
        });
    }

    Ok(SelectionBatch::new_unchecked(ids))
}

/// Check that an externally computed inference stream scores exactly
/// `requested`, one row per identifier, in the same order.
///
/// A repeated identifier is a [`AcquisitionError::SelectionIntegrity`]
/// failure; a wrong length, missing or foreign identifiers, or a reordered
/// stream are [`AcquisitionError::Alignment`] failures.
pub fn validate_stream(
    scored: &[ScoredExample],
    requested: &[ExampleId],
) -> Result<(), AcquisitionError> {
    let expected = requested.len();
    let received = scored.len();
    if received != expected {
        return Err(AcquisitionError::Alignment {
            expected,
            received,
            details: "row count differs from requested identifiers".to_string(),
        });
    }

    let mut counts: HashMap<ExampleId, usize> = HashMap::with_capacity(received);
    for row in scored {
        *counts.entry(row.id).or_insert(0) += 1;
    }
    let mut repeated: Vec<(ExampleId, usize)> = counts
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(id, count)| (*id, *count))
        .collect();
    if !repeated.is_empty() {
        repeated.sort_unstable();
        let listed: Vec<String> = repeated
            .iter()
            .map(|(id, count)| format!("identifier {id} scored {count} times"))
            .collect();
        return Err(AcquisitionError::SelectionIntegrity {
            expected,
            distinct: counts.len(),
            details: listed.join(", "),
        });
    }

    let requested_set: BTreeSet<ExampleId> = requested.iter().copied().collect();
    let missing: Vec<ExampleId> = requested_set
        .iter()
        .copied()
        .filter(|id| !counts.contains_key(id))
        .collect();
    let mut foreign: Vec<ExampleId> = counts
        .keys()
        .copied()
        .filter(|id| !requested_set.contains(id))
        .collect();
    if !missing.is_empty() || !foreign.is_empty() {
        foreign.sort_unstable();
        return Err(AcquisitionError::Alignment {
            expected,
            received,
            details: format!("missing identifiers {missing:?}, unexpected identifiers {foreign:?}"),
        });
    }

    if let Some((row, (got, want))) = scored
        .iter()
        .map(|row| row.id)
        .zip(requested.iter().copied())
        .enumerate()
        .find(|(_, (got, want))| got != want)
    {
        return Err(AcquisitionError::Alignment {
            expected,
            received,
            details: format!("row {row} carries identifier {got}, expected {want}"),
        });
    }
    Ok(())
}
