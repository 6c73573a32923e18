use std::io;

use thiserror::Error;

use crate::types::Details;

/// Error type for configuration, alignment, selection, and persistence failures.
///
/// Every variant aborts the current round; nothing is committed to the pool
/// partition when one is returned.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("inference stream misaligned: expected {expected} rows, received {received} ({details})")]
    Alignment {
        expected: usize,
        received: usize,
        details: Details,
    },
    #[error("selection integrity violated: expected {expected} distinct identifiers, got {distinct} ({details})")]
    SelectionIntegrity {
        expected: usize,
        distinct: usize,
        details: Details,
    },
    #[error("unlabeled pool too small: budget {budget}, available {available}")]
    InsufficientPool { budget: usize, available: usize },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("score provider failure: {0}")]
    Provider(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}
