//! Transaction errors — every protocol violation has its own variant.
//!
//! Violations are reported at the call that caused them. Nothing here is
//! retried or repaired; recovery belongs to the caller.

use crate::wire::TransactionId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    /// A required construction argument was missing or unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The chunk starts behind the running offset; some of it was already applied.
    #[error("duplicate chunk at offset {offset} (expected offset {expected})")]
    DuplicateChunk { offset: usize, expected: usize },

    /// The chunk starts ahead of the running offset; an earlier chunk is missing.
    #[error("chunk at offset {offset} arrived early (expected offset {expected})")]
    EarlyChunk { offset: usize, expected: usize },

    #[error("chunk of {size} entries at offset {offset} overruns declared total of {total}")]
    OversizedChunk {
        offset: usize,
        size: usize,
        total: usize,
    },

    /// The payload does not hold the number of elements its header declares.
    #[error("chunk at offset {offset} declares {size} entries but carries {entries}")]
    PayloadMismatch {
        offset: usize,
        size: usize,
        entries: usize,
    },

    #[error("transmission incomplete: {received} of {total} entries received")]
    IncompleteTransmission { received: usize, total: usize },

    /// The chunk was produced for a different transaction.
    #[error("chunk belongs to transaction {actual}, not {expected}")]
    ForeignChunk {
        expected: TransactionId,
        actual: TransactionId,
    },
}
