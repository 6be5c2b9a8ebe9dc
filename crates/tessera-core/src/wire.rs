//! Transaction wire types — headers, chunks, and protocol events.
//!
//! A transaction moves one ordered collection across a channel that can
//! only carry a bounded number of elements per message. The sender
//! announces a [`TransactionHeader`], emits contiguous [`Chunk`]s of at
//! most [`MAX_CHUNK_ENTRIES`] elements, then signals completion.
//!
//! Everything here is plain data and is copied across the boundary by
//! value. Nothing in this module holds transaction state.

use std::collections::VecDeque;
use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Maximum number of elements carried by a single chunk.
///
/// Sized to keep a chunk of typical queue entries well under an IPC
/// payload ceiling. Not derived at runtime.
pub const MAX_CHUNK_ENTRIES: usize = 500;

// ── Transaction ID ────────────────────────────────────────────────────────────

/// Opaque identifier distinguishing transactions that share one channel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId([u8; 16]);

impl TransactionId {
    /// A fresh random identifier.
    pub fn generate() -> Self {
        Self(rand::random())
    }

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({self})")
    }
}

// ── Headers ───────────────────────────────────────────────────────────────────

/// Announced once, before any chunk. The only place the receiver learns
/// how many elements to expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHeader {
    pub transaction_id: TransactionId,
    /// Total element count. Fixed for the life of the transaction.
    pub total_size: usize,
}

impl TransactionHeader {
    pub fn new(transaction_id: TransactionId, total_size: usize) -> Self {
        Self {
            transaction_id,
            total_size,
        }
    }
}

/// Position of one chunk within its transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkHeader {
    pub transaction_id: TransactionId,
    /// Index of the chunk's first element in the full collection.
    pub offset: usize,
    /// Number of elements in the payload.
    pub size: usize,
}

/// One bounded slice of the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<P> {
    pub header: ChunkHeader,
    pub payload: P,
}

/// Payloads that can report how many elements they hold.
///
/// A received chunk is only applied when its payload holds exactly
/// `header.size` elements.
pub trait ChunkPayload {
    fn entry_count(&self) -> usize;
}

impl<E> ChunkPayload for Vec<E> {
    fn entry_count(&self) -> usize {
        self.len()
    }
}

impl<E> ChunkPayload for Box<[E]> {
    fn entry_count(&self) -> usize {
        self.len()
    }
}

impl<E> ChunkPayload for VecDeque<E> {
    fn entry_count(&self) -> usize {
        self.len()
    }
}

// ── Events ────────────────────────────────────────────────────────────────────

/// One step of the three-phase send: begin, zero or more data chunks, finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent<P> {
    Begin(TransactionHeader),
    Data(Chunk<P>),
    Finish(TransactionId),
}

impl<P> TransferEvent<P> {
    pub fn transaction_id(&self) -> TransactionId {
        match self {
            TransferEvent::Begin(header) => header.transaction_id,
            TransferEvent::Data(chunk) => chunk.header.transaction_id,
            TransferEvent::Finish(id) => *id,
        }
    }

    /// Short name for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            TransferEvent::Begin(_) => "begin",
            TransferEvent::Data(_) => "data",
            TransferEvent::Finish(_) => "finish",
        }
    }
}

// ── Chunk planning ────────────────────────────────────────────────────────────

/// Element ranges for a collection of `total` elements.
///
/// Ranges are contiguous and start at 0. Every range is non-empty and at
/// most [`MAX_CHUNK_ENTRIES`] long. An empty collection yields no ranges.
pub fn chunk_ranges(total: usize) -> ChunkRanges {
    ChunkRanges { offset: 0, total }
}

#[derive(Debug, Clone)]
pub struct ChunkRanges {
    offset: usize,
    total: usize,
}

impl Iterator for ChunkRanges {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        if self.offset >= self.total {
            return None;
        }
        let start = self.offset;
        let end = start + MAX_CHUNK_ENTRIES.min(self.total - start);
        self.offset = end;
        Some(start..end)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.total - self.offset.min(self.total)).div_ceil(MAX_CHUNK_ENTRIES);
        (left, Some(left))
    }
}

impl ExactSizeIterator for ChunkRanges {}
