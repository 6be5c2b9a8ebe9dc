//! Incoming transactions — validate chunks in arrival order and fold
//! them into the destination collection.
//!
//! State is a single running offset. A chunk is accepted only if it
//! belongs to this transaction, starts exactly at the running offset,
//! fits inside the declared total and carries as many elements as its
//! header declares. Accepting a chunk is the only thing that changes
//! state.

use std::marker::PhantomData;

use tessera_core::wire::{Chunk, ChunkHeader, ChunkPayload, TransactionHeader};
use tessera_core::TransactionError;

/// Folds one chunk payload into the running aggregate.
pub trait Aggregator<T, P> {
    fn aggregate(&mut self, aggregate: &mut T, payload: P, offset: usize);
}

impl<T, P, F> Aggregator<T, P> for F
where
    F: FnMut(&mut T, P, usize),
{
    fn aggregate(&mut self, aggregate: &mut T, payload: P, offset: usize) {
        self(aggregate, payload, offset)
    }
}

/// Receiving half of one transaction.
///
/// Not synchronized. Callers that receive chunks on several threads must
/// serialize access themselves.
pub struct IncomingTransaction<T, P, A> {
    header: TransactionHeader,
    expected_offset: usize,
    aggregate: T,
    aggregator: A,
    _payload: PhantomData<fn(P)>,
}

impl<T, P, A> IncomingTransaction<T, P, A>
where
    A: Aggregator<T, P>,
{
    /// `empty` is the aggregate before any chunk arrives.
    pub fn new(header: TransactionHeader, empty: T, aggregator: A) -> Self {
        Self {
            header,
            expected_offset: 0,
            aggregate: empty,
            aggregator,
            _payload: PhantomData,
        }
    }

    pub fn builder() -> IncomingBuilder<T, P, A> {
        IncomingBuilder {
            header: None,
            empty: None,
            aggregator: None,
            _payload: PhantomData,
        }
    }

    /// Apply the next chunk.
    ///
    /// Fails without touching state if the chunk belongs to another
    /// transaction, leaves a gap, repeats already-applied data, runs past
    /// the declared total, or carries a payload of the wrong length.
    pub fn receive(&mut self, chunk: Chunk<P>) -> Result<(), TransactionError>
    where
        P: ChunkPayload,
    {
        let ChunkHeader {
            transaction_id,
            offset,
            size,
        } = chunk.header;
        let expected = self.expected_offset;

        if transaction_id != self.header.transaction_id {
            return Err(TransactionError::ForeignChunk {
                expected: self.header.transaction_id,
                actual: transaction_id,
            });
        }
        if offset > expected {
            return Err(TransactionError::EarlyChunk { offset, expected });
        }
        if offset < expected {
            return Err(TransactionError::DuplicateChunk { offset, expected });
        }
        if size > self.remaining() {
            return Err(TransactionError::OversizedChunk {
                offset,
                size,
                total: self.header.total_size,
            });
        }
        let entries = chunk.payload.entry_count();
        if entries != size {
            return Err(TransactionError::PayloadMismatch {
                offset,
                size,
                entries,
            });
        }

        self.aggregator
            .aggregate(&mut self.aggregate, chunk.payload, offset);
        self.expected_offset += size;

        tracing::trace!(
            transaction_id = %transaction_id,
            offset,
            size,
            received = self.expected_offset,
            total = self.header.total_size,
            "chunk accepted"
        );
        if self.is_complete() {
            tracing::debug!(
                transaction_id = %transaction_id,
                total = self.header.total_size,
                "transaction complete"
            );
        }
        Ok(())
    }
}

impl<T, P, A> IncomingTransaction<T, P, A> {
    pub fn header(&self) -> TransactionHeader {
        self.header
    }

    /// Offset the next chunk must start at. Equals the number of
    /// elements accepted so far.
    pub fn expected_offset(&self) -> usize {
        self.expected_offset
    }

    pub fn remaining(&self) -> usize {
        self.header.total_size - self.expected_offset
    }

    pub fn is_complete(&self) -> bool {
        self.expected_offset == self.header.total_size
    }

    /// The reassembled collection. Fails until every element has arrived;
    /// a failed call leaves the transaction as it was.
    pub fn data(&self) -> Result<&T, TransactionError> {
        self.check_complete()?;
        Ok(&self.aggregate)
    }

    /// Take the reassembled collection, consuming the transaction.
    pub fn into_data(self) -> Result<T, TransactionError> {
        self.check_complete()?;
        Ok(self.aggregate)
    }

    fn check_complete(&self) -> Result<(), TransactionError> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(TransactionError::IncompleteTransmission {
                received: self.expected_offset,
                total: self.header.total_size,
            })
        }
    }
}

/// Builder for [`IncomingTransaction`] when the header or aggregator may
/// be missing, e.g. when wiring from optional transport state.
pub struct IncomingBuilder<T, P, A> {
    header: Option<TransactionHeader>,
    empty: Option<T>,
    aggregator: Option<A>,
    _payload: PhantomData<fn(P)>,
}

impl<T, P, A> IncomingBuilder<T, P, A>
where
    T: Default,
    A: Aggregator<T, P>,
{
    pub fn header(mut self, header: TransactionHeader) -> Self {
        self.header = Some(header);
        self
    }

    /// Starting aggregate. Defaults to `T::default()`.
    pub fn empty(mut self, empty: T) -> Self {
        self.empty = Some(empty);
        self
    }

    pub fn aggregator(mut self, aggregator: A) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn build(self) -> Result<IncomingTransaction<T, P, A>, TransactionError> {
        let header = self
            .header
            .ok_or(TransactionError::InvalidArgument("header is required"))?;
        let aggregator = self
            .aggregator
            .ok_or(TransactionError::InvalidArgument("aggregator is required"))?;
        Ok(IncomingTransaction::new(
            header,
            self.empty.unwrap_or_default(),
            aggregator,
        ))
    }
}
