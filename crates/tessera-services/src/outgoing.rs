//! Outgoing transactions — slice a collection into bounded chunks and
//! drive the begin → data → finish sequence.
//!
//! The transaction borrows its source for its whole lifetime and is
//! consumed by a single send. Chunk boundaries come from
//! [`chunk_ranges`], so every send of the same collection produces the
//! same chunks.

use std::marker::PhantomData;

use tessera_core::wire::{
    chunk_ranges, Chunk, ChunkHeader, ChunkRanges, TransactionHeader, TransactionId,
    TransferEvent,
};

/// One pending transfer of `data`.
///
/// `slicer(data, start, end)` must return elements `start..end` of the
/// source. It is trusted: a panicking slicer panics the send.
pub struct OutgoingTransaction<'a, S: ?Sized, P, F> {
    header: TransactionHeader,
    data: &'a S,
    slicer: F,
    _payload: PhantomData<fn() -> P>,
}

impl<'a, S, P, F> OutgoingTransaction<'a, S, P, F>
where
    S: ?Sized,
    F: Fn(&S, usize, usize) -> P,
{
    /// A transaction with a fresh random id.
    pub fn new(data: &'a S, size: usize, slicer: F) -> Self {
        Self::with_id(TransactionId::generate(), data, size, slicer)
    }

    pub fn with_id(transaction_id: TransactionId, data: &'a S, size: usize, slicer: F) -> Self {
        Self {
            header: TransactionHeader::new(transaction_id, size),
            data,
            slicer,
            _payload: PhantomData,
        }
    }

    /// The header announced at the start of the send.
    pub fn header(&self) -> TransactionHeader {
        self.header
    }

    /// The full event sequence, produced lazily: one `Begin`, one `Data`
    /// per chunk in increasing offset order, then one `Finish`.
    pub fn events(self) -> Events<'a, S, P, F> {
        Events {
            transaction: self,
            phase: Phase::Begin,
        }
    }

    /// Push every event through `sink`, stopping at the first error.
    /// Sink errors are returned unchanged.
    pub fn send<E>(self, mut sink: impl FnMut(TransferEvent<P>) -> Result<(), E>) -> Result<(), E> {
        for event in self.events() {
            sink(event)?;
        }
        Ok(())
    }

    /// Three-callback form of [`send`](Self::send).
    pub fn transmit<E>(
        self,
        mut announce: impl FnMut(TransactionHeader) -> Result<(), E>,
        mut send_chunk: impl FnMut(Chunk<P>) -> Result<(), E>,
        mut finish: impl FnMut() -> Result<(), E>,
    ) -> Result<(), E> {
        self.send(|event| match event {
            TransferEvent::Begin(header) => announce(header),
            TransferEvent::Data(chunk) => send_chunk(chunk),
            TransferEvent::Finish(_) => finish(),
        })
    }
}

enum Phase {
    Begin,
    Data(ChunkRanges),
    Done,
}

/// Iterator returned by [`OutgoingTransaction::events`].
pub struct Events<'a, S: ?Sized, P, F> {
    transaction: OutgoingTransaction<'a, S, P, F>,
    phase: Phase,
}

impl<S, P, F> Iterator for Events<'_, S, P, F>
where
    S: ?Sized,
    F: Fn(&S, usize, usize) -> P,
{
    type Item = TransferEvent<P>;

    fn next(&mut self) -> Option<TransferEvent<P>> {
        let header = self.transaction.header;
        match std::mem::replace(&mut self.phase, Phase::Done) {
            Phase::Begin => {
                tracing::debug!(
                    transaction_id = %header.transaction_id,
                    total_size = header.total_size,
                    "transaction begin"
                );
                self.phase = Phase::Data(chunk_ranges(header.total_size));
                Some(TransferEvent::Begin(header))
            }
            Phase::Data(mut ranges) => match ranges.next() {
                Some(range) => {
                    let payload = (self.transaction.slicer)(
                        self.transaction.data,
                        range.start,
                        range.end,
                    );
                    let chunk_header = ChunkHeader {
                        transaction_id: header.transaction_id,
                        offset: range.start,
                        size: range.len(),
                    };
                    tracing::trace!(
                        transaction_id = %header.transaction_id,
                        offset = chunk_header.offset,
                        size = chunk_header.size,
                        "chunk emitted"
                    );
                    self.phase = Phase::Data(ranges);
                    Some(TransferEvent::Data(Chunk {
                        header: chunk_header,
                        payload,
                    }))
                }
                None => {
                    tracing::debug!(transaction_id = %header.transaction_id, "transaction finish");
                    Some(TransferEvent::Finish(header.transaction_id))
                }
            },
            Phase::Done => None,
        }
    }
}
