//! Transaction router — demultiplexes transfer events by transaction id.
//!
//! The protocol itself keeps no cross-transaction state. When several
//! transactions share a channel, the receiving side runs one router per
//! channel; the router opens an [`IncomingTransaction`] on each begin,
//! routes data to it, and hands back the collection on finish.
//!
//! A transaction that fails (bad chunk, finish before all data) is
//! discarded. Other open transactions are unaffected.

use std::collections::HashMap;

use tessera_core::config::RouterConfig;
use tessera_core::wire::{ChunkPayload, TransactionHeader, TransactionId, TransferEvent};
use tessera_core::TransactionError;

use crate::incoming::{Aggregator, IncomingTransaction};
use crate::list::{IncomingList, ListTransaction};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    #[error("no open transaction {0}")]
    UnknownTransaction(TransactionId),

    #[error("too many open transactions (limit {limit})")]
    TooManyOpen { limit: usize },

    #[error("transaction {id} failed: {source}")]
    Transaction {
        id: TransactionId,
        source: TransactionError,
    },
}

/// A finished transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed<T> {
    pub header: TransactionHeader,
    pub data: T,
}

pub struct TransactionRouter<T, P, A, N> {
    open: HashMap<TransactionId, IncomingTransaction<T, P, A>>,
    factory: N,
    max_open: usize,
}

pub type ListRouter<E> =
    TransactionRouter<Vec<E>, Vec<E>, crate::list::ListAggregator<E>, fn(TransactionHeader) -> IncomingList<E>>;

impl<E> ListRouter<E> {
    /// Router whose transactions reassemble `Vec<E>`.
    pub fn for_lists(config: &RouterConfig) -> Self {
        TransactionRouter::new(
            config,
            ListTransaction::receive::<E> as fn(TransactionHeader) -> IncomingList<E>,
        )
    }
}

impl<T, P, A, N> TransactionRouter<T, P, A, N>
where
    P: ChunkPayload,
    A: Aggregator<T, P>,
    N: Fn(TransactionHeader) -> IncomingTransaction<T, P, A>,
{
    /// `factory` builds the incoming side for each announced header.
    pub fn new(config: &RouterConfig, factory: N) -> Self {
        Self {
            open: HashMap::new(),
            factory,
            max_open: config.max_open_transactions,
        }
    }

    /// Process one event. Returns the collection when a transaction finishes.
    pub fn handle(
        &mut self,
        event: TransferEvent<P>,
    ) -> Result<Option<Completed<T>>, RouterError> {
        match event {
            TransferEvent::Begin(header) => {
                self.begin(header)?;
                Ok(None)
            }
            TransferEvent::Data(chunk) => {
                let id = chunk.header.transaction_id;
                let transaction = self
                    .open
                    .get_mut(&id)
                    .ok_or(RouterError::UnknownTransaction(id))?;
                if let Err(source) = transaction.receive(chunk) {
                    self.open.remove(&id);
                    tracing::warn!(transaction_id = %id, error = %source, "chunk rejected, transaction discarded");
                    return Err(RouterError::Transaction { id, source });
                }
                Ok(None)
            }
            TransferEvent::Finish(id) => {
                let transaction = self
                    .open
                    .remove(&id)
                    .ok_or(RouterError::UnknownTransaction(id))?;
                let header = transaction.header();
                match transaction.into_data() {
                    Ok(data) => {
                        tracing::debug!(
                            transaction_id = %id,
                            total = header.total_size,
                            "transaction closed"
                        );
                        Ok(Some(Completed { header, data }))
                    }
                    Err(source) => {
                        tracing::warn!(transaction_id = %id, error = %source, "finish before all data arrived");
                        Err(RouterError::Transaction { id, source })
                    }
                }
            }
        }
    }

    fn begin(&mut self, header: TransactionHeader) -> Result<(), RouterError> {
        let id = header.transaction_id;
        if self.open.contains_key(&id) {
            tracing::info!(transaction_id = %id, "transaction already open, dropping previous");
        } else if self.open.len() >= self.max_open {
            return Err(RouterError::TooManyOpen {
                limit: self.max_open,
            });
        }
        tracing::debug!(transaction_id = %id, total = header.total_size, "transaction opened");
        self.open.insert(id, (self.factory)(header));
        Ok(())
    }

    /// Drop an open transaction. Returns false if it was not open.
    pub fn abandon(&mut self, id: &TransactionId) -> bool {
        let removed = self.open.remove(id).is_some();
        if removed {
            tracing::info!(transaction_id = %id, "transaction abandoned");
        }
        removed
    }

    pub fn is_open(&self, id: &TransactionId) -> bool {
        self.open.contains_key(id)
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}
