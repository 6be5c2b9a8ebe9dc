//! Playback queue service — the feature that moves large queues through
//! list transactions.
//!
//! Short queues travel inline in one `Set` command. Longer ones are sent
//! as a list transaction whose finish step is a `Commit` carrying the
//! playback position. A transfer that fails is a hard failure of that
//! transfer only: the service logs it, falls back to an empty queue and
//! reports the error. Events for a transaction that is not open, or a
//! begin refused by the open limit, are reported without touching the
//! current queue. Nothing is retried.

use std::fmt::Display;

use tokio::sync::mpsc;

use tessera_core::config::RouterConfig;
use tessera_core::wire::{chunk_ranges, TransactionId, TransferEvent, MAX_CHUNK_ENTRIES};
use tessera_core::TransactionError;

use crate::channel::TransportError;
use crate::list::ListTransaction;
use crate::router::{ListRouter, RouterError};

/// Messages accepted by [`QueueService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueCommand<E> {
    /// Replace the queue in one message.
    Set { queue: Vec<E>, position: usize },
    /// Begin or data step of a chunked queue transfer.
    Transfer(TransferEvent<Vec<E>>),
    /// Finish a chunked transfer and make it the current queue.
    Commit {
        transaction_id: TransactionId,
        position: usize,
    },
}

/// Commands that replace the remote queue with `queue`.
///
/// Queues of at most [`MAX_CHUNK_ENTRIES`] entries yield a single `Set`.
pub fn queue_commands<E: Clone>(
    queue: &[E],
    position: usize,
) -> impl Iterator<Item = QueueCommand<E>> + '_ {
    let inline = (queue.len() <= MAX_CHUNK_ENTRIES).then(|| QueueCommand::Set {
        queue: queue.to_vec(),
        position,
    });
    let chunked = inline.is_none().then(|| {
        ListTransaction::send(queue)
            .events()
            .map(move |event| match event {
                TransferEvent::Finish(transaction_id) => QueueCommand::Commit {
                    transaction_id,
                    position,
                },
                other => QueueCommand::Transfer(other),
            })
    });
    inline.into_iter().chain(chunked.into_iter().flatten())
}

/// Sending side, bound to a service's command channel.
#[derive(Clone)]
pub struct QueueClient<E> {
    tx: mpsc::Sender<QueueCommand<E>>,
}

impl<E: Clone> QueueClient<E> {
    pub fn new(tx: mpsc::Sender<QueueCommand<E>>) -> Self {
        Self { tx }
    }

    pub async fn set_queue(&self, queue: &[E], position: usize) -> Result<(), TransportError> {
        for command in queue_commands(queue, position) {
            self.tx
                .send(command)
                .await
                .map_err(|_| TransportError::Closed)?;
        }
        tracing::debug!(entries = queue.len(), position, "queue sent");
        Ok(())
    }
}

/// Owns the current queue and the transfers that may replace it.
pub struct QueueService<E> {
    queue: Vec<E>,
    position: usize,
    router: ListRouter<E>,
}

impl<E: Clone> QueueService<E> {
    pub fn new(config: &RouterConfig) -> Self {
        Self {
            queue: Vec::new(),
            position: 0,
            router: ListRouter::for_lists(config),
        }
    }

    pub fn handle(&mut self, command: QueueCommand<E>) -> Result<(), RouterError> {
        match command {
            QueueCommand::Set { queue, position } => {
                self.replace(queue, position);
                Ok(())
            }
            QueueCommand::Transfer(event) => match self.router.handle(event) {
                Ok(Some(completed)) => {
                    // Finish sent without a commit; keep the position at the start.
                    self.replace(completed.data, 0);
                    Ok(())
                }
                Ok(None) => Ok(()),
                Err(e) => Err(self.fail(e)),
            },
            QueueCommand::Commit {
                transaction_id,
                position,
            } => match self.router.handle(TransferEvent::Finish(transaction_id)) {
                Ok(Some(completed)) => {
                    self.replace(completed.data, position);
                    Ok(())
                }
                Ok(None) => Ok(()),
                Err(e) => Err(self.fail(e)),
            },
        }
    }

    fn replace(&mut self, queue: Vec<E>, position: usize) {
        self.position = if position < queue.len() { position } else { 0 };
        self.queue = queue;
        tracing::info!(
            entries = self.queue.len(),
            position = self.position,
            "queue replaced"
        );
    }

    fn fail(&mut self, error: RouterError) -> RouterError {
        match error {
            RouterError::Transaction { .. } => {
                tracing::warn!(error = %error, "queue transfer failed, falling back to an empty queue");
                self.queue.clear();
                self.position = 0;
            }
            RouterError::UnknownTransaction(_) | RouterError::TooManyOpen { .. } => {
                tracing::warn!(error = %error, "queue command ignored");
            }
        }
        error
    }

    pub fn queue(&self) -> &[E] {
        &self.queue
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn queue_size(&self) -> usize {
        self.queue.len()
    }

    /// Entries `offset..offset + len` of the current queue, for readers
    /// pulling the queue in bounded pieces.
    pub fn queue_chunk(&self, offset: usize, len: usize) -> Result<Vec<E>, TransactionError> {
        if len > MAX_CHUNK_ENTRIES {
            return Err(TransactionError::InvalidArgument(
                "chunk length exceeds MAX_CHUNK_ENTRIES",
            ));
        }
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= self.queue.len())
            .ok_or(TransactionError::InvalidArgument("chunk range outside the queue"))?;
        Ok(self.queue[offset..end].to_vec())
    }
}

/// Read a collection of `total` entries in bounded pieces.
///
/// `fetch(offset, len)` returns one piece. If a fetch fails (e.g. the
/// remote queue changed size mid-read) reading stops and whatever was
/// read so far is returned.
pub fn read_paged<E, Err: Display>(
    total: usize,
    mut fetch: impl FnMut(usize, usize) -> Result<Vec<E>, Err>,
) -> Vec<E> {
    let mut entries = Vec::new();
    for range in chunk_ranges(total) {
        match fetch(range.start, range.len()) {
            Ok(piece) => entries.extend(piece),
            Err(e) => {
                tracing::debug!(
                    error = %e,
                    read = entries.len(),
                    total,
                    "paged read stopped early"
                );
                break;
            }
        }
    }
    entries
}
