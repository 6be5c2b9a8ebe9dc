//! In-process frame transport over a bounded tokio channel.
//!
//! Stands in for an IPC link with a hard message ceiling: every event is
//! encoded with [`tessera_core::frame`] and frames larger than
//! `max_frame_bytes` are refused at the sender. Delivery is ordered and
//! lossless, which is all the transaction protocol asks of a transport.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;

use tessera_core::config::TransportConfig;
use tessera_core::frame::{self, FrameError};
use tessera_core::wire::{TransactionHeader, TransferEvent};

use crate::outgoing::OutgoingTransaction;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("frame of {len} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { len: usize, limit: usize },

    #[error("channel closed")]
    Closed,

    #[error("bad frame: {0}")]
    Frame(#[from] FrameError),
}

/// A connected sender/receiver pair.
pub fn channel(config: &TransportConfig) -> (FrameSender, FrameReceiver) {
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    (
        FrameSender {
            tx,
            max_frame_bytes: config.max_frame_bytes,
        },
        FrameReceiver { rx },
    )
}

#[derive(Clone)]
pub struct FrameSender {
    tx: mpsc::Sender<Bytes>,
    max_frame_bytes: usize,
}

impl FrameSender {
    pub async fn send_event<P: Serialize>(
        &self,
        event: &TransferEvent<P>,
    ) -> Result<(), TransportError> {
        let frame = frame::encode(event)?;
        if frame.len() > self.max_frame_bytes {
            return Err(TransportError::FrameTooLarge {
                len: frame.len(),
                limit: self.max_frame_bytes,
            });
        }
        self.send_frame(frame).await
    }

    /// Send an already-encoded frame as is.
    pub async fn send_frame(&self, frame: Bytes) -> Result<(), TransportError> {
        self.tx.send(frame).await.map_err(|_| TransportError::Closed)
    }

    /// Run a whole transaction through the channel. Stops at the first
    /// failed event; the receiver then sees a transaction that never finishes.
    pub async fn transmit<S, P, F>(
        &self,
        transaction: OutgoingTransaction<'_, S, P, F>,
    ) -> Result<TransactionHeader, TransportError>
    where
        S: ?Sized,
        P: Serialize,
        F: Fn(&S, usize, usize) -> P,
    {
        let header = transaction.header();
        for event in transaction.events() {
            if let Err(e) = self.send_event(&event).await {
                tracing::warn!(
                    transaction_id = %header.transaction_id,
                    event = event.kind(),
                    error = %e,
                    "transmit failed"
                );
                return Err(e);
            }
        }
        tracing::debug!(
            transaction_id = %header.transaction_id,
            total = header.total_size,
            "transaction transmitted"
        );
        Ok(header)
    }
}

pub struct FrameReceiver {
    rx: mpsc::Receiver<Bytes>,
}

impl FrameReceiver {
    /// Next event, or `None` once every sender is gone.
    pub async fn recv<P: DeserializeOwned>(
        &mut self,
    ) -> Option<Result<TransferEvent<P>, TransportError>> {
        let frame = self.rx.recv().await?;
        Some(frame::decode(&frame).map_err(TransportError::from))
    }
}
