//! tessera-services — the transaction engine and the collaborators that
//! carry it: routing, an in-process transport, and the playback queue.

pub mod channel;
pub mod incoming;
pub mod list;
pub mod outgoing;
pub mod queue;
pub mod router;

pub use channel::{channel, FrameReceiver, FrameSender, TransportError};
pub use incoming::{Aggregator, IncomingBuilder, IncomingTransaction};
pub use list::{IncomingList, ListTransaction, OutgoingList};
pub use outgoing::OutgoingTransaction;
pub use queue::{queue_commands, read_paged, QueueClient, QueueCommand, QueueService};
pub use router::{Completed, ListRouter, RouterError, TransactionRouter};
