//! tessera-core — transaction types, frame format, and configuration.
//! The transaction engine in tessera-services builds on this crate.

pub mod config;
pub mod error;
pub mod frame;
pub mod wire;

pub use error::TransactionError;
pub use wire::{
    chunk_ranges, Chunk, ChunkHeader, ChunkPayload, TransactionHeader, TransactionId, TransferEvent,
    MAX_CHUNK_ENTRIES,
};
