//! Frame format — byte encoding of transfer events for message transports.
//!
//! Every frame is a fixed 60-byte [`FrameHeader`] followed by the payload.
//! Begin and finish frames have empty payloads; a begin frame carries the
//! declared total in `size`. Data frames carry the chunk payload as JSON.
//!
//! The header is `#[repr(C, packed)]` with zerocopy derives. Decoding is
//! strict: an unknown version, unknown kind, non-zero reserved bytes, a
//! hash mismatch, or a header field set on a kind that does not use it
//! rejects the frame outright.

use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use static_assertions::assert_eq_size;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::wire::{Chunk, ChunkHeader, TransactionHeader, TransactionId, TransferEvent};

/// Fixed header preceding every frame payload.
///
/// Wire size: 60 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct FrameHeader {
    pub transaction_id: [u8; 16],

    /// Chunk offset for data frames. Zero otherwise.
    pub offset: u32,

    /// Element count for data frames, declared total for begin frames,
    /// zero for finish frames.
    pub size: u32,

    /// One of `KIND_BEGIN`, `KIND_DATA`, `KIND_FINISH`.
    pub kind: u8,

    /// Frame format version. Currently 0x01.
    pub version: u8,

    /// Must be zero.
    pub reserved: [u8; 2],

    /// BLAKE3 hash of the payload bytes that follow the header.
    pub content_hash: [u8; 32],
}

assert_eq_size!(FrameHeader, [u8; 60]);

pub const FRAME_HEADER_LEN: usize = 60;
pub const FRAME_VERSION: u8 = 0x01;

pub const KIND_BEGIN: u8 = 0x01;
pub const KIND_DATA: u8 = 0x02;
pub const KIND_FINISH: u8 = 0x03;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame of {0} bytes is shorter than the header")]
    Truncated(usize),

    #[error("unknown frame version: 0x{0:02x}")]
    UnknownVersion(u8),

    #[error("unknown frame kind: 0x{0:02x}")]
    UnknownKind(u8),

    #[error("reserved bytes are non-zero")]
    ReservedBytesSet,

    #[error("frame kind 0x{0:02x} must not carry a payload")]
    UnexpectedPayload(u8),

    #[error("frame kind 0x{0:02x} must have a zero {1}")]
    UnexpectedField(u8, &'static str),

    #[error("payload hash mismatch")]
    HashMismatch,

    #[error("{0} value {1} does not fit the frame header")]
    FieldOverflow(&'static str, usize),

    #[error("payload codec failed: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Encode one event as a frame.
pub fn encode<P: Serialize>(event: &TransferEvent<P>) -> Result<Bytes, FrameError> {
    let (kind, transaction_id, offset, size, payload) = match event {
        TransferEvent::Begin(header) => (
            KIND_BEGIN,
            header.transaction_id,
            0,
            header.total_size,
            Vec::new(),
        ),
        TransferEvent::Data(chunk) => (
            KIND_DATA,
            chunk.header.transaction_id,
            chunk.header.offset,
            chunk.header.size,
            serde_json::to_vec(&chunk.payload)?,
        ),
        TransferEvent::Finish(id) => (KIND_FINISH, *id, 0, 0, Vec::new()),
    };

    let header = FrameHeader {
        transaction_id: *transaction_id.as_bytes(),
        offset: narrow("offset", offset)?,
        size: narrow("size", size)?,
        kind,
        version: FRAME_VERSION,
        reserved: [0; 2],
        content_hash: *blake3::hash(&payload).as_bytes(),
    };

    let mut frame = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame.freeze())
}

/// Decode a frame produced by [`encode`].
pub fn decode<P: DeserializeOwned>(frame: &[u8]) -> Result<TransferEvent<P>, FrameError> {
    let header = FrameHeader::read_from_prefix(frame).ok_or(FrameError::Truncated(frame.len()))?;
    let payload = &frame[FRAME_HEADER_LEN..];

    // Copy packed fields out before use.
    let version = header.version;
    let kind = header.kind;
    let reserved = header.reserved;
    let offset = header.offset as usize;
    let size = header.size as usize;
    let transaction_id = TransactionId::from_bytes(header.transaction_id);

    if version != FRAME_VERSION {
        return Err(FrameError::UnknownVersion(version));
    }
    if reserved != [0; 2] {
        return Err(FrameError::ReservedBytesSet);
    }
    if *blake3::hash(payload).as_bytes() != header.content_hash {
        return Err(FrameError::HashMismatch);
    }

    match kind {
        KIND_BEGIN => {
            expect_zero(kind, "offset", offset)?;
            expect_empty(kind, payload)?;
            Ok(TransferEvent::Begin(TransactionHeader::new(
                transaction_id,
                size,
            )))
        }
        KIND_DATA => Ok(TransferEvent::Data(Chunk {
            header: ChunkHeader {
                transaction_id,
                offset,
                size,
            },
            payload: serde_json::from_slice(payload)?,
        })),
        KIND_FINISH => {
            expect_zero(kind, "offset", offset)?;
            expect_zero(kind, "size", size)?;
            expect_empty(kind, payload)?;
            Ok(TransferEvent::Finish(transaction_id))
        }
        other => Err(FrameError::UnknownKind(other)),
    }
}

fn narrow(field: &'static str, value: usize) -> Result<u32, FrameError> {
    u32::try_from(value).map_err(|_| FrameError::FieldOverflow(field, value))
}

fn expect_zero(kind: u8, field: &'static str, value: usize) -> Result<(), FrameError> {
    if value == 0 {
        Ok(())
    } else {
        Err(FrameError::UnexpectedField(kind, field))
    }
}

fn expect_empty(kind: u8, payload: &[u8]) -> Result<(), FrameError> {
    if payload.is_empty() {
        Ok(())
    } else {
        Err(FrameError::UnexpectedPayload(kind))
    }
}
