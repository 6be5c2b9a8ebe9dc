use tessera_core::frame::{self, FrameError};
use tessera_core::wire::{Chunk, ChunkHeader, TransactionHeader};
use tessera_core::{TransactionError, TransactionId, TransferEvent};
use tessera_services::{channel, ListTransaction, RouterError, TransportError};

use crate::*;

// ══════════════════════════════════════════════════════════════════════════════
//  Protocol violations seen through the router
// ══════════════════════════════════════════════════════════════════════════════

fn list_events(size: usize) -> Vec<TransferEvent<Vec<String>>> {
    let data = generate_long_list(size);
    ListTransaction::send(&data).events().collect()
}

fn transaction_error(err: anyhow::Error) -> TransactionError {
    match err.downcast::<RouterError>() {
        Ok(RouterError::Transaction { source, .. }) => source,
        other => panic!("expected a transaction error, got {other:?}"),
    }
}

/// A data frame delivered twice is rejected as a duplicate.
#[tokio::test]
async fn test_duplicate_frame_is_rejected() {
    let (tx, mut rx) = channel(&transport_config());
    let events = list_events(900);

    for event in &events[..2] {
        tx.send_event(event).await.unwrap();
    }
    tx.send_event(&events[1]).await.unwrap();
    drop(tx);

    let received = drain(&mut rx).await.unwrap();
    let err = transaction_error(reassemble(received).unwrap_err());
    assert_eq!(
        err,
        TransactionError::DuplicateChunk {
            offset: 0,
            expected: 500
        }
    );
}

/// Skipping a chunk makes the next one arrive early.
#[test]
fn test_gap_is_rejected() {
    let mut events = list_events(1600);
    events.remove(2);
    let err = transaction_error(reassemble(events).unwrap_err());
    assert_eq!(
        err,
        TransactionError::EarlyChunk {
            offset: 1000,
            expected: 500
        }
    );
}

/// A chunk claiming more entries than the header announced overruns the total.
#[test]
fn test_overrun_is_rejected() {
    let id = TransactionId::generate();
    let events = vec![
        TransferEvent::Begin(TransactionHeader::new(id, 3)),
        TransferEvent::Data(Chunk {
            header: ChunkHeader {
                transaction_id: id,
                offset: 0,
                size: 4,
            },
            payload: generate_long_list(4),
        }),
    ];
    let err = transaction_error(reassemble(events).unwrap_err());
    assert_eq!(
        err,
        TransactionError::OversizedChunk {
            offset: 0,
            size: 4,
            total: 3
        }
    );
}

/// A data frame carrying more entries than its header declares is rejected
/// before it reaches the list.
#[tokio::test]
async fn test_padded_frame_is_rejected() {
    let (tx, mut rx) = channel(&transport_config());
    let id = TransactionId::generate();
    tx.send_event(&TransferEvent::<Vec<String>>::Begin(TransactionHeader::new(id, 3)))
        .await
        .unwrap();
    tx.send_event(&TransferEvent::Data(Chunk {
        header: ChunkHeader {
            transaction_id: id,
            offset: 0,
            size: 1,
        },
        payload: generate_long_list(5),
    }))
    .await
    .unwrap();
    tx.send_event(&TransferEvent::<Vec<String>>::Finish(id))
        .await
        .unwrap();
    drop(tx);

    let received = drain(&mut rx).await.unwrap();
    let err = transaction_error(reassemble(received).unwrap_err());
    assert_eq!(
        err,
        TransactionError::PayloadMismatch {
            offset: 0,
            size: 1,
            entries: 5
        }
    );
}

/// Finishing before the last chunk is an incomplete transmission.
#[test]
fn test_premature_finish_is_rejected() {
    let mut events = list_events(1200);
    let finish = events.pop().unwrap();
    events.pop();
    events.push(finish);
    let err = transaction_error(reassemble(events).unwrap_err());
    assert_eq!(
        err,
        TransactionError::IncompleteTransmission {
            received: 1000,
            total: 1200
        }
    );
}

/// A premature read does not disturb the transaction.
#[test]
fn test_premature_read_then_complete() {
    let data = generate_long_list(700);
    let mut events = ListTransaction::send(&data).events();

    let header = match events.next() {
        Some(TransferEvent::Begin(header)) => header,
        other => panic!("expected begin, got {other:?}"),
    };
    let mut incoming = ListTransaction::receive::<String>(header);

    let mut chunks = events.filter_map(|e| match e {
        TransferEvent::Data(chunk) => Some(chunk),
        _ => None,
    });
    incoming.receive(chunks.next().unwrap()).unwrap();
    assert!(matches!(
        incoming.data().unwrap_err(),
        TransactionError::IncompleteTransmission { received: 500, .. }
    ));
    incoming.receive(chunks.next().unwrap()).unwrap();
    assert_eq!(incoming.into_data().unwrap(), data);
}

/// Chunks from transaction A never land in transaction B.
#[test]
fn test_cross_transaction_chunks_are_rejected() {
    let a = generate_long_list(20);
    let b = generate_long_list(20);
    let chunk_a = ListTransaction::send(&a)
        .events()
        .find_map(|e| match e {
            TransferEvent::Data(chunk) => Some(chunk),
            _ => None,
        })
        .unwrap();

    let mut incoming_b = ListTransaction::receive::<String>(ListTransaction::send(&b).header());
    let err = incoming_b.receive(chunk_a).unwrap_err();
    assert!(matches!(err, TransactionError::ForeignChunk { .. }));
    assert_eq!(incoming_b.expected_offset(), 0);
}

// ══════════════════════════════════════════════════════════════════════════════
//  Transport-level failures
// ══════════════════════════════════════════════════════════════════════════════

/// A frame whose payload is not a list fails to decode instead of being applied.
#[tokio::test]
async fn test_malformed_payload_is_reported() {
    let (tx, mut rx) = channel(&transport_config());
    let id = TransactionId::generate();
    let bogus = TransferEvent::Data(Chunk {
        header: ChunkHeader {
            transaction_id: id,
            offset: 0,
            size: 1,
        },
        payload: serde_json::json!({ "not": "a list" }),
    });
    tx.send_frame(frame::encode(&bogus).unwrap()).await.unwrap();
    drop(tx);

    let err = rx.recv::<Vec<String>>().await.unwrap().unwrap_err();
    assert!(matches!(err, TransportError::Frame(FrameError::Payload(_))));
}

/// A corrupted frame fails its hash check.
#[tokio::test]
async fn test_corrupted_frame_is_reported() {
    let (tx, mut rx) = channel(&transport_config());
    let events = list_events(10);
    let mut bytes = frame::encode(&events[1]).unwrap().to_vec();
    let last = bytes.len() - 3;
    bytes[last] ^= 0x20;
    tx.send_frame(bytes.into()).await.unwrap();
    drop(tx);

    let err = rx.recv::<Vec<String>>().await.unwrap().unwrap_err();
    assert!(matches!(err, TransportError::Frame(FrameError::HashMismatch)));
}
