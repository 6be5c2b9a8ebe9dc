use std::collections::HashMap;

use tessera_core::wire::MAX_CHUNK_ENTRIES;
use tessera_core::{TransactionId, TransferEvent};
use tessera_services::{channel, ListTransaction};

use crate::*;

/// Every size survives the trip through the frame channel unchanged.
#[tokio::test]
async fn test_round_trip_over_frames() {
    for size in ROUND_TRIP_SIZES {
        let data = generate_long_list(size);
        let (tx, mut rx) = channel(&transport_config());

        let sender = {
            let data = data.clone();
            tokio::spawn(async move { tx.transmit(ListTransaction::send(&data)).await })
        };
        let events = drain(&mut rx).await.unwrap();
        sender.await.unwrap().unwrap();

        let finished = reassemble(events).unwrap();
        assert_eq!(finished, vec![data], "size {size} did not round-trip");
    }
}

/// No data frame exceeds the chunk bound, and exact multiples fill every chunk.
#[tokio::test]
async fn test_chunk_bound_on_the_wire() {
    let k = 5;
    let data = generate_long_list(MAX_CHUNK_ENTRIES * k);
    let (tx, mut rx) = channel(&transport_config());

    let sender = tokio::spawn(async move { tx.transmit(ListTransaction::send(&data)).await });
    let events = drain(&mut rx).await.unwrap();
    sender.await.unwrap().unwrap();

    let sizes: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            TransferEvent::Data(chunk) => Some(chunk.payload.len()),
            _ => None,
        })
        .collect();
    assert_eq!(sizes, vec![MAX_CHUNK_ENTRIES; k]);
}

/// An empty list still produces begin and finish frames.
#[tokio::test]
async fn test_empty_list_sends_begin_and_finish() {
    let (tx, mut rx) = channel(&transport_config());
    let empty: Vec<String> = Vec::new();
    tx.transmit(ListTransaction::send(&empty)).await.unwrap();
    drop(tx);

    let kinds: Vec<&str> = drain(&mut rx).await.unwrap().iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, vec!["begin", "finish"]);
}

/// Two senders share one channel; the router keeps their chunks apart.
#[tokio::test]
async fn test_concurrent_transactions_share_a_channel() {
    let (tx, mut rx) = channel(&transport_config());
    let a = generate_long_list(MAX_CHUNK_ENTRIES * 4 + 1);
    let b: Vec<String> = (0..1800).map(|i| format!("b{i}")).collect();

    let tx_b = tx.clone();
    let (list_a, list_b) = (a.clone(), b.clone());
    let send_a = tokio::spawn(async move { tx.transmit(ListTransaction::send(&list_a)).await });
    let send_b = tokio::spawn(async move { tx_b.transmit(ListTransaction::send(&list_b)).await });

    let events = drain(&mut rx).await.unwrap();
    let id_a = send_a.await.unwrap().unwrap().transaction_id;
    let id_b = send_b.await.unwrap().unwrap().transaction_id;
    assert_ne!(id_a, id_b);

    // Per-transaction order is preserved even when frames interleave.
    let mut last_offset: HashMap<TransactionId, usize> = HashMap::new();
    for event in &events {
        if let TransferEvent::Data(chunk) = event {
            let previous = last_offset.insert(chunk.header.transaction_id, chunk.header.offset);
            if let Some(previous) = previous {
                assert!(chunk.header.offset > previous);
            }
        }
    }

    let finished = reassemble(events).unwrap();
    assert_eq!(finished.len(), 2);
    assert!(finished.contains(&a));
    assert!(finished.contains(&b));
}
