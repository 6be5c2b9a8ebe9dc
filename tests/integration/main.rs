//! tessera integration test harness.
//!
//! Tests run whole transactions through the public API of tessera-core and
//! tessera-services: the frame channel, the router, and the queue service.
//! Nothing here needs network access or elevated privileges.

mod failures;
mod transfer;

use anyhow::{Context, Result};
use tessera_core::config::{RouterConfig, TransportConfig};
use tessera_core::TransferEvent;
use tessera_services::{FrameReceiver, ListRouter};

// ── Harness ───────────────────────────────────────────────────────────────────

/// Sizes every round-trip test covers: empty, short, exactly one chunk,
/// one and a half chunks, and many chunks.
pub const ROUND_TRIP_SIZES: [usize; 5] = [0, 3, 500, 750, 6000];

pub fn transport_config() -> TransportConfig {
    TransportConfig {
        channel_capacity: 16,
        max_frame_bytes: 1_048_576,
    }
}

pub fn router_config() -> RouterConfig {
    RouterConfig {
        max_open_transactions: 4,
    }
}

/// "0", "1", "2", ...
pub fn generate_long_list(item_count: usize) -> Vec<String> {
    (0..item_count).map(|i| i.to_string()).collect()
}

/// Drain a receiver until every sender is gone.
pub async fn drain(rx: &mut FrameReceiver) -> Result<Vec<TransferEvent<Vec<String>>>> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv::<Vec<String>>().await {
        events.push(event.context("frame failed to decode")?);
    }
    Ok(events)
}

/// Feed events into a fresh list router and return every finished list.
pub fn reassemble(events: Vec<TransferEvent<Vec<String>>>) -> Result<Vec<Vec<String>>> {
    let mut router = ListRouter::<String>::for_lists(&router_config());
    let mut finished = Vec::new();
    for event in events {
        if let Some(completed) = router.handle(event)? {
            finished.push(completed.data);
        }
    }
    Ok(finished)
}
