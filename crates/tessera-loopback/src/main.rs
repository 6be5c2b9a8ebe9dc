//! tessera-loopback — runs a queue sender and a queue service in one
//! process and moves a playback queue between them.
//!
//! Usage: tessera-loopback [ENTRIES] [POSITION]

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use tessera_core::config::TesseraConfig;
use tessera_services::{
    channel, read_paged, ListRouter, ListTransaction, QueueClient, QueueService,
};

/// A queue entry, as the player would hand it over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Track {
    id: u64,
    title: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let (config, config_error) = match TesseraConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (TesseraConfig::default(), Some(e)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    if let Some(e) = config_error {
        tracing::warn!(error = %e, "failed to load config, using defaults");
    }

    let mut args = std::env::args().skip(1);
    let entries: usize = match args.next() {
        Some(v) => v.parse().context("ENTRIES must be a number")?,
        None => 1750,
    };
    let position: usize = match args.next() {
        Some(v) => v.parse().context("POSITION must be a number")?,
        None => 0,
    };
    tracing::info!(entries, position, "tessera-loopback starting");

    let tracks: Vec<Track> = (0..entries as u64)
        .map(|id| Track {
            id,
            title: format!("Track {id}"),
        })
        .collect();

    transfer_frames(&config, &tracks).await?;
    transfer_queue(&config, &tracks, position).await?;

    tracing::info!("loopback complete");
    Ok(())
}

/// Send the tracks as one list transaction over the frame channel.
async fn transfer_frames(config: &TesseraConfig, tracks: &[Track]) -> Result<()> {
    let (tx, mut rx) = channel(&config.transport);
    let mut router = ListRouter::<Track>::for_lists(&config.router);

    let receiver = tokio::spawn(async move {
        let mut received = None;
        while let Some(event) = rx.recv::<Vec<Track>>().await {
            if let Some(completed) = router.handle(event?)? {
                received = Some(completed.data);
            }
        }
        anyhow::Ok(received)
    });

    let header = tx
        .transmit(ListTransaction::send(tracks))
        .await
        .context("frame transmit failed")?;
    drop(tx);

    let received = receiver
        .await
        .context("frame receiver panicked")??
        .context("transaction never finished")?;
    if received != tracks {
        bail!("frame transfer corrupted the track list");
    }
    tracing::info!(
        transaction_id = %header.transaction_id,
        entries = received.len(),
        "frame transfer verified"
    );
    Ok(())
}

/// Replace the service's queue, then read it back in pages.
async fn transfer_queue(config: &TesseraConfig, tracks: &[Track], position: usize) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(config.transport.channel_capacity.max(1));
    let client = QueueClient::new(tx);
    let router_config = config.router.clone();

    let service = tokio::spawn(async move {
        let mut service = QueueService::<Track>::new(&router_config);
        while let Some(command) = rx.recv().await {
            if let Err(e) = service.handle(command) {
                tracing::warn!(error = %e, "queue command failed");
            }
        }
        service
    });

    client
        .set_queue(tracks, position)
        .await
        .context("queue send failed")?;
    drop(client);

    let service = service.await.context("queue service panicked")?;
    let read_back = read_paged(service.queue_size(), |offset, len| {
        service.queue_chunk(offset, len)
    });
    if read_back != tracks {
        bail!("queue read back differs from what was sent");
    }
    tracing::info!(
        entries = service.queue_size(),
        position = service.position(),
        "queue transfer verified"
    );
    Ok(())
}
