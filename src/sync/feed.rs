//! One snapshot stream backed by two producers.
//!
//! Push notifications are preferred but unreliable; polling is the safety
//! net. Both producers feed the same channel so the reconciler sees every
//! delivery through one entry point, duplicates included.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::client::SessionStoreClient;
use super::store::{RemoteStore, SessionRecord};
use crate::core::SessionId;

const FEED_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliverySource {
    Push,
    Poll,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub source: DeliverySource,
    pub record: SessionRecord,
}

/// Running push + poll producers for one session. Dropping the feed stops both.
pub struct SnapshotFeed {
    rx: mpsc::Receiver<Delivery>,
    producers: Vec<JoinHandle<()>>,
}

impl SnapshotFeed {
    /// Start both producers.
    ///
    /// A failed subscription leaves polling running on its own.
    pub async fn start<S: RemoteStore + 'static>(
        client: SessionStoreClient<S>,
        session_id: SessionId,
        poll_interval: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let mut producers = Vec::with_capacity(2);

        match client.subscribe(&session_id).await {
            Ok(changes) => {
                producers.push(tokio::spawn(push_producer(changes, tx.clone(), session_id.clone())));
            }
            Err(e) => {
                warn!(%session_id, error = %e, "push unavailable, polling only");
            }
        }
        producers.push(tokio::spawn(poll_producer(client, session_id, poll_interval, tx)));

        Self { rx, producers }
    }

    /// Next delivery from either producer.
    pub async fn next(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }
}

impl Drop for SnapshotFeed {
    fn drop(&mut self) {
        for producer in &self.producers {
            producer.abort();
        }
    }
}

async fn push_producer(
    mut changes: broadcast::Receiver<SessionRecord>,
    tx: mpsc::Sender<Delivery>,
    session_id: SessionId,
) {
    loop {
        match changes.recv().await {
            Ok(record) => {
                let delivery = Delivery {
                    source: DeliverySource::Push,
                    record,
                };
                if tx.send(delivery).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // Polling will catch up with whatever we skipped.
                debug!(%session_id, skipped, "push lagged");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(%session_id, "push channel closed");
                break;
            }
        }
    }
}

async fn poll_producer<S: RemoteStore + 'static>(
    client: SessionStoreClient<S>,
    session_id: SessionId,
    poll_interval: Duration,
    tx: mpsc::Sender<Delivery>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match client.fetch(&session_id).await {
            Ok(Some(record)) => {
                let delivery = Delivery {
                    source: DeliverySource::Poll,
                    record,
                };
                if tx.send(delivery).await.is_err() {
                    break;
                }
            }
            Ok(None) => {}
            // Already logged by the client; try again next tick.
            Err(_) => {}
        }
    }
}
