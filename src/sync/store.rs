//! Remote persistence + notification service.
//!
//! The backend stores one document per session id with last-write-wins
//! upserts, returns the latest document with its writer metadata, and pushes
//! changes best-effort. Push may silently drop, which is why every caller
//! also polls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use crate::core::{DeviceId, GameSession, ParticipantId, SessionId};
use crate::error::{SyncError, SyncResult};

const PUSH_CHANNEL_CAPACITY: usize = 64;

/// A stored document plus the metadata `read` returns alongside it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Canonical session string; also the fingerprint.
    pub document: String,
    pub last_updated: DateTime<Utc>,
    pub updated_by: ParticipantId,
    pub origin_device: DeviceId,
}

impl SessionRecord {
    /// Wrap an already-serialized session.
    pub fn new(session: &GameSession, document: String) -> Self {
        Self {
            document,
            last_updated: session.last_updated,
            updated_by: session.updated_by.clone(),
            origin_device: session.origin_device.clone(),
        }
    }

    /// Serialize a session into a record.
    pub fn from_session(session: &GameSession) -> SyncResult<Self> {
        let document = session.canonical()?;
        Ok(Self::new(session, document))
    }
}

/// The three operations the sync layer depends on.
///
/// Implemented by `MemoryStore` here and by network backends elsewhere.
/// Also implemented for `Arc<S>` so a store can be shared between clients.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Upsert; last write wins.
    async fn write(&self, session_id: &SessionId, record: SessionRecord) -> SyncResult<()>;

    /// Latest record, or `None` if the session was never written.
    async fn read(&self, session_id: &SessionId) -> SyncResult<Option<SessionRecord>>;

    /// Best-effort change notifications.
    async fn on_change(
        &self,
        session_id: &SessionId,
    ) -> SyncResult<broadcast::Receiver<SessionRecord>>;
}

#[async_trait]
impl<S: RemoteStore + ?Sized> RemoteStore for Arc<S> {
    async fn write(&self, session_id: &SessionId, record: SessionRecord) -> SyncResult<()> {
        (**self).write(session_id, record).await
    }

    async fn read(&self, session_id: &SessionId) -> SyncResult<Option<SessionRecord>> {
        (**self).read(session_id).await
    }

    async fn on_change(
        &self,
        session_id: &SessionId,
    ) -> SyncResult<broadcast::Receiver<SessionRecord>> {
        (**self).on_change(session_id).await
    }
}

// ---------------------------------------------------------------------------
// MemoryStore (in-process backend for local play and tests)
// ---------------------------------------------------------------------------

/// In-memory store shared by every client in the process.
///
/// Push delivery and write success can be switched off to exercise the
/// polling fallback and the retry path.
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<SessionId, SessionRecord>>,
    channels: Mutex<HashMap<SessionId, broadcast::Sender<SessionRecord>>>,
    push_disabled: AtomicBool,
    offline: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop push notifications on the floor (writes still land).
    pub fn set_push_enabled(&self, enabled: bool) {
        self.push_disabled.store(!enabled, Ordering::SeqCst);
    }

    /// Fail every call with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful writes across all sessions.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Current stored document, without going through the client.
    pub async fn document(&self, session_id: &SessionId) -> Option<String> {
        self.documents
            .lock()
            .await
            .get(session_id)
            .map(|r| r.document.clone())
    }

    fn check_online(&self) -> SyncResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(SyncError::Network("backend unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn write(&self, session_id: &SessionId, record: SessionRecord) -> SyncResult<()> {
        self.check_online()?;

        self.documents
            .lock()
            .await
            .insert(session_id.clone(), record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);

        if self.push_disabled.load(Ordering::SeqCst) {
            debug!(%session_id, "push dropped");
            return Ok(());
        }
        if let Some(tx) = self.channels.lock().await.get(session_id) {
            // No live subscribers is not an error.
            let _ = tx.send(record);
        }
        Ok(())
    }

    async fn read(&self, session_id: &SessionId) -> SyncResult<Option<SessionRecord>> {
        self.check_online()?;
        Ok(self.documents.lock().await.get(session_id).cloned())
    }

    async fn on_change(
        &self,
        session_id: &SessionId,
    ) -> SyncResult<broadcast::Receiver<SessionRecord>> {
        self.check_online()?;
        let mut channels = self.channels.lock().await;
        let tx = channels
            .entry(session_id.clone())
            .or_insert_with(|| broadcast::channel(PUSH_CHANNEL_CAPACITY).0);
        Ok(tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GameType, LocalIdentity};
    use serde_json::json;

    fn record(device: &str, n: u32) -> SessionRecord {
        let identity = LocalIdentity::new(ParticipantId::new("alice"), DeviceId::new(device));
        let session = GameSession::create(
            SessionId::new("s1"),
            GameType::Trivia,
            "waiting",
            &json!({ "n": n }),
            &identity,
        )
        .unwrap();
        SessionRecord::from_session(&session).unwrap()
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store.read(&SessionId::new("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = MemoryStore::new();
        let id = SessionId::new("s1");

        store.write(&id, record("a", 1)).await.unwrap();
        store.write(&id, record("b", 2)).await.unwrap();

        let latest = store.read(&id).await.unwrap().unwrap();
        assert_eq!(latest.origin_device, DeviceId::new("b"));
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_push_delivers_to_subscribers() {
        let store = MemoryStore::new();
        let id = SessionId::new("s1");
        let mut rx = store.on_change(&id).await.unwrap();

        let r = record("a", 1);
        store.write(&id, r.clone()).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), r);
    }

    #[tokio::test]
    async fn test_push_can_be_dropped() {
        let store = MemoryStore::new();
        let id = SessionId::new("s1");
        let mut rx = store.on_change(&id).await.unwrap();

        store.set_push_enabled(false);
        store.write(&id, record("a", 1)).await.unwrap();

        assert!(matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty)));
        assert!(store.read(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_offline_fails_every_call() {
        let store = MemoryStore::new();
        let id = SessionId::new("s1");
        store.set_offline(true);

        assert!(matches!(store.write(&id, record("a", 1)).await, Err(SyncError::Network(_))));
        assert!(store.read(&id).await.is_err());
        assert!(store.on_change(&id).await.is_err());
        assert_eq!(store.write_count(), 0);
    }
}
