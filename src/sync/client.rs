//! Session Store Client: the only component that talks to the remote store.
//!
//! ## Commit lanes
//!
//! - `Coalesced`: the write waits `coalesce_delay`; further coalesced
//!   commits inside that window replace the pending document, so a burst of
//!   edits costs one write.
//! - `Immediate`: score, turn-owner and game-end changes. Drops any pending
//!   coalesced document (it is older) and writes now.
//!
//! Committing a document identical to the last one committed is a no-op.
//! Writes from one client are issued in commit order through `write_gate`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

use super::store::{RemoteStore, SessionRecord};
use crate::core::{GameSession, SessionId, SyncConfig};
use crate::error::SyncResult;

/// Which lane a commit travels in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPriority {
    Coalesced,
    Immediate,
}

/// What `commit` did with a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Identical to the last committed document; nothing sent.
    Unchanged,
    /// Waiting in the coalescing window.
    Scheduled,
    /// Written to the store.
    Written,
}

struct PendingWrite {
    session_id: SessionId,
    record: SessionRecord,
}

#[derive(Default)]
struct CommitState {
    last_committed: Option<String>,
    pending: Option<PendingWrite>,
    /// Last write that failed to reach the store, kept until it is resent or
    /// a newer commit replaces it.
    failed: Option<PendingWrite>,
    flush_scheduled: bool,
    /// Bumped whenever the pending write is taken, so a flush timer that
    /// outlived its write does not fire early for the next one.
    flush_generation: u64,
}

impl CommitState {
    /// Hold on to a write the store refused. Dropped if a newer document was
    /// committed while it was in flight.
    fn record_failure(&mut self, write: PendingWrite) {
        match self.last_committed.as_deref() {
            Some(latest) if latest != write.record.document => {}
            _ => {
                self.last_committed = None;
                self.failed = Some(write);
            }
        }
    }

    /// Take the pending write and cancel its timer.
    fn take_pending(&mut self) -> Option<PendingWrite> {
        self.flush_scheduled = false;
        self.flush_generation += 1;
        self.pending.take()
    }
}

/// Client for one device. Cheap to clone; clones share commit state.
pub struct SessionStoreClient<S: RemoteStore + 'static> {
    store: Arc<S>,
    config: SyncConfig,
    state: Arc<Mutex<CommitState>>,
    write_gate: Arc<Mutex<()>>,
}

impl<S: RemoteStore + 'static> Clone for SessionStoreClient<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            state: Arc::clone(&self.state),
            write_gate: Arc::clone(&self.write_gate),
        }
    }
}

impl<S: RemoteStore + 'static> SessionStoreClient<S> {
    pub fn new(store: Arc<S>, config: SyncConfig) -> Self {
        Self {
            store,
            config,
            state: Arc::new(Mutex::new(CommitState::default())),
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Serialize `session` and send it down the chosen lane.
    pub async fn commit(
        &self,
        session: &GameSession,
        priority: CommitPriority,
    ) -> SyncResult<CommitOutcome> {
        let record = SessionRecord::from_session(session)?;
        let session_id = &session.session_id;

        let mut state = self.state.lock().await;
        if state.last_committed.as_deref() == Some(record.document.as_str()) {
            debug!(%session_id, revision = session.revision, "commit suppressed, document unchanged");
            return Ok(CommitOutcome::Unchanged);
        }
        state.last_committed = Some(record.document.clone());
        if state.failed.take().is_some() {
            debug!(%session_id, "failed write replaced by newer commit");
        }

        match priority {
            CommitPriority::Coalesced => {
                state.pending = Some(PendingWrite {
                    session_id: session_id.clone(),
                    record,
                });
                if !state.flush_scheduled {
                    state.flush_scheduled = true;
                    self.schedule_flush(state.flush_generation);
                }
                debug!(%session_id, revision = session.revision, "commit coalesced");
                Ok(CommitOutcome::Scheduled)
            }
            CommitPriority::Immediate => {
                if state.take_pending().is_some() {
                    debug!(%session_id, "pending coalesced write superseded");
                }
                drop(state);
                self.write_now(session_id, record).await?;
                Ok(CommitOutcome::Written)
            }
        }
    }

    /// Write `session` even if it matches the last committed document.
    ///
    /// Used to re-publish local state after a stale snapshot overwrote it at
    /// the store.
    pub async fn reassert(&self, session: &GameSession) -> SyncResult<()> {
        let record = SessionRecord::from_session(session)?;
        {
            let mut state = self.state.lock().await;
            state.take_pending();
            state.failed = None;
            state.last_committed = Some(record.document.clone());
        }
        debug!(session_id = %session.session_id, revision = session.revision, "reasserting local session");
        self.write_now(&session.session_id, record).await
    }

    /// Send any pending coalesced write now.
    pub async fn flush(&self) -> SyncResult<bool> {
        flush_pending(&self.store, &self.state, &self.write_gate, None).await
    }

    /// Resend the last write that failed, if any. Returns whether one was sent.
    pub async fn retry_failed(&self) -> SyncResult<bool> {
        let _gate = self.write_gate.lock().await;
        let failed = self.state.lock().await.failed.take();
        let Some(PendingWrite { session_id, record }) = failed else {
            return Ok(false);
        };

        let document = record.document.clone();
        match self.store.write(&session_id, record.clone()).await {
            Ok(()) => {
                let mut state = self.state.lock().await;
                if state.last_committed.is_none() {
                    state.last_committed = Some(document);
                }
                debug!(%session_id, "failed write resent");
                Ok(true)
            }
            Err(e) => {
                warn!(%session_id, error = %e, "retry failed");
                self.state
                    .lock()
                    .await
                    .record_failure(PendingWrite { session_id, record });
                Err(e)
            }
        }
    }

    /// Drop a failed write after adopting someone else's newer session.
    pub async fn discard_failed(&self) {
        if let Some(PendingWrite { session_id, .. }) = self.state.lock().await.failed.take() {
            debug!(%session_id, "failed write discarded");
        }
    }

    /// Latest stored record for a session.
    pub async fn fetch(&self, session_id: &SessionId) -> SyncResult<Option<SessionRecord>> {
        self.store.read(session_id).await.map_err(|e| {
            warn!(%session_id, error = %e, "fetch failed");
            e
        })
    }

    /// Register for push notifications. Callers must poll as well.
    pub async fn subscribe(
        &self,
        session_id: &SessionId,
    ) -> SyncResult<broadcast::Receiver<SessionRecord>> {
        self.store.on_change(session_id).await
    }

    /// True while a coalesced write is waiting.
    pub async fn has_pending(&self) -> bool {
        self.state.lock().await.pending.is_some()
    }

    /// True while a failed write is waiting to be resent.
    pub async fn has_failed(&self) -> bool {
        self.state.lock().await.failed.is_some()
    }

    fn schedule_flush(&self, generation: u64) {
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let gate = Arc::clone(&self.write_gate);
        let delay = self.config.coalesce_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Errors are logged inside; the next commit or poll retries.
            let _ = flush_pending(&store, &state, &gate, Some(generation)).await;
        });
    }

    async fn write_now(&self, session_id: &SessionId, record: SessionRecord) -> SyncResult<()> {
        let _gate = self.write_gate.lock().await;
        match self.store.write(session_id, record.clone()).await {
            Ok(()) => {
                debug!(%session_id, "session written");
                Ok(())
            }
            Err(e) => {
                warn!(%session_id, error = %e, "write failed");
                self.state.lock().await.record_failure(PendingWrite {
                    session_id: session_id.clone(),
                    record,
                });
                Err(e)
            }
        }
    }
}

/// Take the pending write (if any) and send it. Returns whether a write was sent.
///
/// A timer passes the generation it was scheduled under and does nothing if
/// the write it was meant for has already gone.
async fn flush_pending<S: RemoteStore>(
    store: &Arc<S>,
    state: &Arc<Mutex<CommitState>>,
    gate: &Arc<Mutex<()>>,
    generation: Option<u64>,
) -> SyncResult<bool> {
    let _gate = gate.lock().await;
    let pending = {
        let mut state = state.lock().await;
        if generation.is_some_and(|g| g != state.flush_generation) {
            return Ok(false);
        }
        state.take_pending()
    };
    let Some(PendingWrite { session_id, record }) = pending else {
        return Ok(false);
    };

    match store.write(&session_id, record.clone()).await {
        Ok(()) => {
            debug!(%session_id, "coalesced write flushed");
            Ok(true)
        }
        Err(e) => {
            warn!(%session_id, error = %e, "coalesced write failed");
            state
                .lock()
                .await
                .record_failure(PendingWrite { session_id, record });
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DeviceId, GameType, LocalIdentity, ParticipantId};
    use crate::sync::MemoryStore;
    use serde_json::json;
    use std::time::Duration;

    fn session(n: u32) -> GameSession {
        let identity = LocalIdentity::new(ParticipantId::new("alice"), DeviceId::new("dev-a"));
        GameSession::create(
            SessionId::new("s1"),
            GameType::WordGuess,
            "playing",
            &json!({ "clue": n }),
            &identity,
        )
        .unwrap()
    }

    fn client(store: &Arc<MemoryStore>) -> SessionStoreClient<MemoryStore> {
        SessionStoreClient::new(Arc::clone(store), SyncConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_commit_is_suppressed() {
        let store = Arc::new(MemoryStore::new());
        let client = client(&store);
        let s = session(1);

        assert_eq!(client.commit(&s, CommitPriority::Immediate).await.unwrap(), CommitOutcome::Written);
        assert_eq!(client.commit(&s, CommitPriority::Immediate).await.unwrap(), CommitOutcome::Unchanged);
        assert_eq!(client.commit(&s, CommitPriority::Coalesced).await.unwrap(), CommitOutcome::Unchanged);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_coalesced_burst_writes_last_document_once() {
        let store = Arc::new(MemoryStore::new());
        let client = client(&store);

        let edits: Vec<GameSession> = (0..5).map(session).collect();
        for edit in &edits {
            let outcome = client.commit(edit, CommitPriority::Coalesced).await.unwrap();
            assert_eq!(outcome, CommitOutcome::Scheduled);
        }
        assert_eq!(store.write_count(), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(store.write_count(), 1);
        let stored = store.document(&SessionId::new("s1")).await.unwrap();
        assert_eq!(stored, edits[4].canonical().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_supersedes_pending() {
        let store = Arc::new(MemoryStore::new());
        let client = client(&store);

        let urgent = session(2);
        client.commit(&session(1), CommitPriority::Coalesced).await.unwrap();
        client.commit(&urgent, CommitPriority::Immediate).await.unwrap();
        assert!(!client.has_pending().await);

        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(store.write_count(), 1);
        let stored = store.document(&SessionId::new("s1")).await.unwrap();
        assert_eq!(stored, urgent.canonical().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_is_retried_on_next_commit() {
        let store = Arc::new(MemoryStore::new());
        let client = client(&store);
        let s = session(1);

        store.set_offline(true);
        assert!(client.commit(&s, CommitPriority::Immediate).await.is_err());

        store.set_offline(false);
        assert_eq!(client.commit(&s, CommitPriority::Immediate).await.unwrap(), CommitOutcome::Written);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_is_held_until_resent() {
        let store = Arc::new(MemoryStore::new());
        let client = client(&store);
        let s = session(1);

        store.set_offline(true);
        assert!(client.commit(&s, CommitPriority::Immediate).await.is_err());
        assert!(client.has_failed().await);
        assert!(client.retry_failed().await.is_err());
        assert!(client.has_failed().await);

        store.set_offline(false);
        assert!(client.retry_failed().await.unwrap());
        assert!(!client.has_failed().await);
        assert!(!client.retry_failed().await.unwrap());
        assert_eq!(store.document(&SessionId::new("s1")).await.unwrap(), s.canonical().unwrap());

        // Resent document counts as committed again.
        assert_eq!(client.commit(&s, CommitPriority::Immediate).await.unwrap(), CommitOutcome::Unchanged);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_coalesced_write_is_held() {
        let store = Arc::new(MemoryStore::new());
        let client = client(&store);
        let s = session(1);

        store.set_offline(true);
        client.commit(&s, CommitPriority::Coalesced).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!client.has_pending().await);
        assert!(client.has_failed().await);

        store.set_offline(false);
        assert!(client.retry_failed().await.unwrap());
        assert_eq!(store.document(&SessionId::new("s1")).await.unwrap(), s.canonical().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_commit_replaces_failed_write() {
        let store = Arc::new(MemoryStore::new());
        let client = client(&store);
        let newer = session(2);

        store.set_offline(true);
        assert!(client.commit(&session(1), CommitPriority::Immediate).await.is_err());
        store.set_offline(false);

        client.commit(&newer, CommitPriority::Immediate).await.unwrap();
        assert!(!client.has_failed().await);
        assert!(!client.retry_failed().await.unwrap());
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.document(&SessionId::new("s1")).await.unwrap(), newer.canonical().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_discard_failed_drops_write() {
        let store = Arc::new(MemoryStore::new());
        let client = client(&store);

        store.set_offline(true);
        assert!(client.commit(&session(1), CommitPriority::Immediate).await.is_err());
        store.set_offline(false);

        client.discard_failed().await;
        assert!(!client.retry_failed().await.unwrap());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_flush_cancels_its_timer() {
        let store = Arc::new(MemoryStore::new());
        let client = client(&store);
        let later = session(2);

        // t=0: timer armed for t=500, then flushed by hand.
        client.commit(&session(1), CommitPriority::Coalesced).await.unwrap();
        assert!(client.flush().await.unwrap());

        // t=300: next burst opens its own window, ending at t=800.
        tokio::time::sleep(Duration::from_millis(300)).await;
        client.commit(&later, CommitPriority::Coalesced).await.unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(store.write_count(), 1);
        assert!(client.has_pending().await);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.document(&SessionId::new("s1")).await.unwrap(), later.canonical().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_commit_cancels_coalesced_timer() {
        let store = Arc::new(MemoryStore::new());
        let client = client(&store);

        client.commit(&session(1), CommitPriority::Coalesced).await.unwrap();
        client.commit(&session(2), CommitPriority::Immediate).await.unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;
        client.commit(&session(3), CommitPriority::Coalesced).await.unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(store.write_count(), 1);
        assert!(client.has_pending().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_sends_pending_early() {
        let store = Arc::new(MemoryStore::new());
        let client = client(&store);

        client.commit(&session(1), CommitPriority::Coalesced).await.unwrap();
        assert!(client.flush().await.unwrap());
        assert_eq!(store.write_count(), 1);
        assert!(!client.flush().await.unwrap());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reassert_ignores_suppression() {
        let store = Arc::new(MemoryStore::new());
        let client = client(&store);
        let s = session(1);

        client.commit(&s, CommitPriority::Immediate).await.unwrap();
        client.reassert(&s).await.unwrap();
        assert_eq!(store.write_count(), 2);
    }
}
