//! A device's local copy of one session, wired to a rule engine.
//!
//! Local actions go through the engine synchronously, replace the local
//! session, and only then are committed. Incoming snapshots go through the
//! reconciler and replace the local session wholesale when accepted.

use chrono::Utc;
use tracing::{debug, info, warn};

use super::client::{CommitPriority, SessionStoreClient};
use super::feed::SnapshotFeed;
use super::reconciler::{ReconcileOutcome, Reconciler};
use super::store::{RemoteStore, SessionRecord};
use crate::core::{GameSession, LocalIdentity, ParticipantId, SessionId, SessionView};
use crate::error::{ActionError, SyncError, SyncResult};
use crate::rules::RulesEngine;

pub struct SessionReplica<E: RulesEngine, S: RemoteStore + 'static> {
    engine: E,
    client: SessionStoreClient<S>,
    reconciler: Reconciler,
    identity: LocalIdentity,
    session: GameSession,
}

impl<E: RulesEngine, S: RemoteStore + 'static> SessionReplica<E, S> {
    /// Wrap an existing session.
    pub fn new(
        engine: E,
        client: SessionStoreClient<S>,
        identity: LocalIdentity,
        session: GameSession,
    ) -> Self {
        let mut reconciler = Reconciler::new(identity.device.clone(), client.config().stale_guard);
        reconciler.record_local(&session);
        Self {
            engine,
            client,
            reconciler,
            identity,
            session,
        }
    }

    /// Create a new session with `payload` and publish it immediately.
    pub async fn create(
        engine: E,
        client: SessionStoreClient<S>,
        identity: LocalIdentity,
        session_id: SessionId,
        payload: E::Payload,
    ) -> SyncResult<Self> {
        let mut session = GameSession::create(
            session_id,
            engine.game_type(),
            engine.phase(&payload).to_string(),
            &payload,
            &identity,
        )?;
        session.turn_owner = engine.turn_owner(&payload);
        session.stamp(&identity);

        let replica = Self::new(engine, client, identity, session);
        replica
            .client
            .commit(&replica.session, CommitPriority::Immediate)
            .await?;
        info!(session_id = %replica.session.session_id, "session created");
        Ok(replica)
    }

    /// Join a session someone else created. `None` if it does not exist yet.
    pub async fn join(
        engine: E,
        client: SessionStoreClient<S>,
        identity: LocalIdentity,
        session_id: &SessionId,
    ) -> SyncResult<Option<Self>> {
        let Some(record) = client.fetch(session_id).await? else {
            return Ok(None);
        };
        let session = GameSession::from_document(&record.document)?;
        if session.game_type != engine.game_type() {
            return Err(SyncError::Decode(format!(
                "session {session_id} holds {} not {}",
                session.game_type,
                engine.game_type()
            )));
        }

        let mut replica = Self::new(engine, client, identity, session);
        // Prime the fingerprint so the first poll is a no-op.
        replica.reconciler.reconcile(&record);
        Ok(Some(replica))
    }

    #[must_use]
    pub fn session(&self) -> &GameSession {
        &self.session
    }

    #[must_use]
    pub fn view(&self) -> SessionView<'_> {
        self.session.view()
    }

    #[must_use]
    pub fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Typed payload of the current session.
    pub fn payload(&self) -> Result<E::Payload, ActionError> {
        self.session.decode_payload()
    }

    /// Whether `actor` may take `action` right now. For greying out controls;
    /// `apply_action` checks again.
    pub fn can_act(&self, actor: &ParticipantId, action: &E::Action) -> bool {
        self.session
            .decode_payload::<E::Payload>()
            .is_ok_and(|payload| {
                self.engine.is_terminal(&payload).is_none()
                    && self.engine.is_legal(&payload, actor, action)
            })
    }

    /// Apply an action optimistically and commit the result.
    ///
    /// Rejections leave the session untouched and never reach the network.
    /// Commit failures are logged; the next commit or poll retries.
    pub async fn apply_action(
        &mut self,
        actor: &ParticipantId,
        action: &E::Action,
    ) -> Result<E::Payload, ActionError> {
        let payload: E::Payload = self.session.decode_payload()?;
        let applied = self.engine.try_apply(&payload, actor, action)?;

        let mut next = self.session.clone();
        next.payload = serde_json::to_value(&applied.payload)?;
        next.phase = self.engine.phase(&applied.payload).to_string();
        next.turn_owner = self.engine.turn_owner(&applied.payload);
        let now = Utc::now();
        for draft in applied.log {
            next.action_log.push(draft.stamp(actor.clone(), now));
        }
        next.stamp(&self.identity);

        let mut priority = self.engine.commit_priority(action);
        if next.turn_owner != self.session.turn_owner
            || next.phase != self.session.phase
            || self.engine.is_terminal(&applied.payload).is_some()
        {
            priority = CommitPriority::Immediate;
        }

        debug!(
            session_id = %next.session_id,
            revision = next.revision,
            phase = %next.phase,
            ?priority,
            "action applied"
        );
        self.session = next;
        self.reconciler.record_local(&self.session);

        if let Err(e) = self.client.commit(&self.session, priority).await {
            warn!(session_id = %self.session.session_id, error = %e, "commit failed, will retry");
        }
        Ok(applied.payload)
    }

    /// Feed one incoming snapshot through the reconciler.
    pub async fn ingest(&mut self, record: &SessionRecord) -> ReconcileOutcome {
        let outcome = self.reconciler.reconcile(record);
        match &outcome {
            ReconcileOutcome::Applied(incoming) => {
                if !incoming.action_log.extends(&self.session.action_log) {
                    debug!(
                        session_id = %self.session.session_id,
                        local = self.session.action_log.len(),
                        incoming = incoming.action_log.len(),
                        "history diverged, adopting incoming session"
                    );
                }
                self.session = (**incoming).clone();
                self.client.discard_failed().await;
            }
            ReconcileOutcome::Stale { incoming, held } => {
                debug!(
                    session_id = %self.session.session_id,
                    incoming,
                    held,
                    "stale snapshot at store, reasserting local session"
                );
                if let Err(e) = self.client.reassert(&self.session).await {
                    warn!(session_id = %self.session.session_id, error = %e, "reassert failed");
                }
            }
            ReconcileOutcome::AlreadyCurrent
            | ReconcileOutcome::Echo
            | ReconcileOutcome::Malformed(_) => {}
        }
        outcome
    }

    /// Fetch once and ingest. The polling fallback in its simplest form.
    ///
    /// A local write that failed earlier is resent first.
    pub async fn sync_once(&mut self) -> SyncResult<Option<ReconcileOutcome>> {
        self.resend_failed().await;
        match self.client.fetch(&self.session.session_id).await? {
            Some(record) => Ok(Some(self.ingest(&record).await)),
            None => Ok(None),
        }
    }

    /// Start push + poll producers for this session.
    pub async fn feed(&self) -> SnapshotFeed {
        SnapshotFeed::start(
            self.client.clone(),
            self.session.session_id.clone(),
            self.client.config().poll_interval(),
        )
        .await
    }

    /// Wait for the next delivery on `feed` and ingest it.
    pub async fn next_update(&mut self, feed: &mut SnapshotFeed) -> Option<ReconcileOutcome> {
        let delivery = feed.next().await?;
        self.resend_failed().await;
        Some(self.ingest(&delivery.record).await)
    }

    /// Send any pending coalesced write now.
    pub async fn flush(&self) -> SyncResult<bool> {
        self.client.flush().await
    }

    async fn resend_failed(&self) {
        match self.client.retry_failed().await {
            Ok(true) => info!(session_id = %self.session.session_id, "failed write resent"),
            Ok(false) => {}
            Err(e) => warn!(session_id = %self.session.session_id, error = %e, "resend failed"),
        }
    }
}
