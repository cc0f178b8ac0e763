//! Session Reconciler: decides whether an incoming snapshot replaces local
//! state.
//!
//! Checks run in order:
//! 1. Fingerprint equals the last applied one: already current.
//! 2. Written by this device: echo of our own write.
//! 3. Revision lower than what we hold (when the guard is on): stale.
//! 4. Otherwise accept and replace wholesale, even if written by our own
//!    participant from another device.
//!
//! Echo detection keys on the device id, never the participant id.

use tracing::{debug, warn};

use super::store::SessionRecord;
use crate::core::{DeviceId, GameSession, StaleGuard};

#[derive(Clone, Debug, PartialEq)]
pub enum ReconcileOutcome {
    /// Accepted; the caller replaces its local session with this one.
    Applied(Box<GameSession>),
    AlreadyCurrent,
    Echo,
    /// Older than the revision we hold.
    Stale { incoming: u64, held: u64 },
    /// Document could not be parsed.
    Malformed(String),
}

impl ReconcileOutcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, ReconcileOutcome::Applied(_))
    }

    fn label(&self) -> &'static str {
        match self {
            ReconcileOutcome::Applied(_) => "applied",
            ReconcileOutcome::AlreadyCurrent => "already_current",
            ReconcileOutcome::Echo => "echo",
            ReconcileOutcome::Stale { .. } => "stale",
            ReconcileOutcome::Malformed(_) => "malformed",
        }
    }
}

pub struct Reconciler {
    local_device: DeviceId,
    guard: StaleGuard,
    last_applied: Option<String>,
    held_revision: u64,
}

impl Reconciler {
    pub fn new(local_device: DeviceId, guard: StaleGuard) -> Self {
        Self {
            local_device,
            guard,
            last_applied: None,
            held_revision: 0,
        }
    }

    #[must_use]
    pub fn last_applied(&self) -> Option<&str> {
        self.last_applied.as_deref()
    }

    #[must_use]
    pub fn held_revision(&self) -> u64 {
        self.held_revision
    }

    /// Note a session this device produced or adopted outside `reconcile`.
    pub fn record_local(&mut self, session: &GameSession) {
        self.held_revision = self.held_revision.max(session.revision);
    }

    pub fn reconcile(&mut self, record: &SessionRecord) -> ReconcileOutcome {
        let outcome = self.decide(record);
        debug!(
            origin = %record.origin_device,
            updated_by = %record.updated_by,
            outcome = outcome.label(),
            "reconcile"
        );
        outcome
    }

    fn decide(&mut self, record: &SessionRecord) -> ReconcileOutcome {
        if self.last_applied.as_deref() == Some(record.document.as_str()) {
            return ReconcileOutcome::AlreadyCurrent;
        }
        if record.origin_device == self.local_device {
            return ReconcileOutcome::Echo;
        }

        let session = match GameSession::from_document(&record.document) {
            Ok(session) => session,
            Err(e) => {
                warn!(origin = %record.origin_device, error = %e, "discarding malformed snapshot");
                return ReconcileOutcome::Malformed(e.to_string());
            }
        };

        if self.guard == StaleGuard::Revision && session.revision < self.held_revision {
            return ReconcileOutcome::Stale {
                incoming: session.revision,
                held: self.held_revision,
            };
        }

        self.last_applied = Some(record.document.clone());
        self.held_revision = session.revision;
        ReconcileOutcome::Applied(Box::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GameType, LocalIdentity, ParticipantId, SessionId};
    use serde_json::json;

    fn snapshot(participant: &str, device: &str, revision: u64, n: u32) -> SessionRecord {
        let identity = LocalIdentity::new(ParticipantId::new(participant), DeviceId::new(device));
        let mut session = GameSession::create(
            SessionId::new("s1"),
            GameType::SocialDeduction,
            "day",
            &json!({ "n": n }),
            &identity,
        )
        .unwrap();
        session.revision = revision;
        SessionRecord::from_session(&session).unwrap()
    }

    fn reconciler() -> Reconciler {
        Reconciler::new(DeviceId::new("local"), StaleGuard::Revision)
    }

    #[test]
    fn test_accepts_remote_snapshot() {
        let mut r = reconciler();
        let outcome = r.reconcile(&snapshot("bob", "bob-phone", 1, 1));
        assert!(outcome.is_applied());
        assert_eq!(r.held_revision(), 1);
    }

    #[test]
    fn test_duplicate_is_already_current() {
        let mut r = reconciler();
        let snap = snapshot("bob", "bob-phone", 1, 1);
        assert!(r.reconcile(&snap).is_applied());
        assert_eq!(r.reconcile(&snap), ReconcileOutcome::AlreadyCurrent);
    }

    #[test]
    fn test_own_device_is_echo() {
        let mut r = reconciler();
        assert_eq!(r.reconcile(&snapshot("alice", "local", 5, 1)), ReconcileOutcome::Echo);
        assert!(r.last_applied().is_none());
    }

    #[test]
    fn test_same_participant_other_device_is_applied() {
        let mut r = reconciler();
        let outcome = r.reconcile(&snapshot("alice", "alice-tablet", 1, 1));
        assert!(outcome.is_applied());
    }

    #[test]
    fn test_lower_revision_is_stale() {
        let mut r = reconciler();
        assert!(r.reconcile(&snapshot("bob", "bob-phone", 4, 1)).is_applied());
        assert_eq!(
            r.reconcile(&snapshot("carol", "carol-phone", 3, 2)),
            ReconcileOutcome::Stale { incoming: 3, held: 4 }
        );
    }

    #[test]
    fn test_equal_revision_last_arrival_wins() {
        let mut r = reconciler();
        assert!(r.reconcile(&snapshot("bob", "bob-phone", 2, 1)).is_applied());
        assert!(r.reconcile(&snapshot("carol", "carol-phone", 2, 2)).is_applied());
    }

    #[test]
    fn test_local_commit_raises_held_revision() {
        let mut r = reconciler();
        let identity = LocalIdentity::new(ParticipantId::new("alice"), DeviceId::new("local"));
        let mut mine = GameSession::create(
            SessionId::new("s1"),
            GameType::SocialDeduction,
            "day",
            &json!({}),
            &identity,
        )
        .unwrap();
        mine.revision = 7;
        r.record_local(&mine);

        assert!(matches!(
            r.reconcile(&snapshot("bob", "bob-phone", 6, 1)),
            ReconcileOutcome::Stale { incoming: 6, held: 7 }
        ));
    }

    #[test]
    fn test_guard_disabled_accepts_older() {
        let mut r = Reconciler::new(DeviceId::new("local"), StaleGuard::Disabled);
        assert!(r.reconcile(&snapshot("bob", "bob-phone", 9, 1)).is_applied());
        assert!(r.reconcile(&snapshot("carol", "carol-phone", 1, 2)).is_applied());
    }

    #[test]
    fn test_malformed_document() {
        let mut r = reconciler();
        let mut snap = snapshot("bob", "bob-phone", 1, 1);
        snap.document = "{oops".to_string();
        assert!(matches!(r.reconcile(&snap), ReconcileOutcome::Malformed(_)));
    }
}
