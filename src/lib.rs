//! # party-sync
//!
//! Session synchronization core for multi-device party games.
//!
//! ## Design Principles
//!
//! 1. **Whole-Document Sync**: A game session is one document. Writers
//!    replace it wholesale; readers adopt the latest snapshot. Nothing is
//!    field-merged.
//!
//! 2. **Participant ≠ Device**: Every write carries both who acted and which
//!    device wrote it. Echo suppression keys on the device, so one person
//!    with two tabs still sees their own moves arrive.
//!
//! 3. **Pure Rules**: Rule engines turn `(payload, actor, action)` into a new
//!    payload or a rejection. Randomness arrives inside actions, so every
//!    device replaying an action computes the same result.
//!
//! ## Architecture
//!
//! - **Two Commit Lanes**: Coalesced writes are debounced; immediate writes
//!   (turn hand-offs, phase changes, game end) go out at once and supersede
//!   any pending coalesced write.
//!
//! - **Push + Poll**: Both transports feed one `SnapshotFeed`, and the
//!   `Reconciler` is idempotent against either delivering the same snapshot.
//!
//! - **Revision Guard**: Every write bumps a per-session revision. A late
//!   write carrying an older revision is refused and the newer document is
//!   re-asserted.
//!
//! ## Modules
//!
//! - `core`: Identities, participants, the session document, action log, RNG, configuration
//! - `sync`: Remote store, commit client, reconciler, snapshot feed, replica
//! - `rules`: RulesEngine trait for game implementations
//! - `board`: Circular-path movement & capture, and the board-race game
//! - `tally`: Ballot tally, elimination & win resolution, and the deduction game
//! - `telemetry`: Tracing subscriber setup

pub mod core;
pub mod error;
pub mod rules;
pub mod sync;
pub mod board;
pub mod tally;
pub mod telemetry;

// Re-export commonly used types
pub use crate::core::{
    DeviceId, GameType, SessionId, SessionScope,
    Participant, ParticipantId, LocalIdentity, Seat, SeatMap,
    GameRng, LatencyClass, StaleGuard, SyncConfig,
    ActionLog, ActionLogEntry, LogDraft,
    GameSession, SessionView,
};

pub use crate::error::{ActionError, MoveRejection, SyncError, SyncResult};

pub use crate::rules::{Applied, GameResult, RulesEngine};

pub use crate::sync::{
    CommitOutcome, CommitPriority, Delivery, DeliverySource, MemoryStore, ReconcileOutcome,
    Reconciler, RemoteStore, SessionRecord, SessionReplica, SessionStoreClient, SnapshotFeed,
};

pub use crate::board::{
    Board, BoardConfig, BoardEntity, CaptureEvent, MoveResult, PositionCode,
    RaceAction, RaceGame, RacePayload, RacePhase,
};

pub use crate::tally::{
    resolve_elimination, tally, Faction, Roster, TallyOutcome, WinRule,
    DeductionAction, DeductionGame, DeductionPayload, DeductionPhase, Role,
};

pub use crate::telemetry::init_tracing;
