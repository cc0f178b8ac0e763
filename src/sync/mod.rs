//! Session synchronization substrate.
//!
//! Leaderless, whole-document last-write-wins sync:
//! - `store`: the remote persistence + notification contract
//! - `client`: commit (coalesced / immediate lanes), fetch, subscribe
//! - `reconciler`: echo, duplicate and staleness checks on incoming snapshots
//! - `feed`: push and polling unified into one snapshot stream
//! - `replica`: optimistic local apply wired to a rule engine

pub mod store;
pub mod client;
pub mod reconciler;
pub mod feed;
pub mod replica;

pub use store::{MemoryStore, RemoteStore, SessionRecord};
pub use client::{CommitOutcome, CommitPriority, SessionStoreClient};
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use feed::{Delivery, DeliverySource, SnapshotFeed};
pub use replica::SessionReplica;
