//! HTTP client for the replica-set sync engine.
//!
//! Provides [`NodeClient`], which covers every outbound interface the
//! engine uses: the directory query for primary-user assignments, batched
//! clock probes against secondaries, sync dispatch, and sync-status
//! polling.

mod client;
pub mod api;

pub use client::{NodeClient, NodeClientBuilder};
pub use repsync_core::{Result, SyncError};
