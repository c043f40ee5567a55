//! Core types and errors for the replica-set sync engine.
//!
//! This crate provides the foundational types shared across the engine:
//!
//! - **Types**: [`Wallet`], [`ClockValue`], [`NodeIdentity`],
//!   [`UserReplicaAssignment`], [`SyncJob`]
//! - **Errors**: the engine-wide taxonomy in [`SyncError`]
//!
//! Nothing in this crate performs I/O.

mod error;
pub mod types;

pub use error::{Result, SyncError};
pub use types::*;
