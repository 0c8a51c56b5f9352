#![deny(missing_docs)]

//! Core types for the replica-exchange coordinator: structured errors, the
//! deterministic RNG policy, and the per-replica parameter state that the
//! exchange engine mutates between global barriers.

pub mod errors;
pub mod replica;
pub mod rng;

pub use errors::{ErrorInfo, RepexError};
pub use replica::{Axis, AxisSlot, Replica, ReplicaId};
pub use rng::{derive_substream_seed, RngHandle};
