//! pnflow — a concurrent execution engine for Petri nets.
//!
//! Places hold integer token counts, transitions atomically move
//! tokens from their input places to their output places, arcs carry
//! weights. Many transitions fire in parallel on a shared-queue thread
//! pool, which makes the crate a stress rig for concurrent algorithms:
//! model a mutex, a bounded buffer or the dining philosophers and
//! watch deadlock, livelock or correct exclusion emerge.
//!
//! Two firing disciplines share one data model: the greedy engine
//! ([`runtime::EngineKind::Greedy`]) fires a transition as soon as it
//! looks enabled, racing attempts against each other; the time-ordered
//! engine ([`runtime::EngineKind::TimeOrdered`]) fires candidates one
//! at a time from a priority queue keyed by delays or random
//! priorities. See [`net`] for a complete build-run-inspect example.

pub mod export;
pub mod models;
pub mod net;
pub mod pool;
pub mod runtime;
mod utils;

pub use net::{Net, NodeRef, Place, PlaceId, Transition, TransitionId, Weight};
pub use runtime::{EngineKind, Runtime, RuntimeConfig, TimedPolicy};
