//! # rostra-reconcile
//!
//! The roster reconciliation engine: converges an organization's employee
//! collection to reflect heterogeneous, partially-ordered ingestion events
//! while holding store traffic to O(N/K) reads and O(N/B) batched writes.
//!
//! The pieces:
//! - [`EpochManager`]: allocates run epochs and persists run state.
//! - [`Reconciler`]: dedup, bulk lookup with caching, bounded-parallel
//!   batched writes, adaptive batch sizing.
//! - [`CircuitBreaker`]: short-circuits work when the cumulative store
//!   error rate crosses the threshold.
//! - [`DeltaProcessor`]: in-order single-employee status transitions.
//! - [`Finalizer`]: post-snapshot sweep marking absent employees.
//! - [`RosterService`]: the facade the ingestion API drives.

pub mod cache;
pub mod circuit;
pub mod config;
pub mod delta;
pub mod epoch;
pub mod error;
pub mod finalizer;
pub mod metrics;
pub mod reconciler;
pub mod service;
pub mod types;

pub use cache::DocRefCache;
pub use circuit::{CircuitBreaker, CircuitState};
pub use config::ReconcileConfig;
pub use delta::DeltaProcessor;
pub use epoch::EpochManager;
pub use error::{ReconcileError, ReconcileResult};
pub use finalizer::{FinalizeOutcome, Finalizer};
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use service::{RosterService, UpsertReport};
pub use types::{DeltaMessage, DeltaOutcome, DeltaType, UpsertMessage};
