//! # rostra-store
//!
//! Document-store abstraction for the Rostra reconciliation core.
//!
//! The reconciler is written against the narrow primitive set of a document
//! database: point get, set (with optional merge), update, filtered queries
//! with `==`/`<`/`in` plus ordering and cursors, and atomic batches of up to
//! [`MAX_BATCH_OPS`] writes. Those economics (expensive per-document writes,
//! small `in` queries, bounded batches) are part of the contract, so the
//! limits live here rather than in any particular backend.
//!
//! Backends:
//! - [`MemoryStore`]: always available; backs tests and single-node runs.
//! - `PgDocStore`: JSONB documents table on Postgres, behind the `postgres`
//!   feature.

pub mod document;
pub mod error;
pub mod memory;
pub mod models;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod query;
pub mod repo;
pub mod store;

pub use document::{DocPath, Document, FieldMap};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgDocStore;
pub use query::{Cursor, Filter, FilterOp, Query};
pub use store::{DocumentStore, WriteBatch, WriteOp, MAX_BATCH_OPS, MAX_IN_OPERANDS};
