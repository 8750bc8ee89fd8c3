//! The `DocumentStore` trait and write batches.

use async_trait::async_trait;

use crate::document::{DocPath, Document, FieldMap};
use crate::error::{StoreError, StoreResult};
use crate::query::Query;

/// Maximum operations per atomic batch commit.
pub const MAX_BATCH_OPS: usize = 500;

/// Maximum operands per `in` filter.
pub const MAX_IN_OPERANDS: usize = 10;

/// A single buffered write.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Create or replace a document; with `merge`, only the supplied fields
    /// are written and the rest are preserved.
    Set {
        path: DocPath,
        fields: FieldMap,
        merge: bool,
    },
    /// Update fields of an existing document; fails if it does not exist.
    Update { path: DocPath, fields: FieldMap },
}

/// An ordered group of writes committed atomically.
///
/// Backends reject batches over [`MAX_BATCH_OPS`]; callers are expected to
/// size their groups below the limit rather than rely on the error.
#[derive(Debug, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a set.
    pub fn set(&mut self, path: DocPath, fields: FieldMap, merge: bool) {
        self.ops.push(WriteOp::Set {
            path,
            fields,
            merge,
        });
    }

    /// Buffer an update.
    pub fn update(&mut self, path: DocPath, fields: FieldMap) {
        self.ops.push(WriteOp::Update { path, fields });
    }

    /// Number of buffered operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Consume the batch, validating the op-count limit.
    pub fn into_ops(self) -> StoreResult<Vec<WriteOp>> {
        if self.ops.len() > MAX_BATCH_OPS {
            return Err(StoreError::BatchTooLarge {
                len: self.ops.len(),
                max: MAX_BATCH_OPS,
            });
        }
        Ok(self.ops)
    }
}

/// The primitive surface the reconciliation core assumes of its database.
///
/// Timestamps are assigned by the store at write time from its own clock,
/// monotonic per client. Individual document writes are atomic; batches are
/// all-or-nothing; there are no multi-batch transactions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read. `Ok(None)` when the document does not exist.
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>>;

    /// Create or replace a document. With `merge`, only supplied fields are
    /// written; the document is created if absent.
    async fn set(&self, path: &DocPath, fields: FieldMap, merge: bool) -> StoreResult<()>;

    /// Update fields of an existing document. [`StoreError::NotFound`] if
    /// the document does not exist.
    async fn update(&self, path: &DocPath, fields: FieldMap) -> StoreResult<()>;

    /// Run a filtered query. `in` filters are limited to
    /// [`MAX_IN_OPERANDS`] operands.
    async fn run_query(&self, query: &Query) -> StoreResult<Vec<Document>>;

    /// Count matching documents without materializing them.
    async fn count(&self, query: &Query) -> StoreResult<usize>;

    /// Commit a batch atomically.
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;
}
