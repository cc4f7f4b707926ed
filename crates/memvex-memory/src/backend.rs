// backend.rs — The MemoryBackend capability interface.
//
// Every backend implements the same contract; the factory in service.rs
// picks one at startup. Callers never learn which one they got except via
// `name()`.

use uuid::Uuid;

use crate::entry::{MemoryEntry, MemoryQuery, NewMemory};
use crate::error::MemoryError;

/// Storage for memory entries.
///
/// Contract shared by all implementations:
/// - `store` assigns id and `created_at` and returns the full entry.
/// - `recall` applies the backend's text match plus exact namespace and
///   tag-intersection filters, newest first, at most `query.limit` results.
/// - `list` is newest first with no limit.
/// - `forget` reports whether a row was removed.
pub trait MemoryBackend: Send + Sync {
    /// Backend identifier: "memory", "sqlite" or "sqlite-like".
    fn name(&self) -> &'static str;

    fn store(&self, new: NewMemory) -> Result<MemoryEntry, MemoryError>;

    fn recall(&self, query: &MemoryQuery) -> Result<Vec<MemoryEntry>, MemoryError>;

    fn forget(&self, id: Uuid) -> Result<bool, MemoryError>;

    fn list(&self, namespace: Option<&str>) -> Result<Vec<MemoryEntry>, MemoryError>;

    /// Delete every entry, or every entry in `namespace`. Returns the count.
    fn clear(&self, namespace: Option<&str>) -> Result<usize, MemoryError>;
}
