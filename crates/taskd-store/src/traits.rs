use std::path::Path;

use crate::error::StoreResult;
use crate::snapshot::Snapshot;

/// Durable home of the store's snapshot.
///
/// All implementations must satisfy these invariants:
/// - `save` replaces the previous snapshot atomically: a later `load` sees
///   either the old snapshot or the new one, never a mix.
/// - `save` returns only after the new snapshot is durable.
/// - A failed `save` leaves the previous snapshot intact.
/// - All I/O errors are propagated, never silently ignored.
pub trait SnapshotBackend: Send + Sync {
    /// Read the last durable snapshot.
    ///
    /// Returns `Ok(None)` if no snapshot has ever been written.
    /// Returns `Err(CorruptState)` if one exists but cannot be decoded.
    fn load(&self) -> StoreResult<Option<Snapshot>>;

    /// Durably replace the snapshot.
    ///
    /// Failures surface as `NotPersistable`.
    fn save(&self, snapshot: &Snapshot) -> StoreResult<()>;

    /// Where the snapshot lives, for logs and error messages.
    fn location(&self) -> &Path;
}
