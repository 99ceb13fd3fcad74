use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::{StoreError, StoreResult};
use crate::snapshot::Snapshot;
use crate::traits::SnapshotBackend;

const LOCATION: &str = ":memory:";

/// In-memory snapshot backend.
///
/// Intended for tests and embedding. Holds the encoded snapshot bytes, so a
/// store reopened on a clone of this backend goes through the same decode
/// path as one reopened from disk. Clones share state.
#[derive(Clone, Default)]
pub struct InMemorySnapshot {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    bytes: RwLock<Option<Vec<u8>>>,
    read_only: AtomicBool,
    saves: AtomicUsize,
}

impl InMemorySnapshot {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the backend with raw snapshot bytes.
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let backend = Self::new();
        *backend.inner.bytes.write().expect("lock poisoned") = Some(bytes.into());
        backend
    }

    /// When set, every `save` fails with `NotPersistable`.
    pub fn set_read_only(&self, read_only: bool) {
        self.inner.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.inner.saves.load(Ordering::SeqCst)
    }

    /// The currently persisted bytes, if any.
    pub fn bytes(&self) -> Option<Vec<u8>> {
        self.inner.bytes.read().expect("lock poisoned").clone()
    }
}

impl SnapshotBackend for InMemorySnapshot {
    fn load(&self) -> StoreResult<Option<Snapshot>> {
        let bytes = self.inner.bytes.read().expect("lock poisoned");
        match bytes.as_deref() {
            Some(bytes) => Snapshot::decode(bytes, Path::new(LOCATION)).map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, snapshot: &Snapshot) -> StoreResult<()> {
        let not_persistable = |reason: String| StoreError::NotPersistable {
            path: LOCATION.into(),
            reason,
        };
        if self.inner.read_only.load(Ordering::SeqCst) {
            return Err(not_persistable("backend is read-only".into()));
        }
        let encoded = snapshot.encode().map_err(|e| not_persistable(e.to_string()))?;
        *self.inner.bytes.write().expect("lock poisoned") = Some(encoded);
        self.inner.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn location(&self) -> &Path {
        Path::new(LOCATION)
    }
}

impl std::fmt::Debug for InMemorySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySnapshot")
            .field("saves", &self.save_count())
            .field("read_only", &self.inner.read_only.load(Ordering::SeqCst))
            .finish()
    }
}
