use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use taskd_types::{NewTask, RecordId, Task, TaskPatch, now};

use crate::error::{StoreError, StoreResult};
use crate::file::FileSnapshot;
use crate::matcher::Filter;
use crate::snapshot::Snapshot;
use crate::traits::SnapshotBackend;

/// Collection used by the task endpoints.
pub const DEFAULT_COLLECTION: &str = "tasks";

/// Embedded record store: the single point of truth and of persistence.
///
/// Holds every collection in memory and checkpoints the full snapshot
/// through its [`SnapshotBackend`] after each mutation. The write lock is
/// held across the durable write, so snapshot writes never overlap and a
/// failed write is rolled back before any other caller can observe it.
pub struct Store {
    backend: Box<dyn SnapshotBackend>,
    state: RwLock<Snapshot>,
}

impl Store {
    /// Load the store from `backend`, ensuring each named collection exists.
    ///
    /// Fails with `CorruptState` if a snapshot exists but cannot be decoded.
    pub fn open<B, I, S>(backend: B, collections: I) -> StoreResult<Self>
    where
        B: SnapshotBackend + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let loaded = backend.load()?;
        let fresh = loaded.is_none();
        let mut snapshot = loaded.unwrap_or_default();
        for name in collections {
            snapshot.collections.entry(name.into()).or_default();
        }

        let records: usize = snapshot.collections.values().map(Vec::len).sum();
        info!(
            location = %backend.location().display(),
            collections = snapshot.collections.len(),
            records,
            fresh,
            "store opened"
        );

        Ok(Self {
            backend: Box::new(backend),
            state: RwLock::new(snapshot),
        })
    }

    /// Open a store persisted to a JSON snapshot file at `path`.
    pub fn open_file<I, S>(path: impl Into<PathBuf>, collections: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::open(FileSnapshot::open(path)?, collections)
    }

    /// Records in `collection` matching `filter`, in insertion order.
    ///
    /// An unknown collection or no matches yields an empty vector.
    pub fn select(&self, collection: &str, filter: Option<&Filter>) -> Vec<Task> {
        let state = self.read_state();
        let Some(records) = state.collections.get(collection) else {
            return Vec::new();
        };
        match filter {
            Some(filter) => records
                .iter()
                .filter(|task| filter.matches(task))
                .cloned()
                .collect(),
            None => records.clone(),
        }
    }

    /// Look up a single record.
    pub fn get(&self, collection: &str, id: &RecordId) -> StoreResult<Task> {
        self.read_state()
            .collections
            .get(collection)
            .and_then(|records| records.iter().find(|task| &task.id == id))
            .cloned()
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    /// Validate `draft`, stamp it, append it, and persist.
    ///
    /// Assigns a generated id when the draft has none. Inserting into a
    /// collection that does not exist yet creates it.
    pub fn insert(&self, collection: &str, draft: NewTask) -> StoreResult<Task> {
        let task = draft.into_task(now())?;

        let mut state = self.write_state();
        let created = !state.collections.contains_key(collection);
        let records = state.collections.entry(collection.to_owned()).or_default();
        if records.iter().any(|existing| existing.id == task.id) {
            return Err(StoreError::DuplicateId {
                collection: collection.to_owned(),
                id: task.id,
            });
        }
        records.push(task.clone());

        self.commit(&mut state, |snapshot| {
            if created {
                snapshot.collections.remove(collection);
            } else if let Some(records) = snapshot.collections.get_mut(collection) {
                records.pop();
            }
        })?;

        debug!(collection, id = %task.id, "record inserted");
        Ok(task)
    }

    /// Merge `patch` over the record with `id` and persist.
    ///
    /// Never creates a record; a missing id is `NotFound`.
    pub fn update(&self, collection: &str, id: &RecordId, patch: TaskPatch) -> StoreResult<()> {
        patch.validate()?;

        let mut state = self.write_state();
        let records = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let index = records
            .iter()
            .position(|task| &task.id == id)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let previous = records[index].clone();
        records[index].apply(&patch);

        self.commit(&mut state, move |snapshot| {
            if let Some(records) = snapshot.collections.get_mut(collection) {
                records[index] = previous;
            }
        })?;

        debug!(collection, %id, "record updated");
        Ok(())
    }

    /// Remove the record with `id` and persist.
    pub fn delete(&self, collection: &str, id: &RecordId) -> StoreResult<()> {
        let mut state = self.write_state();
        let records = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let index = records
            .iter()
            .position(|task| &task.id == id)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let removed = records.remove(index);

        self.commit(&mut state, move |snapshot| {
            if let Some(records) = snapshot.collections.get_mut(collection) {
                records.insert(index, removed);
            }
        })?;

        debug!(collection, %id, "record deleted");
        Ok(())
    }

    /// Number of records in `collection` (zero if it does not exist).
    pub fn len(&self, collection: &str) -> usize {
        self.read_state()
            .collections
            .get(collection)
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Names of all collections, sorted.
    pub fn collection_names(&self) -> Vec<String> {
        self.read_state().collections.keys().cloned().collect()
    }

    /// Where the snapshot is persisted.
    pub fn location(&self) -> &Path {
        self.backend.location()
    }

    /// Persist the mutated snapshot, undoing the mutation if the write fails.
    fn commit(
        &self,
        state: &mut RwLockWriteGuard<'_, Snapshot>,
        undo: impl FnOnce(&mut Snapshot),
    ) -> StoreResult<()> {
        if let Err(e) = self.backend.save(state) {
            undo(state);
            warn!(error = %e, "durable write failed; mutation rolled back");
            return Err(e);
        }
        Ok(())
    }

    fn read_state(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.state.read().expect("store lock poisoned")
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, Snapshot> {
        self.state.write().expect("store lock poisoned")
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("location", &self.location())
            .field("collections", &self.collection_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::FilterField;
    use crate::memory::InMemorySnapshot;
    use std::collections::HashSet;
    use std::sync::Arc;

    const TASKS: &str = DEFAULT_COLLECTION;

    fn memory_store() -> (InMemorySnapshot, Store) {
        let backend = InMemorySnapshot::new();
        let store = Store::open(backend.clone(), [TASKS]).unwrap();
        (backend, store)
    }

    // -----------------------------------------------------------------------
    // Insert / select
    // -----------------------------------------------------------------------

    #[test]
    fn empty_collection_selects_nothing() {
        let (_, store) = memory_store();
        assert!(store.select(TASKS, None).is_empty());
        assert!(store.select(TASKS, Some(&Filter::new())).is_empty());
        assert!(store.select("missing", None).is_empty());
    }

    #[test]
    fn insert_assigns_unique_ids() {
        let (_, store) = memory_store();
        for i in 0..1000 {
            store.insert(TASKS, NewTask::new(format!("t{i}"), "d")).unwrap();
        }
        let ids: HashSet<RecordId> = store
            .select(TASKS, None)
            .into_iter()
            .map(|task| task.id)
            .collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn insert_persists_before_returning() {
        let (backend, store) = memory_store();
        let task = store.insert(TASKS, NewTask::new("A", "B")).unwrap();
        assert_eq!(backend.save_count(), 1);
        let persisted = backend.load().unwrap().unwrap();
        assert_eq!(persisted.collections[TASKS], vec![task]);
    }

    #[test]
    fn insert_rejects_blank_fields() {
        let (backend, store) = memory_store();
        let err = store.insert(TASKS, NewTask::new("", "B")).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.is_empty(TASKS));
        assert_eq!(backend.save_count(), 0);
    }

    #[test]
    fn insert_rejects_duplicate_supplied_id() {
        let (_, store) = memory_store();
        let id = RecordId::parse("fixed").unwrap();
        store
            .insert(TASKS, NewTask::new("A", "B").with_id(id.clone()))
            .unwrap();
        let err = store
            .insert(TASKS, NewTask::new("C", "D").with_id(id))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId { .. }));
        assert_eq!(store.len(TASKS), 1);
    }

    #[test]
    fn select_preserves_insertion_order() {
        let (_, store) = memory_store();
        for title in ["c", "a", "b"] {
            store.insert(TASKS, NewTask::new(title, "x")).unwrap();
        }
        let titles: Vec<_> = store
            .select(TASKS, None)
            .into_iter()
            .map(|task| task.title)
            .collect();
        assert_eq!(titles, ["c", "a", "b"]);
    }

    #[test]
    fn select_and_filter() {
        let (_, store) = memory_store();
        store.insert(TASKS, NewTask::new("Buy milk", "at store")).unwrap();
        let eggs = store.insert(TASKS, NewTask::new("Buy eggs", "at market")).unwrap();

        let filter = Filter::new()
            .with(FilterField::Title, "Buy")
            .with(FilterField::Description, "market");
        assert_eq!(store.select(TASKS, Some(&filter)), vec![eggs]);
    }

    #[test]
    fn select_is_idempotent() {
        let (_, store) = memory_store();
        store.insert(TASKS, NewTask::new("Buy milk", "at store")).unwrap();
        store.insert(TASKS, NewTask::new("Walk", "dog")).unwrap();
        let filter = Filter::new().with(FilterField::Title, "Buy");
        assert_eq!(
            store.select(TASKS, Some(&filter)),
            store.select(TASKS, Some(&filter))
        );
        assert_eq!(store.select(TASKS, None), store.select(TASKS, None));
    }

    #[test]
    fn insert_creates_unknown_collection() {
        let (_, store) = memory_store();
        store.insert("notes", NewTask::new("A", "B")).unwrap();
        assert_eq!(store.collection_names(), ["notes", TASKS]);
        assert!(store.is_empty(TASKS));
    }

    // -----------------------------------------------------------------------
    // Update / delete
    // -----------------------------------------------------------------------

    #[test]
    fn update_preserves_untouched_fields() {
        let (_, store) = memory_store();
        let original = store.insert(TASKS, NewTask::new("A", "B")).unwrap();
        store
            .update(TASKS, &original.id, TaskPatch::new().title("C"))
            .unwrap();

        let updated = store.get(TASKS, &original.id).unwrap();
        assert_eq!(updated.title, "C");
        assert_eq!(updated.description, "B");
        assert_eq!(updated.created_at, original.created_at);
        assert!(updated.updated_at > original.updated_at);
    }

    #[test]
    fn update_missing_is_not_found() {
        let (backend, store) = memory_store();
        let id = RecordId::generate();
        let err = store.update(TASKS, &id, TaskPatch::complete()).unwrap_err();
        assert!(err.is_not_found());
        assert!(store.is_empty(TASKS));
        assert_eq!(backend.save_count(), 0);

        let err = store.update("missing", &id, TaskPatch::complete()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn update_rejects_blank_title() {
        let (_, store) = memory_store();
        let task = store.insert(TASKS, NewTask::new("A", "B")).unwrap();
        let err = store
            .update(TASKS, &task.id, TaskPatch::new().title("   "))
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(store.get(TASKS, &task.id).unwrap(), task);
    }

    #[test]
    fn complete_sets_completed_at() {
        let (_, store) = memory_store();
        let task = store.insert(TASKS, NewTask::new("A", "B")).unwrap();
        store.update(TASKS, &task.id, TaskPatch::complete()).unwrap();
        let done = store.get(TASKS, &task.id).unwrap();
        assert!(done.is_completed());
        assert!(done.updated_at > task.updated_at);
    }

    #[test]
    fn delete_then_select() {
        let (_, store) = memory_store();
        let keep = store.insert(TASKS, NewTask::new("keep", "x")).unwrap();
        let gone = store.insert(TASKS, NewTask::new("gone", "x")).unwrap();

        store.delete(TASKS, &gone.id).unwrap();
        assert_eq!(store.select(TASKS, None), vec![keep]);

        let err = store.delete(TASKS, &gone.id).unwrap_err();
        assert!(err.is_not_found());
    }

    // -----------------------------------------------------------------------
    // Durability
    // -----------------------------------------------------------------------

    #[test]
    fn reopen_restores_records() {
        let (backend, store) = memory_store();
        let a = store.insert(TASKS, NewTask::new("A", "B")).unwrap();
        store.update(TASKS, &a.id, TaskPatch::complete()).unwrap();
        store.insert(TASKS, NewTask::new("C", "D")).unwrap();
        let before = store.select(TASKS, None);
        drop(store);

        let reopened = Store::open(backend, [TASKS]).unwrap();
        assert_eq!(reopened.select(TASKS, None), before);
    }

    #[test]
    fn reopen_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data/db.json");
        let task = {
            let store = Store::open_file(&path, [TASKS]).unwrap();
            store.insert(TASKS, NewTask::new("Buy milk", "at store")).unwrap()
        };
        let store = Store::open_file(&path, [TASKS]).unwrap();
        assert_eq!(store.select(TASKS, None), vec![task]);
    }

    #[test]
    fn failed_insert_rolls_back() {
        let (backend, store) = memory_store();
        let kept = store.insert(TASKS, NewTask::new("A", "B")).unwrap();
        backend.set_read_only(true);

        let err = store.insert(TASKS, NewTask::new("C", "D")).unwrap_err();
        assert!(matches!(err, StoreError::NotPersistable { .. }));
        assert_eq!(store.select(TASKS, None), vec![kept]);

        let err = store.insert("notes", NewTask::new("C", "D")).unwrap_err();
        assert!(matches!(err, StoreError::NotPersistable { .. }));
        assert_eq!(store.collection_names(), [TASKS]);
    }

    #[test]
    fn failed_update_rolls_back() {
        let (backend, store) = memory_store();
        let task = store.insert(TASKS, NewTask::new("A", "B")).unwrap();
        backend.set_read_only(true);

        let err = store
            .update(TASKS, &task.id, TaskPatch::new().title("C"))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotPersistable { .. }));
        assert_eq!(store.get(TASKS, &task.id).unwrap(), task);
    }

    #[test]
    fn failed_delete_rolls_back_in_place() {
        let (backend, store) = memory_store();
        for title in ["a", "b", "c"] {
            store.insert(TASKS, NewTask::new(title, "x")).unwrap();
        }
        let before = store.select(TASKS, None);
        backend.set_read_only(true);

        let err = store.delete(TASKS, &before[1].id).unwrap_err();
        assert!(matches!(err, StoreError::NotPersistable { .. }));
        assert_eq!(store.select(TASKS, None), before);
    }

    #[test]
    fn corrupt_snapshot_fails_open() {
        let backend = InMemorySnapshot::with_bytes(r#"{"version":1,"collections":"#);
        let err = Store::open(backend, [TASKS]).unwrap_err();
        assert!(matches!(err, StoreError::CorruptState { .. }));
    }

    #[test]
    fn concurrent_inserts_all_persist() {
        let (backend, store) = memory_store();
        let store = Arc::new(store);
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        store
                            .insert(TASKS, NewTask::new(format!("w{worker}-{i}"), "x"))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(TASKS), 200);
        let persisted = backend.load().unwrap().unwrap();
        assert_eq!(persisted.collections[TASKS].len(), 200);
    }
}
