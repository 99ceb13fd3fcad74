use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use taskd_types::Task;

use crate::error::{StoreError, StoreResult};

/// Schema version written into every snapshot.
///
/// A snapshot carrying any other version is treated as corrupt; there is no
/// migration path.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Full serialized state of every collection.
///
/// On-disk format (JSON):
/// ```text
/// { "version": 1, "collections": { "tasks": [ {task}, ... ] } }
/// ```
/// Records inside a collection appear in insertion order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    pub version: u32,
    pub collections: BTreeMap<String, Vec<Task>>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            collections: BTreeMap::new(),
        }
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    /// Decode and check a snapshot read from `origin`.
    ///
    /// Fails with [`StoreError::CorruptState`] on malformed JSON, unknown
    /// fields, a foreign schema version, duplicate ids, or records that
    /// violate the record invariants.
    pub fn decode(bytes: &[u8], origin: &Path) -> StoreResult<Self> {
        let corrupt = |reason: String| StoreError::CorruptState {
            path: origin.to_path_buf(),
            reason,
        };

        let snapshot: Snapshot =
            serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(corrupt(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }

        for (name, records) in &snapshot.collections {
            let mut seen = HashSet::with_capacity(records.len());
            for record in records {
                if !seen.insert(&record.id) {
                    return Err(corrupt(format!(
                        "duplicate id {} in collection `{name}`",
                        record.id
                    )));
                }
                if record.title.trim().is_empty() || record.description.trim().is_empty() {
                    return Err(corrupt(format!(
                        "record {} in collection `{name}` has an empty content field",
                        record.id
                    )));
                }
                if record.updated_at < record.created_at {
                    return Err(corrupt(format!(
                        "record {} in collection `{name}` was updated before it was created",
                        record.id
                    )));
                }
            }
        }

        Ok(snapshot)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskd_types::{NewTask, now};

    fn origin() -> &'static Path {
        Path::new("test.json")
    }

    fn with_task() -> Snapshot {
        let mut snapshot = Snapshot::empty();
        let task = NewTask::new("A", "B").into_task(now()).unwrap();
        snapshot.collections.insert("tasks".into(), vec![task]);
        snapshot
    }

    #[test]
    fn encode_decode() {
        let snapshot = with_task();
        let bytes = snapshot.encode().unwrap();
        assert_eq!(Snapshot::decode(&bytes, origin()).unwrap(), snapshot);
    }

    #[test]
    fn rejects_garbage() {
        let err = Snapshot::decode(b"{not json", origin()).unwrap_err();
        assert!(matches!(err, StoreError::CorruptState { .. }));
    }

    #[test]
    fn rejects_foreign_version() {
        let err = Snapshot::decode(br#"{"version":2,"collections":{}}"#, origin()).unwrap_err();
        match err {
            StoreError::CorruptState { reason, .. } => assert!(reason.contains("version 2")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = Snapshot::decode(
            br#"{"version":1,"collections":{},"indexes":[]}"#,
            origin(),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::CorruptState { .. }));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut snapshot = with_task();
        let records = snapshot.collections.get_mut("tasks").unwrap();
        let copy = records[0].clone();
        records.push(copy);
        let bytes = snapshot.encode().unwrap();
        let err = Snapshot::decode(&bytes, origin()).unwrap_err();
        assert!(matches!(err, StoreError::CorruptState { .. }));
    }
}
