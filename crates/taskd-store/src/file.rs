use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::snapshot::Snapshot;
use crate::traits::SnapshotBackend;

/// JSON snapshot file on local disk.
///
/// Every save writes the full snapshot to a temporary file in the same
/// directory, syncs it, renames it over the target, and syncs the
/// directory so the rename itself survives a crash. Readers never observe
/// a partially written snapshot.
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    path: PathBuf,
}

impl FileSnapshot {
    /// Use the snapshot file at `path`, creating its parent directory.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn write_atomic(&self, bytes: &[u8]) -> io::Result<()> {
        let mut tmp = NamedTempFile::new_in(self.dir())?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        sync_dir(self.dir())
    }
}

/// Flush a directory's entries to disk.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

/// Directory handles cannot be synced on this platform; the rename is
/// made durable by the filesystem.
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

impl SnapshotBackend for FileSnapshot {
    fn load(&self) -> StoreResult<Option<Snapshot>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %self.path.display(), len = bytes.len(), "snapshot read");
        Snapshot::decode(&bytes, &self.path).map(Some)
    }

    fn save(&self, snapshot: &Snapshot) -> StoreResult<()> {
        let not_persistable = |reason: String| StoreError::NotPersistable {
            path: self.path.clone(),
            reason,
        };
        let bytes = snapshot.encode().map_err(|e| not_persistable(e.to_string()))?;
        self.write_atomic(&bytes)
            .map_err(|e| not_persistable(e.to_string()))?;
        debug!(path = %self.path.display(), len = bytes.len(), "snapshot written");
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}
