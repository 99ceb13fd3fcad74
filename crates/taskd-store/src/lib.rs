//! Embedded record store for taskd.
//!
//! The store owns every named collection of [`Task`](taskd_types::Task)
//! records, answers filtered selects, and persists a full snapshot of its
//! state after every mutation.
//!
//! # Components
//!
//! - [`Store`] -- select / get / insert / update / delete over named collections
//! - [`Filter`] -- AND-of-substrings query matcher
//! - [`Snapshot`] -- the serialized form of all collections
//!
//! # Snapshot Backends
//!
//! All backends implement the [`SnapshotBackend`] trait:
//!
//! - [`FileSnapshot`] -- JSON file replaced atomically via temp-file + rename
//! - [`InMemorySnapshot`] -- byte buffer for tests and embedding
//!
//! # Design Rules
//!
//! 1. Every mutation is durable before it returns; there is no flush step.
//! 2. A failed durable write rolls the in-memory state back to the pre-call state.
//! 3. Mutations are serialized; reads run concurrently.
//! 4. Records are validated before they enter the store, never after.
//! 5. An unreadable snapshot is fatal at open, never silently discarded.

pub mod error;
pub mod file;
pub mod matcher;
pub mod memory;
pub mod snapshot;
pub mod store;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use file::FileSnapshot;
pub use matcher::{Filter, FilterField, UnknownField, matches};
pub use memory::InMemorySnapshot;
pub use snapshot::{SNAPSHOT_VERSION, Snapshot};
pub use store::{DEFAULT_COLLECTION, Store};
pub use traits::SnapshotBackend;
