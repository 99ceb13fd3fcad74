//! Foundation types for taskd.
//!
//! This crate provides the record and identifier types shared by the store,
//! the ingest pipeline, and the HTTP layer. Every other taskd crate depends
//! on `taskd-types`.
//!
//! # Key Types
//!
//! - [`RecordId`] — Opaque unique record identifier (UUID v7 text when generated)
//! - [`Task`] — A stored task record with content fields and timestamps
//! - [`NewTask`] — Validated input for creating a task
//! - [`TaskPatch`] — The fixed set of fields an update may change
//! - [`Timestamp`] — UTC wall-clock instant used for all record timestamps

pub mod error;
pub mod id;
pub mod task;
pub mod temporal;

pub use error::ValidationError;
pub use id::RecordId;
pub use task::{NewTask, Task, TaskPatch};
pub use temporal::{Timestamp, advance, now};
