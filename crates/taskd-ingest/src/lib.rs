//! Bulk CSV ingest for taskd.
//!
//! Turns a delimited text source into a sequence of store inserts without
//! holding the whole source in memory. Runs are tracked as jobs whose state
//! can be queried after the request that started them has returned.

pub mod error;
pub mod job;
pub mod pipeline;
pub mod row;

pub use error::IngestError;
pub use job::{DEFAULT_RETAINED_JOBS, IngestJobs, JobFailure, JobId, JobState, JobStatus};
pub use pipeline::{IngestPipeline, IngestReport};
pub use row::{DEFAULT_DELIMITER, is_open_record, parse_row, split_fields};
