use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use taskd_types::{Timestamp, now};

use crate::error::IngestError;
use crate::pipeline::IngestPipeline;

/// Identifier of one ingest job (UUID v7 for time-ordering).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(uuid::Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    pub fn parse(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s).ok().map(Self)
    }

    /// Short representation (first 8 characters of UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobId({})", self.short_id())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a job ended in [`JobState::Failed`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobFailure {
    InvalidRow { line: u64, reason: String },
    Source { reason: String },
    Store { reason: String },
}

impl From<&IngestError> for JobFailure {
    fn from(err: &IngestError) -> Self {
        match err {
            IngestError::InvalidRow { line, source } => Self::InvalidRow {
                line: *line,
                reason: source.to_string(),
            },
            IngestError::Source(e) => Self::Source {
                reason: e.to_string(),
            },
            IngestError::Store(e) => Self::Store {
                reason: e.to_string(),
            },
        }
    }
}

/// Lifecycle of one ingest job.
///
/// `Started → Reading* → Completed | Failed`. Terminal states never change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Started,
    Reading { rows_inserted: u64 },
    Completed { rows_inserted: u64 },
    Failed { rows_inserted: u64, failure: JobFailure },
}

impl JobState {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }

    pub fn rows_inserted(&self) -> u64 {
        match self {
            Self::Started => 0,
            Self::Reading { rows_inserted }
            | Self::Completed { rows_inserted }
            | Self::Failed { rows_inserted, .. } => *rows_inserted,
        }
    }
}

/// Observable status of an ingest job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub id: JobId,
    pub source: PathBuf,
    #[serde(flatten)]
    pub state: JobState,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

/// Finished jobs kept for status queries by default.
pub const DEFAULT_RETAINED_JOBS: usize = 256;

/// Registry of ingest jobs and their states.
///
/// Jobs can be submitted to run in the background ([`IngestJobs::submit`])
/// or run to completion inline ([`IngestJobs::run`]); both are recorded, so
/// the outcome of a background job can be queried later with
/// [`IngestJobs::status`]. Only the most recently finished jobs are kept;
/// running jobs are never evicted. Clones share the registry.
#[derive(Clone)]
pub struct IngestJobs {
    pipeline: IngestPipeline,
    jobs: Arc<RwLock<HashMap<JobId, JobStatus>>>,
    retained: usize,
}

impl IngestJobs {
    pub fn new(pipeline: IngestPipeline) -> Self {
        Self {
            pipeline,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            retained: DEFAULT_RETAINED_JOBS,
        }
    }

    /// Keep at most `retained` finished jobs (at least one).
    pub fn with_retention(mut self, retained: usize) -> Self {
        self.retained = retained.max(1);
        self
    }

    /// Accept a job reading `source` and run it on the tokio runtime.
    ///
    /// Returns as soon as the job is registered; rows may not be persisted
    /// yet. Must be called from within a tokio runtime.
    pub fn submit(&self, source: impl Into<PathBuf>) -> JobId {
        let source = source.into();
        let id = self.register(&source);
        let jobs = self.clone();
        tokio::spawn(async move {
            jobs.execute(id, source).await;
        });
        id
    }

    /// Run a job reading `source` to completion and return its final status.
    pub async fn run(&self, source: impl Into<PathBuf>) -> JobStatus {
        let source = source.into();
        let id = self.register(&source);
        self.execute(id, source).await;
        self.status(&id).expect("job registered before execution")
    }

    pub fn status(&self, id: &JobId) -> Option<JobStatus> {
        self.jobs.read().expect("lock poisoned").get(id).cloned()
    }

    /// All known jobs, oldest first.
    pub fn list(&self) -> Vec<JobStatus> {
        let mut jobs: Vec<JobStatus> = self
            .jobs
            .read()
            .expect("lock poisoned")
            .values()
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.id);
        jobs
    }

    fn register(&self, source: &Path) -> JobId {
        let id = JobId::new();
        let status = JobStatus {
            id,
            source: source.to_path_buf(),
            state: JobState::Started,
            started_at: now(),
            finished_at: None,
        };
        self.jobs.write().expect("lock poisoned").insert(id, status);
        info!(job = %id, source = %source.display(), "ingest job started");
        id
    }

    fn set_state(&self, id: &JobId, state: JobState) {
        let mut jobs = self.jobs.write().expect("lock poisoned");
        let finished = state.is_finished();
        if let Some(job) = jobs.get_mut(id) {
            if finished {
                job.finished_at = Some(now());
            }
            job.state = state;
        }
        if finished {
            evict_finished(&mut jobs, id, self.retained);
        }
    }

    async fn execute(&self, id: JobId, source: PathBuf) {
        let file = match tokio::fs::File::open(&source).await {
            Ok(file) => file,
            Err(e) => {
                self.fail(id, 0, &IngestError::Source(e));
                return;
            }
        };

        self.set_state(&id, JobState::Reading { rows_inserted: 0 });
        let mut inserted = 0;
        let result = self
            .pipeline
            .run(file, |rows_inserted| {
                inserted = rows_inserted;
                self.set_state(&id, JobState::Reading { rows_inserted });
            })
            .await;

        match result {
            Ok(report) => {
                info!(
                    job = %id,
                    rows_inserted = report.rows_inserted,
                    lines_read = report.lines_read,
                    "ingest job completed"
                );
                self.set_state(
                    &id,
                    JobState::Completed {
                        rows_inserted: report.rows_inserted,
                    },
                );
            }
            Err(e) => self.fail(id, inserted, &e),
        }
    }

    fn fail(&self, id: JobId, rows_inserted: u64, err: &IngestError) {
        warn!(job = %id, rows_inserted, error = %err, "ingest job failed");
        self.set_state(
            &id,
            JobState::Failed {
                rows_inserted,
                failure: err.into(),
            },
        );
    }
}

/// Drop the oldest finished jobs beyond `retained`, never `keep`.
fn evict_finished(jobs: &mut HashMap<JobId, JobStatus>, keep: &JobId, retained: usize) {
    let mut finished: Vec<(Option<Timestamp>, JobId)> = jobs
        .values()
        .filter(|job| job.state.is_finished() && job.id != *keep)
        .map(|job| (job.finished_at, job.id))
        .collect();
    let others = retained.saturating_sub(1);
    if finished.len() <= others {
        return;
    }
    finished.sort_unstable();
    let excess = finished.len() - others;
    for (_, id) in &finished[..excess] {
        jobs.remove(id);
    }
    debug!(evicted = excess, retained, "finished ingest jobs evicted");
}

impl fmt::Debug for IngestJobs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.jobs.read().expect("lock poisoned").len();
        f.debug_struct("IngestJobs")
            .field("pipeline", &self.pipeline)
            .field("jobs", &count)
            .field("retained", &self.retained)
            .finish()
    }
}
