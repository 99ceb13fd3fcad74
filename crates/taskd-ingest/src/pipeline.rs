use std::io;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, warn};

use taskd_store::Store;

use crate::error::{IngestError, Result};
use crate::row::{DEFAULT_DELIMITER, is_open_record, parse_row};

/// Counters for a finished ingest run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Physical lines consumed, header and empty lines included.
    pub lines_read: u64,
    /// Records committed to the store.
    pub rows_inserted: u64,
}

/// Streams delimited text into a store collection.
///
/// Rows are read one line at a time, so memory use does not grow with the
/// size of the source, and the task yields whenever it waits for bytes.
/// A quoted field may span lines; its record continues until the quote
/// closes. The first line is a header and is skipped, as are empty lines.
/// Each remaining row is validated and inserted before the next one is
/// read.
///
/// The first invalid row stops the run. Rows inserted before it stay
/// committed: a run is at-most-partial, never transactional.
#[derive(Clone)]
pub struct IngestPipeline {
    store: Arc<Store>,
    collection: String,
    delimiter: char,
}

impl IngestPipeline {
    pub fn new(store: Arc<Store>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            delimiter: DEFAULT_DELIMITER,
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Ingest every row of `source`.
    ///
    /// `progress` is called with the running insert count after each
    /// committed row.
    pub async fn run<R, F>(&self, source: R, mut progress: F) -> Result<IngestReport>
    where
        R: AsyncRead + Unpin,
        F: FnMut(u64),
    {
        let mut lines = BufReader::new(source).lines();
        let mut report = IngestReport::default();
        // Start line and text of a record whose quoted field is still open.
        let mut pending: Option<(u64, String)> = None;

        while let Some(line) = lines.next_line().await? {
            report.lines_read += 1;
            if report.lines_read == 1 {
                continue;
            }

            let (start, record) = match pending.take() {
                Some((start, mut record)) => {
                    record.push('\n');
                    record.push_str(&line);
                    (start, record)
                }
                None if line.is_empty() => continue,
                None => (report.lines_read, line),
            };
            if is_open_record(&record, self.delimiter) {
                pending = Some((start, record));
                continue;
            }

            self.ingest_record(start, &record, &mut report).await?;
            progress(report.rows_inserted);
        }

        if let Some((start, record)) = pending {
            self.ingest_record(start, &record, &mut report).await?;
            progress(report.rows_inserted);
        }

        Ok(report)
    }

    async fn ingest_record(&self, line: u64, record: &str, report: &mut IngestReport) -> Result<()> {
        let draft = parse_row(record, self.delimiter).map_err(|source| {
            warn!(line, error = %source, "rejecting ingest row");
            IngestError::InvalidRow { line, source }
        })?;

        // Each insert writes and syncs the snapshot; keep it off the async workers.
        let store = Arc::clone(&self.store);
        let collection = self.collection.clone();
        let task = match tokio::task::spawn_blocking(move || store.insert(&collection, draft)).await {
            Ok(inserted) => inserted?,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => return Err(io::Error::new(io::ErrorKind::Interrupted, e).into()),
        };
        report.rows_inserted += 1;
        debug!(line, id = %task.id, "row ingested");
        Ok(())
    }
}

impl std::fmt::Debug for IngestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestPipeline")
            .field("collection", &self.collection)
            .field("delimiter", &self.delimiter)
            .finish()
    }
}
