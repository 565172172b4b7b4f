/// Single-threaded control core.
///
/// Owns the library, the pending-job counter and the job sink. Every code
/// path that sends a job increments the counter first; every delivered
/// result decrements it exactly once, whether it merged, failed or found no
/// record. Results are routed by `(target_index, kind)` only.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use crate::config::Settings;
use crate::data_uri::DataUri;
use crate::error::{EditError, ImportError, MetadataError};
use crate::import::initial_jobs;
use crate::import::metadata::ImageMetadata;
use crate::jobs::{JobDescriptor, JobKind, JobRequest, JobSink, PendingCounter, ResultDescriptor};
use crate::state::edit::{map_link, validate_qr_text};
use crate::state::{Edit, Library, Location, RecordPatch};

/// What happened to a delivered result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Merged into its record
    Applied,
    /// The unit reported an error; the artifact stays as it was
    Failed,
    /// No record at the target index
    Orphaned,
}

/// What an accepted edit did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// A job was sent; the result will replace the artifact
    Dispatched,
    /// Parameters match the current artifact, nothing sent
    Unchanged,
}

pub struct Orchestrator<S> {
    library: Library,
    pending: PendingCounter,
    sink: S,
    settings: Settings,
    /// Jobs sent but not yet answered, per record and kind
    in_flight: HashMap<(usize, JobKind), usize>,
    /// Records whose initial jobs have gone out; edits wait for this
    ready: HashSet<usize>,
}

impl<S: JobSink> Orchestrator<S> {
    pub fn new(sink: S, settings: Settings) -> Self {
        Self {
            library: Library::new(),
            pending: PendingCounter::new(),
            sink,
            settings,
            in_flight: HashMap::new(),
            ready: HashSet::new(),
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn pending(&self) -> &PendingCounter {
        &self.pending
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_busy()
    }

    /// Append one placeholder per selected file, in selection order
    pub fn begin_import<I, N>(&mut self, names: I) -> Range<usize>
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let indices = self.library.append(names);
        tracing::info!(count = indices.len(), first = indices.start, "📥 importing images");
        indices
    }

    /// File bytes are in; the record becomes displayable
    pub fn source_loaded(&mut self, index: usize, source: DataUri) {
        match self.library.merge_at(index, RecordPatch::Source(source)) {
            Ok(true) => tracing::debug!(index, "source loaded"),
            Ok(false) => tracing::warn!(index, "source already set, ignoring reload"),
            Err(err) => tracing::warn!(index, error = %err, "source for unknown record"),
        }
    }

    /// The file could not be read; the record stays a placeholder
    pub fn source_failed(&mut self, index: usize, err: &ImportError) {
        tracing::warn!(index, error = %err, "could not read image, no jobs will run for it");
    }

    /// Metadata is in (or unavailable): send the initial jobs.
    /// Returns how many were sent.
    pub fn metadata_extracted(
        &mut self,
        index: usize,
        metadata: Result<ImageMetadata, MetadataError>,
    ) -> usize {
        let metadata = metadata.unwrap_or_else(|err| {
            tracing::debug!(index, error = %err, "no metadata, using defaults");
            ImageMetadata::default()
        });

        if let Some(orientation) = metadata.orientation {
            let _ = self.library.merge_at(index, RecordPatch::Orientation(orientation));
        }

        let Some(record) = self.library.get(index) else {
            tracing::warn!(index, "metadata for unknown record");
            return 0;
        };
        if !self.ready.insert(index) {
            tracing::warn!(index, "metadata already processed, ignoring");
            return 0;
        }
        self.dispatch(initial_jobs(&record, &metadata, &self.settings))
    }

    /// Count the jobs as outstanding, then send them
    pub fn dispatch(&mut self, jobs: Vec<JobDescriptor>) -> usize {
        let count = jobs.len();
        self.pending.increment(count);
        for job in jobs {
            *self.in_flight.entry((job.target_index, job.kind())).or_default() += 1;
            self.sink.send(job);
        }
        count
    }

    /// Merge a delivered result into its record and settle its count
    pub fn reconcile(&mut self, result: ResultDescriptor) -> Reconciliation {
        let index = result.target_index;
        let kind = result.kind;
        if let Some(count) = self.in_flight.get_mut(&(index, kind)) {
            *count -= 1;
            if *count == 0 {
                self.in_flight.remove(&(index, kind));
            }
        }

        let outcome = match result.outcome {
            Ok(output) => match self.library.merge_at(index, RecordPatch::Output(output)) {
                Ok(_) => {
                    tracing::debug!(index, %kind, "result merged");
                    Reconciliation::Applied
                }
                Err(_) => {
                    tracing::warn!(index, %kind, "result for unknown record dropped");
                    Reconciliation::Orphaned
                }
            },
            Err(failure) => {
                tracing::warn!(index, %kind, error = %failure, "job failed, artifact left as is");
                Reconciliation::Failed
            }
        };

        self.pending.decrement(1);
        if !self.pending.is_busy() {
            tracing::info!("✅ all jobs settled");
        }
        outcome
    }

    /// Validate a user edit and send the job for it.
    /// Rejected edits never touch the counter.
    pub fn edit(&mut self, index: usize, edit: Edit) -> Result<EditOutcome, EditError> {
        let record = self
            .library
            .get(index)
            .ok_or(EditError::UnknownRecord(index))?;
        let Some(source) = record.raw_source.clone().filter(|_| self.ready.contains(&index)) else {
            return Err(EditError::SourceNotReady(index));
        };

        let request = match edit {
            Edit::Thresholds(thresholds) => {
                thresholds.validate(self.settings.threshold_max)?;
                if self.settled(index, JobKind::Edge) && record.thresholds() == Some(thresholds) {
                    return Ok(EditOutcome::Unchanged);
                }
                JobRequest::Edge {
                    source,
                    thresholds,
                    orientation: record.orientation,
                }
            }
            Edit::QrText(text) => {
                validate_qr_text(&text)?;
                if self.settled(index, JobKind::QrText)
                    && record.qr_text.as_ref().is_some_and(|current| current.text == text)
                {
                    return Ok(EditOutcome::Unchanged);
                }
                JobRequest::QrText { text }
            }
            Edit::Location { coordinates, link } => {
                coordinates.validate()?;
                let link = link
                    .filter(|link| !link.trim().is_empty())
                    .unwrap_or_else(|| map_link(&self.settings.map_link_base, coordinates));
                validate_qr_text(&link)?;

                let location = Location { coordinates, link };
                let current = record.qr_location.as_ref().map(|result| &result.location);
                if self.settled(index, JobKind::QrLocation) && current == Some(&location) {
                    return Ok(EditOutcome::Unchanged);
                }
                JobRequest::QrLocation { location }
            }
        };

        tracing::info!(index, kind = %request.kind(), "✏️  edit accepted");
        self.dispatch(vec![JobDescriptor::new(index, request)]);
        Ok(EditOutcome::Dispatched)
    }

    /// No job of `kind` is outstanding for the record, so its artifact
    /// reflects the last parameters sent
    fn settled(&self, index: usize, kind: JobKind) -> bool {
        !self.in_flight.contains_key(&(index, kind))
    }
}

impl<S> std::fmt::Debug for Orchestrator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("library", &self.library)
            .field("pending", &self.pending.count())
            .finish()
    }
}
