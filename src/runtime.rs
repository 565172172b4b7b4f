/// Async driver for the orchestrator.
///
/// One task owns the `Orchestrator` and handles events strictly one at a
/// time: import commands, file-read completions, metadata completions,
/// delivered results and edits. File reads, folder scans and metadata
/// extraction run elsewhere and report back through the same queue.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::Settings;
use crate::error::{ChannelError, EditError, ImportError, MetadataError};
use crate::import::loader::{self, SourceFile};
use crate::import::metadata::{ImageMetadata, MetadataExtractor};
use crate::jobs::{JobChannel, ResultDescriptor};
use crate::orchestrator::{EditOutcome, Orchestrator};
use crate::state::{Edit, Records};

enum Event {
    Import(Vec<PathBuf>),
    ImportFolder(PathBuf),
    SourceRead {
        index: usize,
        result: Result<SourceFile, ImportError>,
    },
    MetadataRead {
        index: usize,
        result: Result<ImageMetadata, MetadataError>,
    },
    Delivered(ResultDescriptor),
    Edit {
        index: usize,
        edit: Edit,
        reply: oneshot::Sender<Result<EditOutcome, EditError>>,
    },
    Shutdown,
}

/// Cheap, cloneable access to a running orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    events: mpsc::UnboundedSender<Event>,
    records: watch::Receiver<Records>,
    pending: watch::Receiver<usize>,
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::Import(paths) => write!(f, "Import({} files)", paths.len()),
            Event::ImportFolder(path) => write!(f, "ImportFolder({})", path.display()),
            Event::SourceRead { index, .. } => write!(f, "SourceRead({index})"),
            Event::MetadataRead { index, .. } => write!(f, "MetadataRead({index})"),
            Event::Delivered(result) => write!(f, "Delivered({}, {})", result.target_index, result.kind),
            Event::Edit { index, .. } => write!(f, "Edit({index})"),
            Event::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Start the orchestrator task. The channel's result handler is registered
/// here, so the channel must not have one yet.
pub fn spawn<E: MetadataExtractor>(
    channel: JobChannel,
    extractor: E,
    settings: Settings,
) -> Result<(OrchestratorHandle, JoinHandle<()>), ChannelError> {
    let (events, queue) = mpsc::unbounded_channel();

    let delivered = events.clone();
    channel.on_result(move |result| {
        if delivered.send(Event::Delivered(result)).is_err() {
            tracing::debug!("orchestrator stopped, result dropped");
        }
    })?;

    let orchestrator = Orchestrator::new(channel, settings);
    let handle = OrchestratorHandle {
        events: events.clone(),
        records: orchestrator.library().subscribe(),
        pending: orchestrator.pending().subscribe(),
    };

    let task = tokio::spawn(run(orchestrator, Arc::new(extractor), events, queue));
    Ok((handle, task))
}

async fn run<E: MetadataExtractor>(
    mut orchestrator: Orchestrator<JobChannel>,
    extractor: Arc<E>,
    events: mpsc::UnboundedSender<Event>,
    mut queue: mpsc::UnboundedReceiver<Event>,
) {
    tracing::info!("🎨 orchestrator running");

    while let Some(event) = queue.recv().await {
        tracing::trace!(?event, "event");
        match event {
            Event::Import(paths) => {
                let names = paths.iter().map(|path| loader::display_name(path));
                let indices = orchestrator.begin_import(names);
                for (index, path) in indices.zip(paths) {
                    let events = events.clone();
                    tokio::spawn(async move {
                        let result = loader::read_source(&path).await;
                        let _ = events.send(Event::SourceRead { index, result });
                    });
                }
            }
            Event::ImportFolder(folder) => {
                let events = events.clone();
                tokio::spawn(async move {
                    let scan = tokio::task::spawn_blocking(move || loader::collect_image_files(&folder)).await;
                    match scan {
                        Ok(Ok(paths)) if !paths.is_empty() => {
                            let _ = events.send(Event::Import(paths));
                        }
                        Ok(Ok(_)) => tracing::info!("no images found in folder"),
                        Ok(Err(err)) => tracing::warn!(error = %err, "folder import failed"),
                        Err(join) => tracing::error!(error = %join, "folder scan panicked"),
                    }
                });
            }
            Event::SourceRead { index, result } => match result {
                Ok(file) => {
                    orchestrator.source_loaded(index, file.source);
                    let extractor = Arc::clone(&extractor);
                    let events = events.clone();
                    tokio::spawn(async move {
                        let bytes = file.bytes;
                        let result = tokio::task::spawn_blocking(move || extractor.extract(&bytes))
                            .await
                            .unwrap_or_else(|join| Err(MetadataError::Aborted(join.to_string())));
                        let _ = events.send(Event::MetadataRead { index, result });
                    });
                }
                Err(err) => orchestrator.source_failed(index, &err),
            },
            Event::MetadataRead { index, result } => {
                orchestrator.metadata_extracted(index, result);
            }
            Event::Delivered(result) => {
                orchestrator.reconcile(result);
            }
            Event::Edit { index, edit, reply } => {
                let _ = reply.send(orchestrator.edit(index, edit));
            }
            Event::Shutdown => break,
        }
    }

    tracing::info!("orchestrator stopped");
}

impl OrchestratorHandle {
    /// Import files in the given order
    pub fn import(&self, paths: Vec<PathBuf>) {
        if paths.is_empty() {
            return;
        }
        self.post(Event::Import(paths));
    }

    /// Import every image under a folder
    pub fn import_folder(&self, folder: PathBuf) {
        self.post(Event::ImportFolder(folder));
    }

    /// Submit an edit; resolves once it has been accepted or rejected
    /// (not when its job completes)
    pub async fn edit(&self, index: usize, edit: Edit) -> Result<EditOutcome, EditError> {
        let (reply, outcome) = oneshot::channel();
        self.events
            .send(Event::Edit { index, edit, reply })
            .map_err(|_| EditError::Stopped)?;
        outcome.await.map_err(|_| EditError::Stopped)?
    }

    /// Snapshots of the library, updated on every append and merge
    pub fn records(&self) -> watch::Receiver<Records> {
        self.records.clone()
    }

    /// Outstanding-job count; busy while it is above zero
    pub fn pending(&self) -> watch::Receiver<usize> {
        self.pending.clone()
    }

    pub fn is_busy(&self) -> bool {
        *self.pending.borrow() > 0
    }

    /// Stop the orchestrator task after the events already queued
    pub fn shutdown(&self) {
        self.post(Event::Shutdown);
    }

    fn post(&self, event: Event) {
        if self.events.send(event).is_err() {
            tracing::warn!("orchestrator is not running");
        }
    }
}
