/// Herbarium: batch image import with edge-detection and QR artifacts
///
/// This crate handles:
/// - Importing images and reading their EXIF orientation/GPS (import)
/// - Keeping one record per imported image (state)
/// - Sending jobs to a computation unit and tracking outstanding work (jobs, compute)
/// - Reconciling results and user edits on a single control task (orchestrator, runtime)

pub mod compute;
pub mod config;
pub mod data_uri;
pub mod error;
pub mod import;
pub mod jobs;
pub mod orchestrator;
pub mod runtime;
pub mod state;

pub use config::Settings;
pub use data_uri::DataUri;
pub use orchestrator::{EditOutcome, Orchestrator, Reconciliation};
pub use runtime::{spawn, OrchestratorHandle};
