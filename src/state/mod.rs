/// State management module
///
/// This module handles all image state, including:
/// - The in-memory record library (library.rs)
/// - Per-image records and their derived artifacts (data.rs)
/// - Editable job parameters and their validation (edit.rs)

pub mod library;
pub mod data;
pub mod edit;

pub use data::{EdgeResult, ImageRecord, JobOutput, QrLocationResult, QrTextResult, RecordPatch};
pub use edit::{Coordinates, Edit, Location, Thresholds};
pub use library::{Library, Records};
