/// Per-image records and the results merged into them
///
/// A record is created as a placeholder when a file is selected, gains its
/// source once the read completes, and gains derived artifacts as jobs
/// complete. Each artifact carries the parameters that produced it; the
/// two are only ever replaced together.

use super::edit::{Location, Thresholds};
use crate::data_uri::DataUri;

/// Orientation assumed when the EXIF tag is absent (upright)
pub const DEFAULT_ORIENTATION: u16 = 1;

/// Edge rendering and the thresholds that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeResult {
    pub rendering: DataUri,
    pub thresholds: Thresholds,
}

/// QR rendering of free text
#[derive(Debug, Clone, PartialEq)]
pub struct QrTextResult {
    pub rendering: DataUri,
    pub text: String,
}

/// QR rendering of a location link
#[derive(Debug, Clone, PartialEq)]
pub struct QrLocationResult {
    pub rendering: DataUri,
    pub location: Location,
}

/// One successful job result, tagged by what it renders
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutput {
    Edge(EdgeResult),
    QrText(QrTextResult),
    QrLocation(QrLocationResult),
}

/// Partial update applied to exactly one record
#[derive(Debug, Clone, PartialEq)]
pub enum RecordPatch {
    /// Source bytes finished loading; ignored once a source is set
    Source(DataUri),
    /// EXIF orientation tag
    Orientation(u16),
    /// A job result replacing the matching artifact
    Output(JobOutput),
}

/// Represents a single imported image
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    /// Position in the store, assigned at append time
    pub index: usize,
    /// Original file name
    pub name: String,
    /// Original bytes as a displayable data URI (None while loading)
    pub raw_source: Option<DataUri>,
    /// EXIF orientation, passed to edge jobs
    pub orientation: u16,
    pub edge: Option<EdgeResult>,
    pub qr_text: Option<QrTextResult>,
    pub qr_location: Option<QrLocationResult>,
}

impl ImageRecord {
    /// Placeholder record with every optional field absent
    pub fn placeholder(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            raw_source: None,
            orientation: DEFAULT_ORIENTATION,
            edge: None,
            qr_text: None,
            qr_location: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.raw_source.is_some()
    }

    /// Thresholds of the current edge rendering, if any
    pub fn thresholds(&self) -> Option<Thresholds> {
        self.edge.as_ref().map(|edge| edge.thresholds)
    }

    /// Apply one patch. Returns false when the patch was ignored.
    pub fn merge(&mut self, patch: RecordPatch) -> bool {
        match patch {
            RecordPatch::Source(source) => {
                if self.raw_source.is_some() {
                    return false;
                }
                self.raw_source = Some(source);
            }
            RecordPatch::Orientation(orientation) => self.orientation = orientation,
            RecordPatch::Output(JobOutput::Edge(result)) => self.edge = Some(result),
            RecordPatch::Output(JobOutput::QrText(result)) => self.qr_text = Some(result),
            RecordPatch::Output(JobOutput::QrLocation(result)) => self.qr_location = Some(result),
        }
        true
    }
}
