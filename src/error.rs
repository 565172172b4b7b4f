/// Error types shared across the crate.
///
/// Nothing in here is fatal to the process. Every failure ends up as
/// "this artifact stays unpopulated" or as a rejected edit.

use std::path::PathBuf;

/// Reading a user-selected file failed.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to scan folder {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Metadata could not be extracted from the raw bytes.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("no readable EXIF block: {0}")]
    Exif(#[from] exif::Error),

    #[error("metadata extraction did not complete: {0}")]
    Aborted(String),
}

/// A data URI could not be decoded into bytes.
#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("not a data URI")]
    MissingScheme,

    #[error("data URI is not base64 encoded")]
    NotBase64,

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// The computation unit failed to produce a rendering.
#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    #[error("failed to decode source image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("failed to render QR code: {0}")]
    Qr(String),

    #[error("request is missing {0}")]
    MissingField(&'static str),

    #[error("payload has the wrong shape for {0}")]
    Payload(&'static str),

    #[error("computation unit failed to initialise: {0}")]
    WarmUp(String),
}

/// Misuse of the job channel.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("a result handler is already registered")]
    HandlerAlreadyRegistered,
}

/// User-entered parameters outside the accepted range.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("thresholds must satisfy 0 < low < high <= {max} (got low={low}, high={high})")]
    Thresholds { low: f32, high: f32, max: f32 },

    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),

    #[error("QR text must not be empty")]
    EmptyText,

    #[error("QR text is {0} bytes, more than a QR symbol can hold")]
    TextTooLong(usize),
}

/// A user edit was rejected before any job was sent.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum EditError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("no image record at index {0}")]
    UnknownRecord(usize),

    #[error("image {0} has not finished loading")]
    SourceNotReady(usize),

    #[error("orchestrator is no longer running")]
    Stopped,
}

/// A targeted store update missed.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no image record at index {0}")]
    NotFound(usize),
}

/// Loading or validating settings failed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}
