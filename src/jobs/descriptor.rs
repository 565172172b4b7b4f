/// Typed jobs and results exchanged with the job channel.

use std::fmt;

use crate::data_uri::DataUri;
use crate::state::{JobOutput, Location, Thresholds};

/// Which artifact a job produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Edge,
    QrText,
    QrLocation,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobKind::Edge => "edge",
            JobKind::QrText => "qr-text",
            JobKind::QrLocation => "qr-location",
        })
    }
}

/// Job payload and parameters
#[derive(Debug, Clone, PartialEq)]
pub enum JobRequest {
    Edge {
        source: DataUri,
        thresholds: Thresholds,
        orientation: u16,
    },
    QrText {
        text: String,
    },
    QrLocation {
        location: Location,
    },
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::Edge { .. } => JobKind::Edge,
            JobRequest::QrText { .. } => JobKind::QrText,
            JobRequest::QrLocation { .. } => JobKind::QrLocation,
        }
    }
}

/// One unit of requested computation targeting one record
#[derive(Debug, Clone, PartialEq)]
pub struct JobDescriptor {
    pub target_index: usize,
    pub request: JobRequest,
}

impl JobDescriptor {
    pub fn new(target_index: usize, request: JobRequest) -> Self {
        Self {
            target_index,
            request,
        }
    }

    pub fn kind(&self) -> JobKind {
        self.request.kind()
    }
}

/// Why a job produced no rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub message: String,
}

impl JobFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// The single reply to a job. Carries the parameters that produced the
/// rendering, so it can be merged without knowing the send order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultDescriptor {
    pub target_index: usize,
    pub kind: JobKind,
    pub outcome: Result<JobOutput, JobFailure>,
}

impl ResultDescriptor {
    pub fn success(target_index: usize, output: JobOutput) -> Self {
        let kind = match &output {
            JobOutput::Edge(_) => JobKind::Edge,
            JobOutput::QrText(_) => JobKind::QrText,
            JobOutput::QrLocation(_) => JobKind::QrLocation,
        };
        Self {
            target_index,
            kind,
            outcome: Ok(output),
        }
    }

    pub fn failure(target_index: usize, kind: JobKind, failure: JobFailure) -> Self {
        Self {
            target_index,
            kind,
            outcome: Err(failure),
        }
    }
}
