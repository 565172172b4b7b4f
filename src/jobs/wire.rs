/// Message format at the computation-unit boundary.
///
/// Outbound: `{action, idx, data, low_threshold?, high_threshold?,
/// orientation?, latitude?, longitude?}`.
/// Inbound: `{action, idx, src?, data: <echoed parameters>, text?, link?, error?}`.
/// Renderings cross as raw PNG bytes; the channel owns the conversion to and
/// from data URIs.

use serde::{Deserialize, Serialize};

use super::descriptor::{JobDescriptor, JobFailure, JobKind, JobRequest, ResultDescriptor};
use crate::data_uri::DataUri;
use crate::error::TranscodeError;
use crate::state::{
    Coordinates, EdgeResult, JobOutput, Location, QrLocationResult, QrTextResult, Thresholds,
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    #[serde(rename = "EDGE")]
    Edge,
    #[serde(rename = "GPS")]
    Gps,
    #[serde(rename = "DATA")]
    Data,
    /// Anything else a peer might send; ignored by the worker
    #[serde(other)]
    Unknown,
}

impl Action {
    pub fn for_kind(kind: JobKind) -> Self {
        match kind {
            JobKind::Edge => Action::Edge,
            JobKind::QrLocation => Action::Gps,
            JobKind::QrText => Action::Data,
        }
    }

    pub fn kind(self) -> Option<JobKind> {
        match self {
            Action::Edge => Some(JobKind::Edge),
            Action::Gps => Some(JobKind::QrLocation),
            Action::Data => Some(JobKind::QrText),
            Action::Unknown => None,
        }
    }
}

/// Source image bytes for `EDGE`, text for `GPS` and `DATA`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Payload {
    Bytes(Vec<u8>),
    Text(String),
}

/// Job parameters, sent with the request and echoed in the reply
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WireParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_threshold: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_threshold: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkerRequest {
    pub action: Action,
    pub idx: usize,
    pub data: Payload,
    #[serde(flatten)]
    pub params: WireParams,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkerReply {
    pub action: Action,
    pub idx: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<Vec<u8>>,
    #[serde(default)]
    pub data: WireParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerRequest {
    /// Encode a job, decoding its data URI payload into bytes
    pub fn encode(job: &JobDescriptor) -> Result<Self, TranscodeError> {
        let idx = job.target_index;
        let request = match &job.request {
            JobRequest::Edge {
                source,
                thresholds,
                orientation,
            } => WorkerRequest {
                action: Action::Edge,
                idx,
                data: Payload::Bytes(source.decode()?),
                params: WireParams {
                    low_threshold: Some(thresholds.low),
                    high_threshold: Some(thresholds.high),
                    orientation: Some(*orientation),
                    ..WireParams::default()
                },
            },
            JobRequest::QrText { text } => WorkerRequest {
                action: Action::Data,
                idx,
                data: Payload::Text(text.clone()),
                params: WireParams::default(),
            },
            JobRequest::QrLocation { location } => WorkerRequest {
                action: Action::Gps,
                idx,
                data: Payload::Text(location.link.clone()),
                params: WireParams {
                    latitude: Some(location.coordinates.latitude),
                    longitude: Some(location.coordinates.longitude),
                    ..WireParams::default()
                },
            },
        };
        Ok(request)
    }

    /// Reply skeleton echoing this request's parameters
    pub fn reply(&self) -> WorkerReply {
        let text = match (&self.action, &self.data) {
            (Action::Data, Payload::Text(text)) => Some(text.clone()),
            _ => None,
        };
        let link = match (&self.action, &self.data) {
            (Action::Gps, Payload::Text(link)) => Some(link.clone()),
            _ => None,
        };
        WorkerReply {
            action: self.action,
            idx: self.idx,
            src: None,
            data: self.params.clone(),
            text,
            link,
            error: None,
        }
    }
}

impl WorkerReply {
    /// Error reply for a job that never reached the unit
    pub fn failed(action: Action, idx: usize, message: impl Into<String>) -> Self {
        WorkerReply {
            action,
            idx,
            src: None,
            data: WireParams::default(),
            text: None,
            link: None,
            error: Some(message.into()),
        }
    }

    pub fn with_rendering(mut self, png: Vec<u8>) -> Self {
        self.src = Some(png);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    /// Decode into a result, encoding the rendering as a data URI.
    /// Replies with an unknown action decode to nothing.
    pub fn into_result(self) -> Option<ResultDescriptor> {
        let kind = self.action.kind()?;
        let idx = self.idx;

        if let Some(error) = self.error {
            return Some(ResultDescriptor::failure(idx, kind, JobFailure::new(error)));
        }
        let Some(src) = self.src else {
            return Some(ResultDescriptor::failure(
                idx,
                kind,
                JobFailure::new("reply carried no rendering"),
            ));
        };
        let rendering = DataUri::png(&src);
        let echo = self.data;

        let output = match kind {
            JobKind::Edge => match (echo.low_threshold, echo.high_threshold) {
                (Some(low), Some(high)) => Some(JobOutput::Edge(EdgeResult {
                    rendering,
                    thresholds: Thresholds::new(low, high),
                })),
                _ => None,
            },
            JobKind::QrText => self.text.map(|text| {
                JobOutput::QrText(QrTextResult { rendering, text })
            }),
            JobKind::QrLocation => match (echo.latitude, echo.longitude, self.link) {
                (Some(latitude), Some(longitude), Some(link)) => {
                    Some(JobOutput::QrLocation(QrLocationResult {
                        rendering,
                        location: Location {
                            coordinates: Coordinates::new(latitude, longitude),
                            link,
                        },
                    }))
                }
                _ => None,
            },
        };

        Some(match output {
            Some(output) => ResultDescriptor::success(idx, output),
            None => ResultDescriptor::failure(
                idx,
                kind,
                JobFailure::new("reply is missing echoed parameters"),
            ),
        })
    }
}
