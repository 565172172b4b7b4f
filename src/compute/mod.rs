/// Computation unit
///
/// The orchestrator never calls into this module directly. The job channel
/// hands each `WorkerRequest` to a `ComputeUnit` on the blocking pool and
/// turns whatever comes back into exactly one reply.
///
/// - `edge.rs` - Canny edge rendering
/// - `qr.rs` - QR code rendering

pub mod edge;
pub mod qr;

use crate::error::ComputeError;
use crate::jobs::wire::{Action, Payload, WorkerRequest};

/// Anything that turns a request into PNG bytes
pub trait ComputeUnit: Send + Sync + 'static {
    /// One-time initialisation, run before the first request is served
    fn warm_up(&self) -> Result<(), ComputeError> {
        Ok(())
    }

    /// Produce the rendering for one request (CPU-bound, may block)
    fn compute(&self, request: &WorkerRequest) -> Result<Vec<u8>, ComputeError>;
}

/// Default in-process unit backed by `image`, `imageproc` and `qrcode-generator`
#[derive(Debug, Clone)]
pub struct LeafUnit {
    /// Side length of rendered QR codes in pixels
    pub qr_size: usize,
}

impl LeafUnit {
    pub fn new(qr_size: usize) -> Self {
        Self { qr_size }
    }
}

impl Default for LeafUnit {
    fn default() -> Self {
        Self::new(qr::DEFAULT_QR_SIZE)
    }
}

impl ComputeUnit for LeafUnit {
    fn compute(&self, request: &WorkerRequest) -> Result<Vec<u8>, ComputeError> {
        match (request.action, &request.data) {
            (Action::Edge, Payload::Bytes(bytes)) => {
                let low = request
                    .params
                    .low_threshold
                    .ok_or(ComputeError::MissingField("low_threshold"))?;
                let high = request
                    .params
                    .high_threshold
                    .ok_or(ComputeError::MissingField("high_threshold"))?;
                let orientation = request.params.orientation.unwrap_or(1);
                edge::render_edges(bytes, low, high, orientation)
            }
            (Action::Gps | Action::Data, Payload::Text(text)) => qr::render_qr(text, self.qr_size),
            (Action::Edge, _) => Err(ComputeError::Payload("EDGE")),
            (Action::Gps, _) => Err(ComputeError::Payload("GPS")),
            (Action::Data, _) => Err(ComputeError::Payload("DATA")),
            (Action::Unknown, _) => Err(ComputeError::Payload("unknown action")),
        }
    }
}
