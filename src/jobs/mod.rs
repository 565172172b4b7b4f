/// Jobs: what gets computed, how it travels, and how much is still out.
///
/// - `counter.rs` - outstanding-job counter behind the busy flag
/// - `descriptor.rs` - typed jobs and results
/// - `wire.rs` - message format at the computation-unit boundary
/// - `channel.rs` - the asynchronous channel to the computation unit

pub mod channel;
pub mod counter;
pub mod descriptor;
pub mod wire;

pub use channel::{ChannelOptions, JobChannel, JobSink};
pub use counter::PendingCounter;
pub use descriptor::{JobDescriptor, JobFailure, JobKind, JobRequest, ResultDescriptor};
