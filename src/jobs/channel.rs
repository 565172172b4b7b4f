/// Job channel: the only path between the orchestrator and the computation unit.
///
/// One outbound queue, one inbound queue, nothing shared. Requests queue up
/// in send order while the unit warms up. Replies are matched to records by
/// `(idx, action)`, never by arrival order.
///
/// Every request sent produces exactly one reply. Transcoding failures,
/// warm-up failures, compute errors, panics and timeouts all come back as
/// error replies, so the pending-job counter always settles.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

use super::descriptor::{JobDescriptor, ResultDescriptor};
use super::wire::{Action, WorkerReply, WorkerRequest};
use crate::compute::ComputeUnit;
use crate::error::ChannelError;

/// Where the orchestrator sends jobs
pub trait JobSink {
    /// Fire-and-forget; the reply arrives through the result handler
    fn send(&self, job: JobDescriptor);
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelOptions {
    /// Jobs computed at the same time
    pub max_concurrent_jobs: usize,
    /// Jobs running longer than this get a synthetic error reply
    pub job_timeout: Option<Duration>,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            job_timeout: None,
        }
    }
}

pub struct JobChannel {
    outbound: mpsc::UnboundedSender<WorkerRequest>,
    replies: mpsc::UnboundedSender<WorkerReply>,
    inbound: Mutex<Option<mpsc::UnboundedReceiver<WorkerReply>>>,
    worker: JoinHandle<()>,
}

impl JobChannel {
    /// Spawn the worker task. Must be called from within a tokio runtime,
    /// once per process.
    pub fn start<U: ComputeUnit>(unit: U, options: ChannelOptions) -> Self {
        let (outbound, requests) = mpsc::unbounded_channel();
        let (replies, inbound) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(Arc::new(unit), requests, replies.clone(), options));

        JobChannel {
            outbound,
            replies,
            inbound: Mutex::new(Some(inbound)),
            worker,
        }
    }

    /// Register the single result handler. Results that arrived earlier
    /// are delivered first, in the order the unit emitted them.
    pub fn on_result<F>(&self, mut handler: F) -> Result<JoinHandle<()>, ChannelError>
    where
        F: FnMut(ResultDescriptor) + Send + 'static,
    {
        let mut inbound = self
            .inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(ChannelError::HandlerAlreadyRegistered)?;

        Ok(tokio::spawn(async move {
            while let Some(reply) = inbound.recv().await {
                match reply.into_result() {
                    Some(result) => handler(result),
                    None => tracing::debug!("dropping reply with unknown action"),
                }
            }
        }))
    }

    fn reply(&self, reply: WorkerReply) {
        if self.replies.send(reply).is_err() {
            tracing::debug!("result handler is gone, reply dropped");
        }
    }
}

impl JobSink for JobChannel {
    fn send(&self, job: JobDescriptor) {
        let action = Action::for_kind(job.kind());
        let idx = job.target_index;

        let request = match WorkerRequest::encode(&job) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(idx, kind = %job.kind(), error = %err, "could not encode job payload");
                self.reply(WorkerReply::failed(action, idx, err.to_string()));
                return;
            }
        };

        tracing::debug!(idx, kind = %job.kind(), "job sent");
        if let Err(mpsc::error::SendError(request)) = self.outbound.send(request) {
            tracing::warn!(idx, "computation unit has stopped");
            self.reply(request.reply().with_error("computation unit has stopped"));
        }
    }
}

impl Drop for JobChannel {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

impl std::fmt::Debug for JobChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobChannel")
            .field("worker_finished", &self.worker.is_finished())
            .finish()
    }
}

async fn run_worker<U: ComputeUnit>(
    unit: Arc<U>,
    mut requests: mpsc::UnboundedReceiver<WorkerRequest>,
    replies: mpsc::UnboundedSender<WorkerReply>,
    options: ChannelOptions,
) {
    // Requests sent meanwhile wait in the queue, in order
    let warm_up = {
        let unit = Arc::clone(&unit);
        tokio::task::spawn_blocking(move || unit.warm_up()).await
    };
    let ready: Result<(), String> = match warm_up {
        Ok(Ok(())) => {
            tracing::info!("⚙️  computation unit ready");
            Ok(())
        }
        Ok(Err(err)) => Err(err.to_string()),
        Err(join) => Err(format!("warm-up panicked: {join}")),
    };
    if let Err(message) = &ready {
        tracing::error!(error = %message, "computation unit failed to start, all jobs will fail");
    }

    let permits = Arc::new(Semaphore::new(options.max_concurrent_jobs.max(1)));

    while let Some(request) = requests.recv().await {
        if request.action == Action::Unknown {
            tracing::debug!(idx = request.idx, "ignoring request with unknown action");
            continue;
        }

        let reply = request.reply();
        if let Err(message) = &ready {
            let _ = replies.send(reply.with_error(message.clone()));
            continue;
        }

        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            let _ = replies.send(reply.with_error("worker pool closed"));
            continue;
        };

        let unit = Arc::clone(&unit);
        let replies = replies.clone();
        let timeout = options.job_timeout;
        tokio::spawn(async move {
            let idx = request.idx;
            // The permit lives as long as the computation, even past a timeout
            let work = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                unit.compute(&request)
            });

            let joined = match timeout {
                Some(limit) => match tokio::time::timeout(limit, work).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        tracing::warn!(idx, ?limit, "job timed out");
                        let _ = replies.send(reply.with_error(format!("timed out after {limit:?}")));
                        return;
                    }
                },
                None => work.await,
            };

            let reply = match joined {
                Ok(Ok(png)) => reply.with_rendering(png),
                Ok(Err(err)) => {
                    tracing::warn!(idx, error = %err, "job failed");
                    reply.with_error(err.to_string())
                }
                Err(join) => {
                    tracing::error!(idx, error = %join, "job panicked");
                    reply.with_error(format!("computation panicked: {join}"))
                }
            };
            let _ = replies.send(reply);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_uri::DataUri;
    use crate::error::ComputeError;
    use crate::jobs::descriptor::{JobKind, JobRequest};
    use crate::jobs::wire::Payload;
    use crate::state::{JobOutput, Thresholds};
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test unit driven by the request text: `fail`, `panic`, `sleep:<ms>`
    #[derive(Default)]
    struct ScriptedUnit {
        warm_up_delay: Duration,
        broken: bool,
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl ComputeUnit for ScriptedUnit {
        fn warm_up(&self) -> Result<(), ComputeError> {
            std::thread::sleep(self.warm_up_delay);
            if self.broken {
                return Err(ComputeError::WarmUp("no backend".into()));
            }
            Ok(())
        }

        fn compute(&self, request: &WorkerRequest) -> Result<Vec<u8>, ComputeError> {
            match &request.data {
                Payload::Bytes(bytes) => Ok(bytes.clone()),
                Payload::Text(text) => match text.as_str() {
                    "fail" => Err(ComputeError::Qr("too dense".into())),
                    "panic" => panic!("worker crashed"),
                    other => {
                        if let Some(ms) = other.strip_prefix("sleep:") {
                            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
                            self.peak.fetch_max(now, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(ms.parse().unwrap()));
                            self.running.fetch_sub(1, Ordering::SeqCst);
                        }
                        Ok(vec![request.idx as u8])
                    }
                },
            }
        }
    }

    fn text_job(idx: usize, text: &str) -> JobDescriptor {
        JobDescriptor::new(idx, JobRequest::QrText { text: text.into() })
    }

    fn collect(channel: &JobChannel) -> mpsc::UnboundedReceiver<ResultDescriptor> {
        let (tx, rx) = mpsc::unbounded_channel();
        channel
            .on_result(move |result| {
                let _ = tx.send(result);
            })
            .unwrap();
        rx
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<ResultDescriptor>) -> ResultDescriptor {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("result within 5s")
            .expect("channel open")
    }

    #[tokio::test]
    async fn test_sends_before_warm_up_are_buffered_in_order() {
        let unit = ScriptedUnit {
            warm_up_delay: Duration::from_millis(100),
            ..Default::default()
        };
        let options = ChannelOptions {
            max_concurrent_jobs: 1,
            job_timeout: None,
        };
        let channel = JobChannel::start(unit, options);
        for idx in 0..3 {
            channel.send(text_job(idx, "hello"));
        }

        let mut rx = collect(&channel);
        let mut order = Vec::new();
        for _ in 0..3 {
            let result = next(&mut rx).await;
            assert!(result.outcome.is_ok());
            order.push(result.target_index);
        }
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_results_arrive_out_of_order() {
        let channel = JobChannel::start(ScriptedUnit::default(), ChannelOptions::default());
        let mut rx = collect(&channel);

        channel.send(text_job(0, "sleep:300"));
        channel.send(text_job(1, "quick"));

        assert_eq!(next(&mut rx).await.target_index, 1);
        let slow = next(&mut rx).await;
        assert_eq!(slow.target_index, 0);
        assert_matches!(slow.outcome, Ok(JobOutput::QrText(r)) if r.text == "sleep:300");
    }

    #[tokio::test]
    async fn test_every_failure_still_replies() {
        let options = ChannelOptions {
            max_concurrent_jobs: 4,
            job_timeout: Some(Duration::from_millis(100)),
        };
        let channel = JobChannel::start(ScriptedUnit::default(), options);
        let mut rx = collect(&channel);

        channel.send(text_job(0, "fail"));
        channel.send(text_job(1, "panic"));
        channel.send(text_job(2, "sleep:1000"));
        channel.send(JobDescriptor::new(
            3,
            JobRequest::Edge {
                source: "data:image/png;base64,@@".parse().unwrap(),
                thresholds: Thresholds::default(),
                orientation: 1,
            },
        ));

        let mut failed = Vec::new();
        for _ in 0..4 {
            let result = next(&mut rx).await;
            assert!(result.outcome.is_err(), "{result:?}");
            failed.push((result.target_index, result.kind));
        }
        failed.sort_by_key(|(idx, _)| *idx);
        assert_eq!(
            failed,
            vec![
                (0, JobKind::QrText),
                (1, JobKind::QrText),
                (2, JobKind::QrText),
                (3, JobKind::Edge),
            ]
        );
    }

    #[tokio::test]
    async fn test_timed_out_job_keeps_its_slot() {
        let unit = ScriptedUnit::default();
        let peak = Arc::clone(&unit.peak);
        let options = ChannelOptions {
            max_concurrent_jobs: 1,
            job_timeout: Some(Duration::from_millis(50)),
        };
        let channel = JobChannel::start(unit, options);
        let mut rx = collect(&channel);

        channel.send(text_job(0, "sleep:300"));
        channel.send(text_job(1, "sleep:300"));

        for _ in 0..2 {
            let result = next(&mut rx).await;
            assert_matches!(result.outcome, Err(failure) if failure.message.contains("timed out"));
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_edge_payload_is_transcoded_both_ways() {
        let channel = JobChannel::start(ScriptedUnit::default(), ChannelOptions::default());
        let mut rx = collect(&channel);

        // the scripted unit echoes the bytes it received
        channel.send(JobDescriptor::new(
            0,
            JobRequest::Edge {
                source: DataUri::encode("image/jpeg", &[9, 8, 7]),
                thresholds: Thresholds::new(10.0, 20.0),
                orientation: 3,
            },
        ));

        let result = next(&mut rx).await;
        assert_matches!(result.outcome, Ok(JobOutput::Edge(edge)) => {
            assert_eq!(edge.rendering, DataUri::png(&[9, 8, 7]));
            assert_eq!(edge.thresholds, Thresholds::new(10.0, 20.0));
        });
    }

    #[tokio::test]
    async fn test_warm_up_failure_fails_each_job() {
        let unit = ScriptedUnit {
            broken: true,
            ..Default::default()
        };
        let channel = JobChannel::start(unit, ChannelOptions::default());
        let mut rx = collect(&channel);
        channel.send(text_job(5, "hello"));

        let result = next(&mut rx).await;
        assert_eq!(result.target_index, 5);
        assert_matches!(result.outcome, Err(failure) if failure.message.contains("no backend"));
    }

    #[tokio::test]
    async fn test_single_handler() {
        let channel = JobChannel::start(ScriptedUnit::default(), ChannelOptions::default());
        let _rx = collect(&channel);
        assert_eq!(
            channel.on_result(|_| {}).unwrap_err(),
            ChannelError::HandlerAlreadyRegistered
        );
    }
}
