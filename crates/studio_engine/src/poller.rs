use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use tokio_util::sync::CancellationToken;

use crate::artifact::{ArtifactStore, LocalArtifact};
use crate::payload::VideoRequest;
use crate::progress::ProgressSink;
use crate::types::{JobProgress, RequestId, Stage, ToolError};

/// Opaque token for an in-flight remote operation.
///
/// Only ever replaced wholesale by a fresh status query; never edited locally.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobHandle {
    pub name: String,
    pub done: bool,
    pub result_uri: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedMedia {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    /// Fixed delay between status queries. No backoff is applied.
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
        }
    }
}

#[async_trait::async_trait]
pub trait OperationApi: Send + Sync {
    async fn submit(&self, request: &VideoRequest) -> Result<JobHandle, ToolError>;

    async fn refresh(&self, handle: &JobHandle) -> Result<JobHandle, ToolError>;

    async fn download(&self, uri: &str) -> Result<DownloadedMedia, ToolError>;
}

/// Turns submit-then-poll into a single "generate and wait" call.
pub struct JobPoller {
    api: Arc<dyn OperationApi>,
    store: ArtifactStore,
    settings: PollSettings,
}

impl JobPoller {
    pub fn new(api: Arc<dyn OperationApi>, store: ArtifactStore, settings: PollSettings) -> Self {
        Self {
            api,
            store,
            settings,
        }
    }

    /// Submits `request` and polls until the job is terminal.
    ///
    /// There is no iteration cap; the loop only ends on a terminal handle, an
    /// error, or `cancel`. A cancelled job never downloads or materializes.
    pub async fn run_job(
        &self,
        request_id: RequestId,
        request: &VideoRequest,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Result<LocalArtifact, ToolError> {
        sink.progress(JobProgress::stage(request_id, Stage::Submitting));
        let mut handle = until_cancelled(cancel, self.api.submit(request)).await?;
        engine_info!("Job {} submitted as {}", request_id, handle.name);

        let mut polls: u32 = 0;
        while !handle.done {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ToolError::cancelled()),
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
            handle = until_cancelled(cancel, self.api.refresh(&handle)).await?;
            polls += 1;
            engine_debug!(
                "Job {} poll {} done={}",
                request_id,
                polls,
                handle.done
            );
            sink.progress(JobProgress {
                polls: Some(polls),
                ..JobProgress::stage(request_id, Stage::Polling)
            });
        }

        if let Some(message) = handle.error {
            engine_warn!("Job {} ended in error: {}", request_id, message);
            return Err(ToolError::job_failed(message));
        }
        let uri = handle
            .result_uri
            .ok_or_else(|| ToolError::job_failed("job finished without a result reference"))?;

        sink.progress(JobProgress::stage(request_id, Stage::Downloading));
        let media = until_cancelled(cancel, self.api.download(&uri)).await?;
        let artifact = self.store.materialize(&media.bytes, &media.mime_type)?;
        sink.progress(JobProgress::stage(request_id, Stage::Done));
        Ok(artifact)
    }
}

/// Races `future` against `cancel`; cancellation wins ties.
pub(crate) async fn until_cancelled<T>(
    cancel: &CancellationToken,
    future: impl Future<Output = Result<T, ToolError>>,
) -> Result<T, ToolError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ToolError::cancelled()),
        result = future => result,
    }
}
