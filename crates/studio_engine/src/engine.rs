use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use tokio_util::sync::CancellationToken;

use crate::artifact::ArtifactStore;
use crate::batch::BatchSequencer;
use crate::client::{GeminiClient, GenerationApi};
use crate::config::EngineConfig;
use crate::payload::ImageRequest;
use crate::poller::{until_cancelled, JobPoller, OperationApi};
use crate::progress::{ChannelProgressSink, ProgressSink};
use crate::tools::{styled_prompt, Toolbox};
use crate::types::{EngineEvent, JobProgress, RequestId, Stage, ToolError, ToolJob, ToolOutput};
use crate::youtube::YouTubeClient;

/// Everything a job needs, constructed once at start-up and shared by reference.
#[derive(Clone)]
pub struct StudioContext {
    pub config: EngineConfig,
    pub generation: Arc<dyn GenerationApi>,
    pub operations: Arc<dyn OperationApi>,
    pub youtube: Option<Arc<YouTubeClient>>,
    pub artifacts: ArtifactStore,
}

impl StudioContext {
    /// Wires the hosted-API clients. Fails when the credentials are unusable.
    pub fn from_config(config: EngineConfig) -> Result<Self, ToolError> {
        let gemini = Arc::new(GeminiClient::new(&config)?);
        let youtube = Arc::new(YouTubeClient::new(&config)?);
        let artifacts = ArtifactStore::new(config.artifact_dir());
        Ok(Self {
            generation: gemini.clone(),
            operations: gemini,
            youtube: Some(youtube),
            artifacts,
            config,
        })
    }

    pub fn toolbox(&self) -> Toolbox {
        Toolbox::new(self.generation.clone(), self.youtube.clone())
    }
}

enum EngineCommand {
    Run { request_id: RequestId, job: ToolJob },
    Cancel { request_id: RequestId },
}

type TokenMap = Arc<Mutex<HashMap<RequestId, CancellationToken>>>;

pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(context: StudioContext) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let context = Arc::new(context);

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    engine_error!("Failed to start engine runtime: {}", err);
                    return;
                }
            };
            let tokens: TokenMap = Arc::new(Mutex::new(HashMap::new()));
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Run { request_id, job } => {
                        let token = CancellationToken::new();
                        lock(&tokens).insert(request_id, token.clone());
                        let _ = event_tx.send(EngineEvent::Progress(JobProgress::stage(
                            request_id,
                            Stage::Queued,
                        )));
                        let context = context.clone();
                        let event_tx = event_tx.clone();
                        let tokens = tokens.clone();
                        runtime.spawn(async move {
                            let sink = ChannelProgressSink::new(event_tx.clone());
                            let result = execute(&context, request_id, job, &token, &sink).await;
                            lock(&tokens).remove(&request_id);
                            match &result {
                                Ok(_) => engine_info!("Request {} completed", request_id),
                                Err(err) if err.is_cancelled() => {
                                    engine_info!("Request {} cancelled", request_id)
                                }
                                Err(err) => engine_warn!("Request {} failed: {}", request_id, err),
                            }
                            let _ = event_tx.send(EngineEvent::Completed { request_id, result });
                        });
                    }
                    EngineCommand::Cancel { request_id } => {
                        if let Some(token) = lock(&tokens).remove(&request_id) {
                            engine_debug!("Cancelling request {}", request_id);
                            token.cancel();
                        }
                    }
                }
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn run(&self, request_id: RequestId, job: ToolJob) {
        let _ = self.cmd_tx.send(EngineCommand::Run { request_id, job });
    }

    /// Signals the job; it finishes with a `Cancelled` completion event.
    pub fn cancel(&self, request_id: RequestId) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel { request_id });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn execute(
    context: &StudioContext,
    request_id: RequestId,
    job: ToolJob,
    cancel: &CancellationToken,
    sink: &dyn ProgressSink,
) -> Result<ToolOutput, ToolError> {
    match job {
        ToolJob::Images {
            prompt,
            style,
            negative_prompt,
            count,
            aspect_ratio,
        } => {
            let request = ImageRequest {
                prompt: styled_prompt(&prompt, style.as_deref(), negative_prompt.as_deref()),
                count: count.clamp(1, ImageRequest::MAX_COUNT),
                aspect_ratio,
            };
            sink.progress(JobProgress::stage(request_id, Stage::Generating));
            let images =
                until_cancelled(cancel, context.generation.generate_images(&request)).await?;
            if images.is_empty() {
                return Err(ToolError::generation("no images were returned"));
            }
            Ok(ToolOutput::Images(images))
        }
        ToolJob::Bulk {
            script,
            style,
            aspect_ratio,
        } => {
            let sequencer =
                BatchSequencer::new(context.generation.clone(), context.config.batch.clone());
            sequencer
                .run_batch(request_id, &script, &style, aspect_ratio, cancel, sink)
                .await
                .map(ToolOutput::Batch)
                .map_err(|err| err.error)
        }
        ToolJob::Video(request) => {
            let poller = JobPoller::new(
                context.operations.clone(),
                context.artifacts.clone(),
                context.config.poll.clone(),
            );
            poller
                .run_job(request_id, &request, cancel, sink)
                .await
                .map(ToolOutput::Video)
        }
        ToolJob::Script { topic } => {
            sink.progress(JobProgress::stage(request_id, Stage::Generating));
            let toolbox = context.toolbox();
            until_cancelled(cancel, toolbox.write_script(&topic))
                .await
                .map(ToolOutput::Script)
        }
        ToolJob::Rewrite { script } => {
            sink.progress(JobProgress::stage(request_id, Stage::Generating));
            let toolbox = context.toolbox();
            until_cancelled(cancel, toolbox.rewrite_script(&script))
                .await
                .map(ToolOutput::Text)
        }
        ToolJob::Seo(inputs) => {
            sink.progress(JobProgress::stage(request_id, Stage::Generating));
            let toolbox = context.toolbox();
            until_cancelled(cancel, toolbox.seo_package(&inputs))
                .await
                .map(ToolOutput::Seo)
        }
        ToolJob::Speech(request) => {
            sink.progress(JobProgress::stage(request_id, Stage::Generating));
            let toolbox = context.toolbox();
            until_cancelled(cancel, toolbox.speak(&request))
                .await
                .map(ToolOutput::Audio)
        }
        ToolJob::Discovery { query } => {
            sink.progress(JobProgress::stage(request_id, Stage::Generating));
            let toolbox = context.toolbox();
            until_cancelled(cancel, toolbox.discover_channels(&query))
                .await
                .map(ToolOutput::Discovery)
        }
    }
}
