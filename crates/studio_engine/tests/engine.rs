use std::sync::Arc;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use studio_engine::{
    ArtifactStore, AspectRatio, DownloadedMedia, EngineConfig, EngineEvent, EngineHandle,
    FailureKind, GenerationApi, ImageRequest, JobHandle, JobProgress, OperationApi, PollSettings,
    SpeechRequest, Stage, StudioContext, TextRequest, ToolError, ToolJob, ToolOutput, VideoRequest,
};
use tempfile::TempDir;

struct EchoStudio;

#[async_trait::async_trait]
impl GenerationApi for EchoStudio {
    async fn generate_text(&self, request: &TextRequest) -> Result<String, ToolError> {
        Ok(format!("rewritten: {}", request.prompt.len()))
    }

    async fn generate_images(&self, request: &ImageRequest) -> Result<Vec<String>, ToolError> {
        Ok((0..request.count)
            .map(|i| format!("data:image/jpeg;base64,{i}"))
            .collect())
    }

    async fn synthesize_speech(&self, _request: &SpeechRequest) -> Result<String, ToolError> {
        Err(ToolError::generation("voice unavailable"))
    }
}

/// A job that never finishes.
struct StuckOperations;

#[async_trait::async_trait]
impl OperationApi for StuckOperations {
    async fn submit(&self, _request: &VideoRequest) -> Result<JobHandle, ToolError> {
        Ok(JobHandle {
            name: "operations/stuck".to_string(),
            ..JobHandle::default()
        })
    }

    async fn refresh(&self, handle: &JobHandle) -> Result<JobHandle, ToolError> {
        Ok(handle.clone())
    }

    async fn download(&self, _uri: &str) -> Result<DownloadedMedia, ToolError> {
        Err(ToolError::generation("nothing to download"))
    }
}

fn engine(temp: &TempDir) -> EngineHandle {
    let mut config = EngineConfig::default_with_output(temp.path().to_path_buf());
    config.poll = PollSettings {
        interval: Duration::from_millis(10),
    };
    let context = StudioContext {
        artifacts: ArtifactStore::new(config.artifact_dir()),
        config,
        generation: Arc::new(EchoStudio),
        operations: Arc::new(StuckOperations),
        youtube: None,
    };
    EngineHandle::new(context)
}

fn wait_for_completion(
    engine: &EngineHandle,
    request_id: u64,
) -> Result<ToolOutput, ToolError> {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if let Some(EngineEvent::Completed {
            request_id: id,
            result,
        }) = engine.recv_timeout(Duration::from_millis(50))
        {
            if id == request_id {
                return result;
            }
        }
    }
    panic!("request {request_id} did not complete");
}

#[test]
fn image_job_completes_with_requested_count() {
    let temp = TempDir::new().unwrap();
    let engine = engine(&temp);
    engine.run(
        1,
        ToolJob::Images {
            prompt: "neon city".to_string(),
            style: Some("cyberpunk".to_string()),
            negative_prompt: None,
            count: 9,
            aspect_ratio: AspectRatio::Square,
        },
    );

    match wait_for_completion(&engine, 1) {
        Ok(ToolOutput::Images(images)) => assert_eq!(images.len(), 4),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn accepted_job_reports_queued_first() {
    let temp = TempDir::new().unwrap();
    let engine = engine(&temp);
    engine.run(
        5,
        ToolJob::Rewrite {
            script: "draft".to_string(),
        },
    );

    match engine.recv_timeout(Duration::from_secs(2)) {
        Some(EngineEvent::Progress(progress)) => {
            assert_eq!(progress, JobProgress::stage(5, Stage::Queued))
        }
        other => panic!("unexpected first event: {other:?}"),
    }
    assert!(wait_for_completion(&engine, 5).is_ok());
}

#[test]
fn failures_surface_as_completed_errors() {
    let temp = TempDir::new().unwrap();
    let engine = engine(&temp);
    engine.run(
        2,
        ToolJob::Speech(SpeechRequest {
            text: "hello".to_string(),
            voice: "Kore".to_string(),
        }),
    );

    let err = wait_for_completion(&engine, 2).unwrap_err();
    assert_eq!(err.kind, FailureKind::GenerationFailed { status: None });
}

#[test]
fn discovery_without_platform_client_is_a_configuration_error() {
    let temp = TempDir::new().unwrap();
    let engine = engine(&temp);
    engine.run(
        3,
        ToolJob::Discovery {
            query: "ai".to_string(),
        },
    );

    let err = wait_for_completion(&engine, 3).unwrap_err();
    assert_eq!(err.kind, FailureKind::Configuration);
}

#[test]
fn cancel_stops_a_polling_job() {
    let temp = TempDir::new().unwrap();
    let engine = engine(&temp);
    engine.run(
        4,
        ToolJob::Video(VideoRequest {
            prompt: "endless ocean".to_string(),
            seed_image: None,
            aspect_ratio: AspectRatio::Landscape,
        }),
    );

    // Let it poll a few times first.
    let mut polls = 0;
    while polls < 2 {
        if let Some(EngineEvent::Progress(progress)) =
            engine.recv_timeout(Duration::from_secs(2))
        {
            if progress.polls.is_some() {
                polls += 1;
            }
        }
    }
    engine.cancel(4);

    let err = wait_for_completion(&engine, 4).unwrap_err();
    assert!(err.is_cancelled());
}
