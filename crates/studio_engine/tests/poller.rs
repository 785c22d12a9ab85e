use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use studio_engine::{
    ArtifactStore, AspectRatio, Credentials, DownloadedMedia, EngineConfig, EngineEvent,
    FailureKind, GeminiClient, JobHandle, JobPoller, JobProgress, OperationApi, PollSettings,
    ProgressSink, Stage, ToolError, VideoRequest,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl TestSink {
    fn stages(&self) -> Vec<(Stage, Option<u32>)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::Progress(JobProgress { stage, polls, .. }) => Some((*stage, *polls)),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Scripted operation service: hands out queued handles, one per refresh.
struct ScriptedOperations {
    refreshes: Mutex<VecDeque<JobHandle>>,
    refresh_calls: AtomicUsize,
    download_calls: AtomicUsize,
}

impl ScriptedOperations {
    fn new(refreshes: Vec<JobHandle>) -> Arc<Self> {
        Arc::new(Self {
            refreshes: Mutex::new(refreshes.into()),
            refresh_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl OperationApi for ScriptedOperations {
    async fn submit(&self, _request: &VideoRequest) -> Result<JobHandle, ToolError> {
        Ok(pending())
    }

    async fn refresh(&self, handle: &JobHandle) -> Result<JobHandle, ToolError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .refreshes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| handle.clone()))
    }

    async fn download(&self, uri: &str) -> Result<DownloadedMedia, ToolError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        Ok(DownloadedMedia {
            bytes: format!("video from {uri}").into_bytes(),
            mime_type: "video/mp4".to_string(),
        })
    }
}

fn pending() -> JobHandle {
    JobHandle {
        name: "operations/test".to_string(),
        ..JobHandle::default()
    }
}

fn finished(uri: Option<&str>) -> JobHandle {
    JobHandle {
        done: true,
        result_uri: uri.map(str::to_string),
        ..pending()
    }
}

fn request() -> VideoRequest {
    VideoRequest {
        prompt: "timelapse of a city skyline".to_string(),
        seed_image: None,
        aspect_ratio: AspectRatio::Landscape,
    }
}

fn fast() -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(1),
    }
}

#[tokio::test]
async fn polls_until_done_and_materializes_result() {
    let temp = TempDir::new().unwrap();
    let api = ScriptedOperations::new(vec![
        pending(),
        pending(),
        finished(Some("https://files.example/clip.mp4")),
    ]);
    let poller = JobPoller::new(
        api.clone(),
        ArtifactStore::new(temp.path().join("staging")),
        fast(),
    );
    let sink = TestSink::default();

    let artifact = poller
        .run_job(7, &request(), &CancellationToken::new(), &sink)
        .await
        .unwrap();

    assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 3);
    assert_eq!(api.download_calls.load(Ordering::SeqCst), 1);
    assert_eq!(artifact.mime_type(), "video/mp4");
    assert_eq!(
        fs::read(artifact.path()).unwrap(),
        b"video from https://files.example/clip.mp4"
    );
    assert_eq!(
        sink.stages(),
        vec![
            (Stage::Submitting, None),
            (Stage::Polling, Some(1)),
            (Stage::Polling, Some(2)),
            (Stage::Polling, Some(3)),
            (Stage::Downloading, None),
            (Stage::Done, None),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn default_interval_is_ten_seconds_between_queries() {
    let temp = TempDir::new().unwrap();
    let api = ScriptedOperations::new(vec![pending(), finished(Some("https://files.example/a"))]);
    let poller = JobPoller::new(
        api.clone(),
        ArtifactStore::new(temp.path().to_path_buf()),
        PollSettings::default(),
    );

    let started = tokio::time::Instant::now();
    poller
        .run_job(1, &request(), &CancellationToken::new(), &TestSink::default())
        .await
        .unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(20));
    assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn done_without_result_reference_fails_without_download() {
    let temp = TempDir::new().unwrap();
    let api = ScriptedOperations::new(vec![finished(None)]);
    let poller = JobPoller::new(api.clone(), ArtifactStore::new(temp.path().to_path_buf()), fast());

    let err = poller
        .run_job(2, &request(), &CancellationToken::new(), &TestSink::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::JobFailed);
    assert_eq!(api.download_calls.load(Ordering::SeqCst), 0);
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn error_handle_is_a_job_failure_carrying_the_message() {
    let temp = TempDir::new().unwrap();
    let api = ScriptedOperations::new(vec![JobHandle {
        error: Some("quota exceeded".to_string()),
        ..finished(Some("https://files.example/ignored"))
    }]);
    let poller = JobPoller::new(api.clone(), ArtifactStore::new(temp.path().to_path_buf()), fast());

    let err = poller
        .run_job(3, &request(), &CancellationToken::new(), &TestSink::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::JobFailed);
    assert_eq!(err.message, "quota exceeded");
    assert_eq!(api.download_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cancellation_stops_polling_before_download() {
    let temp = TempDir::new().unwrap();
    // Never finishes on its own.
    let api = ScriptedOperations::new(Vec::new());
    let poller = JobPoller::new(
        api.clone(),
        ArtifactStore::new(temp.path().to_path_buf()),
        PollSettings {
            interval: Duration::from_millis(20),
        },
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(70)).await;
        trigger.cancel();
    });

    let err = poller
        .run_job(4, &request(), &cancel, &TestSink::default())
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(api.download_calls.load(Ordering::SeqCst), 0);
    assert!(api.refresh_calls.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn end_to_end_against_http_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/veo-2.0-generate-001:predictLongRunning"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "name": "operations/v1" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1beta/operations/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "operations/v1",
            "done": true,
            "response": { "generateVideoResponse": { "generatedSamples": [
                { "video": { "uri": format!("{}/files/v1.mp4", server.uri()) } }
            ]}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/v1.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"mp4-bytes".to_vec(), "video/mp4"))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut config = EngineConfig::default_with_output(temp.path().to_path_buf());
    config.credentials = Credentials {
        api_key: Some("k".to_string()),
        client_id: None,
    };
    config.genai_base_url = server.uri();
    let client = Arc::new(GeminiClient::new(&config).unwrap());
    let poller = JobPoller::new(client, ArtifactStore::new(config.artifact_dir()), fast());

    let artifact = poller
        .run_job(5, &request(), &CancellationToken::new(), &TestSink::default())
        .await
        .unwrap();
    assert_eq!(artifact.size(), 9);

    let staged: PathBuf = artifact.path().to_path_buf();
    assert!(staged.exists());
    drop(artifact);
    assert!(!staged.exists());
}
