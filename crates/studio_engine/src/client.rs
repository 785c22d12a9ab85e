use engine_logging::{engine_debug, engine_warn, redact_secrets};
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde_json::Value;

use crate::config::{ConfigError, EngineConfig, ModelSettings};
use crate::payload::{
    error_message, image_body, parse_image_response, parse_operation, parse_speech_response,
    parse_text_response, speech_body, text_body, video_body, ImageRequest, SpeechRequest,
    TextRequest, VideoRequest,
};
use crate::poller::{DownloadedMedia, JobHandle, OperationApi};
use crate::types::{FailureKind, ToolError};

/// Single-shot calls against the hosted generative API.
///
/// Implementations never retry; every failure is reported as-is.
#[async_trait::async_trait]
pub trait GenerationApi: Send + Sync {
    async fn generate_text(&self, request: &TextRequest) -> Result<String, ToolError>;

    /// Returns one `data:` URI per generated image.
    async fn generate_images(&self, request: &ImageRequest) -> Result<Vec<String>, ToolError>;

    /// Returns the clip as a `data:` URI.
    async fn synthesize_speech(&self, request: &SpeechRequest) -> Result<String, ToolError>;
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    models: ModelSettings,
}

impl GeminiClient {
    pub fn new(config: &EngineConfig) -> Result<Self, ToolError> {
        let api_key = config.credentials.require_api_key()?.to_string();
        let base_url = parse_base_url(&config.genai_base_url)?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.http.connect_timeout)
            .timeout(config.http.request_timeout)
            .build()
            .map_err(|err| ToolError::generation(err.to_string()))?;
        Ok(Self {
            http,
            base_url,
            api_key,
            models: config.models.clone(),
        })
    }

    fn model_url(&self, model: &str, method: &str) -> Result<Url, ToolError> {
        self.url(&format!("v1beta/models/{model}:{method}"))
    }

    fn url(&self, path: &str) -> Result<Url, ToolError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|err| ToolError::generation(format!("invalid endpoint {path}: {err}")))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn post_json(&self, url: Url, body: &Value) -> Result<Value, ToolError> {
        engine_debug!("POST {}", redact_secrets(url.as_str()));
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }

    async fn get_json(&self, url: Url) -> Result<Value, ToolError> {
        engine_debug!("GET {}", redact_secrets(url.as_str()));
        let response = self.http.get(url).send().await.map_err(map_reqwest_error)?;
        read_json(response).await
    }
}

#[async_trait::async_trait]
impl GenerationApi for GeminiClient {
    async fn generate_text(&self, request: &TextRequest) -> Result<String, ToolError> {
        let url = self.model_url(&self.models.text, "generateContent")?;
        let body = self.post_json(url, &text_body(request)).await?;
        parse_text_response(&body)
    }

    async fn generate_images(&self, request: &ImageRequest) -> Result<Vec<String>, ToolError> {
        let url = self.model_url(&self.models.image, "predict")?;
        let body = self.post_json(url, &image_body(request)).await?;
        parse_image_response(&body)
    }

    async fn synthesize_speech(&self, request: &SpeechRequest) -> Result<String, ToolError> {
        let url = self.model_url(&self.models.speech, "generateContent")?;
        let body = self.post_json(url, &speech_body(request)).await?;
        parse_speech_response(&body)
    }
}

#[async_trait::async_trait]
impl OperationApi for GeminiClient {
    async fn submit(&self, request: &VideoRequest) -> Result<JobHandle, ToolError> {
        let url = self.model_url(&self.models.video, "predictLongRunning")?;
        let body = self.post_json(url, &video_body(request)).await?;
        parse_operation(&body)
    }

    async fn refresh(&self, handle: &JobHandle) -> Result<JobHandle, ToolError> {
        let url = self.url(&format!("v1beta/{}", handle.name))?;
        let body = self.get_json(url).await?;
        parse_operation(&body)
    }

    async fn download(&self, uri: &str) -> Result<DownloadedMedia, ToolError> {
        let mut url = Url::parse(uri)
            .map_err(|err| ToolError::job_failed(format!("invalid result reference: {err}")))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        engine_debug!("GET {}", redact_secrets(url.as_str()));

        let response = self.http.get(url).send().await.map_err(map_reqwest_error)?;
        let response = check_status(response).await?;
        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("video/mp4")
            .to_string();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(DownloadedMedia {
            bytes: bytes.to_vec(),
            mime_type,
        })
    }
}

pub(crate) fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    // A trailing slash keeps `Url::join` from dropping the last path segment.
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|err| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        message: err.to_string(),
    })
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ToolError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = error_message(&body).unwrap_or_else(|| status.to_string());
    engine_warn!("Generative API returned {}: {}", status, detail);
    Err(ToolError::new(
        FailureKind::GenerationFailed {
            status: Some(status.as_u16()),
        },
        detail,
    ))
}

async fn read_json(response: reqwest::Response) -> Result<Value, ToolError> {
    let response = check_status(response).await?;
    response
        .json::<Value>()
        .await
        .map_err(|err| ToolError::generation(format!("response is not json: {err}")))
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ToolError {
    let message = redact_secrets(&err.to_string());
    if err.is_timeout() {
        return ToolError::generation(format!("request timed out: {message}"));
    }
    ToolError::generation(message)
}
