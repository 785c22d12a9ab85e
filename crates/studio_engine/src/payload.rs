//! Request bodies and response envelopes of the hosted generative API.
//!
//! Everything here is pure: builders turn typed requests into JSON bodies, and
//! parsers unwrap response envelopes into plain values or a [`ToolError`].

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};

use crate::artifact::data_uri;
use crate::poller::JobHandle;
use crate::types::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    Square,
    Landscape,
    Portrait,
    Classic,
    ClassicPortrait,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Landscape,
        AspectRatio::Portrait,
        AspectRatio::Classic,
        AspectRatio::ClassicPortrait,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Classic => "4:3",
            AspectRatio::ClassicPortrait => "3:4",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == trimmed)
            .ok_or_else(|| format!("unsupported aspect ratio {trimmed}"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub prompt: String,
    /// Response-shape descriptor; when present the reply must be JSON conforming to it.
    pub schema: Option<Value>,
}

impl TextRequest {
    pub fn plain(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            schema: None,
        }
    }

    pub fn structured(prompt: impl Into<String>, schema: Value) -> Self {
        Self {
            prompt: prompt.into(),
            schema: Some(schema),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub count: u8,
    pub aspect_ratio: AspectRatio,
}

impl ImageRequest {
    pub const MAX_COUNT: u8 = 4;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct SeedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl fmt::Debug for SeedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedImage")
            .field("bytes", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    pub prompt: String,
    pub seed_image: Option<SeedImage>,
    pub aspect_ratio: AspectRatio,
}

pub(crate) fn text_body(request: &TextRequest) -> Value {
    let mut body = json!({
        "contents": [{ "parts": [{ "text": request.prompt }] }],
    });
    if let Some(schema) = &request.schema {
        body["generationConfig"] = json!({
            "responseMimeType": "application/json",
            "responseSchema": schema,
        });
    }
    body
}

pub(crate) fn parse_text_response(body: &Value) -> Result<String, ToolError> {
    let parts = first_candidate_parts(body)?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        return Err(ToolError::generation("response contained no text"));
    }
    Ok(text)
}

pub(crate) fn image_body(request: &ImageRequest) -> Value {
    json!({
        "instances": [{ "prompt": request.prompt }],
        "parameters": {
            "sampleCount": request.count.clamp(1, ImageRequest::MAX_COUNT),
            "aspectRatio": request.aspect_ratio.as_str(),
            "outputMimeType": "image/jpeg",
        },
    })
}

pub(crate) fn parse_image_response(body: &Value) -> Result<Vec<String>, ToolError> {
    let predictions = body
        .get("predictions")
        .and_then(Value::as_array)
        .ok_or_else(|| ToolError::generation("response contained no images"))?;
    predictions
        .iter()
        .map(|prediction| {
            let encoded = prediction
                .get("bytesBase64Encoded")
                .and_then(Value::as_str)
                .ok_or_else(|| ToolError::generation("image prediction without data"))?;
            let mime = prediction
                .get("mimeType")
                .and_then(Value::as_str)
                .unwrap_or("image/jpeg");
            Ok(format!("data:{mime};base64,{encoded}"))
        })
        .collect()
}

pub(crate) fn speech_body(request: &SpeechRequest) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": request.text }] }],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": request.voice } }
            },
        },
    })
}

/// Unwraps the inline audio of a speech reply into a playable `data:` URI.
///
/// Raw PCM (`audio/L16`) is wrapped in a WAV container; other types pass through.
pub(crate) fn parse_speech_response(body: &Value) -> Result<String, ToolError> {
    let parts = first_candidate_parts(body)?;
    let inline = parts
        .iter()
        .find_map(|part| part.get("inlineData"))
        .ok_or_else(|| ToolError::generation("response contained no audio"))?;
    let mime = inline
        .get("mimeType")
        .and_then(Value::as_str)
        .unwrap_or("audio/wav");
    let encoded = inline
        .get("data")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::generation("audio part without data"))?;
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|err| ToolError::generation(format!("audio data is not base64: {err}")))?;

    if mime.to_ascii_lowercase().starts_with("audio/l16") {
        let rate = pcm_sample_rate(mime).unwrap_or(24_000);
        Ok(data_uri("audio/wav", &pcm_to_wav(&bytes, rate)))
    } else {
        Ok(data_uri(mime, &bytes))
    }
}

fn pcm_sample_rate(mime: &str) -> Option<u32> {
    mime.split(';')
        .filter_map(|part| part.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse().ok())
}

/// 16-bit little-endian mono PCM into a RIFF/WAVE container.
pub(crate) fn pcm_to_wav(pcm: &[u8], sample_rate: u32) -> Vec<u8> {
    const CHANNELS: u16 = 1;
    const BITS: u16 = 16;
    let byte_rate = sample_rate * u32::from(CHANNELS) * u32::from(BITS) / 8;
    let block_align = CHANNELS * BITS / 8;
    let data_len = pcm.len() as u32;

    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVEfmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&CHANNELS.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&BITS.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(pcm);
    wav
}

pub(crate) fn video_body(request: &VideoRequest) -> Value {
    let mut instance = json!({ "prompt": request.prompt });
    if let Some(seed) = &request.seed_image {
        instance["image"] = json!({
            "bytesBase64Encoded": STANDARD.encode(&seed.bytes),
            "mimeType": seed.mime_type,
        });
    }
    json!({
        "instances": [instance],
        "parameters": {
            "sampleCount": 1,
            "aspectRatio": request.aspect_ratio.as_str(),
        },
    })
}

/// Reads an operation envelope into a [`JobHandle`].
///
/// Both the REST (`generateVideoResponse.generatedSamples`) and the SDK-style
/// (`generatedVideos`) result shapes are accepted.
pub(crate) fn parse_operation(body: &Value) -> Result<JobHandle, ToolError> {
    let name = body
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::generation("operation without a name"))?;
    let done = body.get("done").and_then(Value::as_bool).unwrap_or(false);
    let error = body.get("error").map(|err| {
        err.get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string())
    });
    let result_uri = body.get("response").and_then(|response| {
        let samples = response
            .pointer("/generateVideoResponse/generatedSamples")
            .or_else(|| response.get("generatedVideos"))?;
        samples
            .as_array()?
            .iter()
            .find_map(|sample| sample.pointer("/video/uri").and_then(Value::as_str))
            .map(str::to_string)
    });
    Ok(JobHandle {
        name: name.to_string(),
        done,
        result_uri,
        error,
    })
}

/// Human-readable message of a JSON error envelope (`{"error": {"message": ..}}`).
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn first_candidate_parts(body: &Value) -> Result<&Vec<Value>, ToolError> {
    if let Some(reason) = body
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
    {
        return Err(ToolError::generation(format!("prompt was blocked: {reason}")));
    }
    body.pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| ToolError::generation("response contained no candidates"))
}
