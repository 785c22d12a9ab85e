use std::fmt;

use crate::artifact::LocalArtifact;
use crate::batch::{BatchItemResult, WorkItem};
use crate::payload::{AspectRatio, SpeechRequest, VideoRequest};
use crate::tools::{DiscoveryReport, ScriptDraft, SeoInputs, SeoPackage};

pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Queued,
    Submitting,
    Polling,
    Downloading,
    Extracting,
    Generating,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProgress {
    pub request_id: RequestId,
    pub stage: Stage,
    /// Status queries issued so far for a long-running job.
    pub polls: Option<u32>,
    /// Zero-based position of the batch item being generated.
    pub item: Option<usize>,
}

impl JobProgress {
    pub fn stage(request_id: RequestId, stage: Stage) -> Self {
        Self {
            request_id,
            stage,
            polls: None,
            item: None,
        }
    }
}

/// Incremental batch results, delivered before the batch as a whole completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Extracted(Vec<WorkItem>),
    ItemStarted { index: usize },
    ItemDone(BatchItemResult),
}

#[derive(Debug)]
pub enum EngineEvent {
    Progress(JobProgress),
    Batch {
        request_id: RequestId,
        event: BatchEvent,
    },
    Completed {
        request_id: RequestId,
        result: Result<ToolOutput, ToolError>,
    },
}

/// One unit of work accepted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolJob {
    Images {
        prompt: String,
        style: Option<String>,
        negative_prompt: Option<String>,
        count: u8,
        aspect_ratio: AspectRatio,
    },
    Bulk {
        script: String,
        style: String,
        aspect_ratio: AspectRatio,
    },
    Video(VideoRequest),
    Script {
        topic: String,
    },
    Rewrite {
        script: String,
    },
    Seo(SeoInputs),
    Speech(SpeechRequest),
    Discovery {
        query: String,
    },
}

#[derive(Debug)]
pub enum ToolOutput {
    /// `data:` URIs, one per generated image.
    Images(Vec<String>),
    Batch(Vec<BatchItemResult>),
    Video(LocalArtifact),
    Text(String),
    Script(ScriptDraft),
    Seo(SeoPackage),
    /// `data:` URI of the synthesized clip.
    Audio(String),
    Discovery(DiscoveryReport),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ToolError {
    pub kind: FailureKind,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn generation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::GenerationFailed { status: None }, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(FailureKind::MalformedResponse, message)
    }

    pub fn job_failed(message: impl Into<String>) -> Self {
        Self::new(FailureKind::JobFailed, message)
    }

    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "request was cancelled")
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == FailureKind::Cancelled
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport error, non-success status or schema-violating response.
    GenerationFailed { status: Option<u16> },
    /// A long-running job ended in error or without a result reference.
    JobFailed,
    ExtractionEmpty,
    MalformedResponse,
    /// Missing or placeholder credentials, or an unusable identity token.
    Configuration,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::GenerationFailed { status: Some(code) } => {
                write!(f, "generation failed (http status {code})")
            }
            FailureKind::GenerationFailed { status: None } => write!(f, "generation failed"),
            FailureKind::JobFailed => write!(f, "job failed"),
            FailureKind::ExtractionEmpty => write!(f, "nothing extracted"),
            FailureKind::MalformedResponse => write!(f, "malformed response"),
            FailureKind::Configuration => write!(f, "configuration error"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}
