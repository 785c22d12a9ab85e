//! Studio engine: remote generation, job polling, batch sequencing and effect execution.
mod artifact;
mod batch;
mod client;
mod config;
mod engine;
mod filename;
mod identity;
mod payload;
mod persist;
mod poller;
mod preview;
mod progress;
mod tools;
mod types;
mod youtube;

pub use artifact::{
    data_uri, decode_data_uri, extension_for_mime, save_artifact, ArtifactStore, LocalArtifact,
};
pub use batch::{BatchError, BatchItemResult, BatchSequencer, BatchSettings, WorkItem};
pub use client::{GeminiClient, GenerationApi};
pub use config::{ConfigError, Credentials, EngineConfig, HttpSettings, ModelSettings};
pub use engine::{EngineHandle, StudioContext};
pub use filename::artifact_filename;
pub use identity::{affiliate_id, decode_identity_token, IdentityError, IdentityProfile};
pub use payload::{AspectRatio, ImageRequest, SeedImage, SpeechRequest, TextRequest, VideoRequest};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use poller::{DownloadedMedia, JobHandle, JobPoller, OperationApi, PollSettings};
pub use preview::{prepare_preview, MAX_PREVIEW_CHARS};
pub use progress::{ChannelProgressSink, ProgressSink};
pub use tools::{
    styled_prompt, thumbnail_prompt, ChannelGrowth, DiscoveryReport, ScriptDraft, ScriptPoint,
    SeoInputs, SeoPackage, ThumbnailConcept, Toolbox, TrendingChannel, ViralVideo,
};
pub use types::{
    BatchEvent, EngineEvent, FailureKind, JobProgress, RequestId, Stage, ToolError, ToolJob,
    ToolOutput,
};
pub use youtube::{ChannelStats, SearchHit, VideoStats, YouTubeClient};
