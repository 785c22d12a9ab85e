use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::{engine_error, engine_info, engine_warn};
use studio_core::{Effect, JobSpec, Msg, RequestId, ToolResult};
use studio_engine::{
    artifact_filename, decode_data_uri, extension_for_mime, save_artifact, BatchEvent, EngineConfig, EngineEvent,
    EngineHandle, LocalArtifact, SeoInputs, StudioContext, ToolError, ToolOutput,
};

use super::jobs::{
    discovery_document, map_stage, script_document, seo_document, seo_inputs, to_tool_job,
};
use super::persistence::save_session;

/// What the runner remembers about a request until it completes.
#[derive(Debug, Default)]
struct PendingRequest {
    /// File-name hint for saved media.
    hint: Option<String>,
    seo: Option<SeoInputs>,
    discovery_query: Option<String>,
    bulk_saved: Vec<String>,
    /// First bulk image that could not be written to disk.
    bulk_error: Option<String>,
}

/// Executes core effects and turns engine events back into core messages.
pub struct EffectRunner {
    config: EngineConfig,
    engine: Option<EngineHandle>,
    pending: HashMap<RequestId, PendingRequest>,
}

impl EffectRunner {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            engine: None,
            pending: HashMap::new(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Applies effects; returns messages that resolve immediately (e.g. a job
    /// that could not be started).
    pub fn apply(&mut self, effects: Vec<Effect>) -> Vec<Msg> {
        let mut immediate = Vec::new();
        for effect in effects {
            match effect {
                Effect::Run { request_id, job } => {
                    if let Err(message) = self.start(request_id, job) {
                        engine_warn!("Request {} not started: {}", request_id, message);
                        self.pending.remove(&request_id);
                        immediate.push(Msg::JobDone {
                            request_id,
                            result: Err(message),
                        });
                    }
                }
                Effect::Cancel { request_id } => {
                    engine_info!("Cancel request_id={}", request_id);
                    if let Some(engine) = &self.engine {
                        engine.cancel(request_id);
                    }
                    self.pending.remove(&request_id);
                }
                Effect::PersistSession { profile, referral } => {
                    save_session(
                        &self.config.output_dir,
                        profile.as_ref(),
                        referral.as_deref(),
                    );
                }
                Effect::AttributeReferral { email, referral } => {
                    // Crediting happens server-side; the client only records it.
                    engine_info!("Referral {} attributed to {}", referral, email);
                }
            }
        }
        immediate
    }

    fn start(&mut self, request_id: RequestId, job: JobSpec) -> Result<(), String> {
        let pending = PendingRequest {
            hint: hint_for(&job),
            seo: match &job {
                JobSpec::Seo(brief) => Some(seo_inputs(brief)),
                _ => None,
            },
            discovery_query: match &job {
                JobSpec::Discovery { query } => Some(query.clone()),
                _ => None,
            },
            bulk_saved: Vec::new(),
            bulk_error: None,
        };
        let tool_job = to_tool_job(job)?;
        let engine = self.engine()?;
        engine_info!("Run request_id={} job={:?}", request_id, tool_job);
        engine.run(request_id, tool_job);
        self.pending.insert(request_id, pending);
        Ok(())
    }

    /// Starts the engine on first use so commands that never generate
    /// anything do not need credentials.
    fn engine(&mut self) -> Result<&EngineHandle, String> {
        if self.engine.is_none() {
            let context =
                StudioContext::from_config(self.config.clone()).map_err(|err| err.to_string())?;
            self.engine = Some(EngineHandle::new(context));
        }
        self.engine
            .as_ref()
            .ok_or_else(|| "engine unavailable".to_string())
    }

    /// Waits up to `timeout` for engine events and converts everything available.
    pub fn poll(&mut self, timeout: Duration) -> Vec<Msg> {
        let Some(engine) = &self.engine else {
            return Vec::new();
        };
        let mut events = Vec::new();
        if let Some(first) = engine.recv_timeout(timeout) {
            events.push(first);
            while let Some(event) = engine.try_recv() {
                events.push(event);
            }
        }
        events
            .into_iter()
            .filter_map(|event| self.translate(event))
            .collect()
    }

    fn translate(&mut self, event: EngineEvent) -> Option<Msg> {
        match event {
            EngineEvent::Progress(progress) => Some(Msg::JobProgress {
                request_id: progress.request_id,
                stage: map_stage(progress.stage),
                polls: progress.polls,
                item: progress.item,
            }),
            EngineEvent::Batch { request_id, event } => self.translate_batch(request_id, event),
            EngineEvent::Completed { request_id, result } => {
                let pending = self.pending.remove(&request_id);
                let Some(pending) = pending else {
                    // Cancelled or superseded; the artifact handle drops here.
                    return None;
                };
                let result = match result {
                    Ok(output) => self.store_output(output, pending),
                    Err(err) => Err(describe(&err)),
                };
                Some(Msg::JobDone { request_id, result })
            }
        }
    }

    fn translate_batch(&mut self, request_id: RequestId, event: BatchEvent) -> Option<Msg> {
        match event {
            BatchEvent::Extracted(items) => Some(Msg::BulkPromptsExtracted {
                request_id,
                prompts: items.into_iter().map(|item| item.prompt).collect(),
            }),
            BatchEvent::ItemStarted { index } => Some(Msg::BulkItemStarted { request_id, index }),
            BatchEvent::ItemDone(result) => {
                let dir = self.media_dir("images");
                match save_artifact(&dir, Some(&result.item.prompt), &result.uri) {
                    Ok(path) => {
                        let location = path.display().to_string();
                        if let Some(pending) = self.pending.get_mut(&request_id) {
                            pending.bulk_saved.push(location.clone());
                        }
                        Some(Msg::BulkItemDone {
                            request_id,
                            index: result.item.index,
                            location,
                        })
                    }
                    Err(err) => {
                        engine_error!(
                            "Failed to save batch item {} of request {}: {}",
                            result.item.index,
                            request_id,
                            err
                        );
                        if let Some(pending) = self.pending.get_mut(&request_id) {
                            pending.bulk_error.get_or_insert_with(|| {
                                format!("could not save image {}: {err}", result.item.index + 1)
                            });
                        }
                        None
                    }
                }
            }
        }
    }

    fn store_output(
        &self,
        output: ToolOutput,
        pending: PendingRequest,
    ) -> Result<ToolResult, String> {
        let hint = pending.hint.as_deref();
        match output {
            ToolOutput::Images(uris) => {
                let dir = self.media_dir("images");
                let locations = uris
                    .iter()
                    .map(|uri| {
                        save_artifact(&dir, hint, uri).map(|path| path.display().to_string())
                    })
                    .collect::<Result<Vec<_>, ToolError>>()
                    .map_err(|err| describe(&err))?;
                Ok(ToolResult::Images(locations))
            }
            ToolOutput::Batch(_) => match pending.bulk_error {
                Some(message) => Err(message),
                None => Ok(ToolResult::Images(pending.bulk_saved)),
            },
            ToolOutput::Video(artifact) => {
                let mime_type = artifact.mime_type().to_string();
                let location = self.keep_video(artifact, hint)?;
                Ok(ToolResult::Media {
                    location,
                    mime_type,
                })
            }
            ToolOutput::Audio(uri) => {
                let (mime_type, _) = decode_data_uri(&uri).map_err(|e| describe(&e))?;
                let path =
                    save_artifact(&self.media_dir("audio"), hint, &uri).map_err(|e| describe(&e))?;
                Ok(ToolResult::Media {
                    location: path.display().to_string(),
                    mime_type,
                })
            }
            ToolOutput::Text(text) => Ok(ToolResult::Text(text)),
            ToolOutput::Script(draft) => Ok(script_document(draft)),
            ToolOutput::Seo(package) => Ok(seo_document(package, pending.seo.as_ref())),
            ToolOutput::Discovery(report) => Ok(discovery_document(
                pending.discovery_query.as_deref().unwrap_or_default(),
                report,
            )),
        }
    }

    fn keep_video(&self, artifact: LocalArtifact, hint: Option<&str>) -> Result<String, String> {
        let bytes = fs::read(artifact.path())
            .map_err(|err| format!("staged video is unreadable: {err}"))?;
        let filename = artifact_filename(hint, &bytes, extension_for_mime(artifact.mime_type()));
        let dest = self.media_dir("videos").join(filename);
        let kept = artifact
            .keep(&dest)
            .map_err(|err| format!("could not save video: {err}"))?;
        Ok(kept.display().to_string())
    }

    fn media_dir(&self, kind: &str) -> PathBuf {
        self.config.output_dir.join(kind)
    }
}

fn hint_for(job: &JobSpec) -> Option<String> {
    match job {
        JobSpec::Images { prompt, .. }
        | JobSpec::Video { prompt, .. }
        | JobSpec::Thumbnail { prompt } => Some(prompt.clone()),
        JobSpec::Speech { text, .. } => Some(text.clone()),
        _ => None,
    }
}

fn describe(err: &ToolError) -> String {
    if err.is_cancelled() {
        "Cancelled".to_string()
    } else {
        err.to_string()
    }
}
