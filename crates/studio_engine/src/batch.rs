use std::sync::Arc;

use engine_logging::{engine_info, engine_warn};
use futures_util::StreamExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::client::GenerationApi;
use crate::payload::{AspectRatio, ImageRequest, TextRequest};
use crate::poller::until_cancelled;
use crate::progress::ProgressSink;
use crate::tools::{parse_structured, styled_prompt};
use crate::types::{BatchEvent, FailureKind, JobProgress, RequestId, Stage, ToolError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSettings {
    /// Upper bound on image requests in flight. Results are delivered in order regardless.
    pub concurrency: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

/// One extracted prompt, consumed exactly once by the generation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub id: String,
    pub index: usize,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItemResult {
    pub item: WorkItem,
    /// `data:` URI of the generated image.
    pub uri: String,
}

/// A batch that stopped early. Everything in `completed` was already delivered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{error}")]
pub struct BatchError {
    pub error: ToolError,
    /// Index of the item whose generation failed; `None` when extraction failed or the batch was cancelled between items.
    pub failed_index: Option<usize>,
    pub completed: Vec<BatchItemResult>,
}

impl BatchError {
    fn before_items(error: ToolError) -> Self {
        Self {
            error,
            failed_index: None,
            completed: Vec::new(),
        }
    }
}

pub struct BatchSequencer {
    api: Arc<dyn GenerationApi>,
    settings: BatchSettings,
}

impl BatchSequencer {
    pub fn new(api: Arc<dyn GenerationApi>, settings: BatchSettings) -> Self {
        Self { api, settings }
    }

    /// Extracts prompts from `source_text`, then generates one image per prompt in order.
    ///
    /// The first failing item aborts the remainder; items after it are never
    /// dispatched while the concurrency bound is 1.
    pub async fn run_batch(
        &self,
        request_id: RequestId,
        source_text: &str,
        style: &str,
        aspect_ratio: AspectRatio,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<BatchItemResult>, BatchError> {
        sink.progress(JobProgress::stage(request_id, Stage::Extracting));
        let items = until_cancelled(cancel, self.extract(source_text))
            .await
            .map_err(BatchError::before_items)?;
        engine_info!("Batch {} extracted {} prompts", request_id, items.len());
        sink.batch(request_id, BatchEvent::Extracted(items.clone()));

        let limit = self.settings.concurrency.max(1);
        let total = items.len();
        let requests = items.into_iter().map(|item| {
            let request = ImageRequest {
                prompt: styled_prompt(&item.prompt, Some(style), None),
                count: 1,
                aspect_ratio,
            };
            (item, request)
        });
        let stream = futures_util::stream::iter(requests)
            .map(|(item, request)| {
                sink.progress(JobProgress {
                    item: Some(item.index),
                    ..JobProgress::stage(request_id, Stage::Generating)
                });
                sink.batch(request_id, BatchEvent::ItemStarted { index: item.index });
                let api = Arc::clone(&self.api);
                async move {
                    let outcome = api.generate_images(&request).await;
                    (item, outcome)
                }
            })
            .buffered(limit);
        let mut stream = std::pin::pin!(stream);

        let mut completed = Vec::with_capacity(total);
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(BatchError {
                        error: ToolError::cancelled(),
                        failed_index: None,
                        completed,
                    });
                }
                next = stream.next() => next,
            };
            let Some((item, outcome)) = next else {
                break;
            };
            let uri = match outcome {
                Ok(uris) => uris.into_iter().next(),
                Err(error) => {
                    engine_warn!(
                        "Batch {} item {} failed: {}",
                        request_id,
                        item.index,
                        error
                    );
                    return Err(BatchError {
                        error,
                        failed_index: Some(item.index),
                        completed,
                    });
                }
            };
            let Some(uri) = uri else {
                return Err(BatchError {
                    error: ToolError::generation(format!(
                        "no image returned for prompt {}",
                        item.index + 1
                    )),
                    failed_index: Some(item.index),
                    completed,
                });
            };
            let result = BatchItemResult { item, uri };
            sink.batch(request_id, BatchEvent::ItemDone(result.clone()));
            completed.push(result);
        }

        sink.progress(JobProgress::stage(request_id, Stage::Done));
        Ok(completed)
    }

    async fn extract(&self, source_text: &str) -> Result<Vec<WorkItem>, ToolError> {
        let request = TextRequest::structured(extraction_prompt(source_text), prompt_list_schema());
        let reply = self.api.generate_text(&request).await?;
        let prompts: Vec<String> =
            parse_structured(&reply).map_err(|err| ToolError::malformed(err.message))?;
        let items: Vec<WorkItem> = prompts
            .into_iter()
            .map(|prompt| prompt.trim().to_string())
            .filter(|prompt| !prompt.is_empty())
            .enumerate()
            .map(|(index, prompt)| WorkItem {
                id: uuid::Uuid::new_v4().to_string(),
                index,
                prompt,
            })
            .collect();
        if items.is_empty() {
            return Err(ToolError::new(
                FailureKind::ExtractionEmpty,
                "no prompts could be extracted from the script",
            ));
        }
        Ok(items)
    }
}

fn extraction_prompt(source_text: &str) -> String {
    format!(
        "You are a storyboard artist. Read the video script below and, for every scene or \
         distinct visual moment, write one short, concrete image-generation prompt describing \
         the subject, setting, lighting and mood. Keep the scenes in script order. Return a JSON \
         array of strings.\n\nScript:\n\"\"\"\n{source_text}\n\"\"\""
    )
}

fn prompt_list_schema() -> serde_json::Value {
    json!({
        "type": "ARRAY",
        "items": { "type": "STRING", "description": "One visual prompt for one scene." },
    })
}
