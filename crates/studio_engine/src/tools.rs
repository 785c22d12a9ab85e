//! Text tools built on [`GenerationApi`]: script writing, rewriting, SEO packages,
//! speech and channel discovery.

use std::collections::BTreeSet;
use std::sync::Arc;

use engine_logging::engine_info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::GenerationApi;
use crate::payload::{SpeechRequest, TextRequest};
use crate::types::{FailureKind, ToolError};
use crate::youtube::YouTubeClient;

const DISCOVERY_SEARCH_RESULTS: u32 = 25;

/// Runs a structured-output request and parses the reply into `T`.
pub(crate) async fn generate_structured<T: DeserializeOwned>(
    api: &dyn GenerationApi,
    request: &TextRequest,
) -> Result<T, ToolError> {
    let text = api.generate_text(request).await?;
    parse_structured(&text)
}

/// A reply that does not fit `T` is a generation failure like any other bad response.
pub(crate) fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, ToolError> {
    let trimmed = strip_code_fence(text.trim());
    serde_json::from_str(trimmed).map_err(|err| {
        ToolError::generation(format!("reply does not match the expected shape: {err}"))
    })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Appends the visual style and the exclusion list to an image prompt.
pub fn styled_prompt(prompt: &str, style: Option<&str>, negative_prompt: Option<&str>) -> String {
    let mut full = prompt.trim().to_string();
    if let Some(style) = style.map(str::trim).filter(|s| !s.is_empty() && *s != "default") {
        full.push_str(&format!(", {} style", style.replace('_', " ")));
    }
    if let Some(negative) = negative_prompt.map(str::trim).filter(|s| !s.is_empty()) {
        full.push_str(&format!(". Exclude: {negative}"));
    }
    full
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDraft {
    pub title: String,
    pub hook: String,
    pub introduction: String,
    pub main_points: Vec<ScriptPoint>,
    pub conclusion: String,
    pub call_to_action: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptPoint {
    pub heading: String,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeoInputs {
    pub topic: String,
    pub keywords: String,
    pub channel_link: String,
    pub business_email: String,
    pub target_audience: String,
    pub desired_emotion: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoPackage {
    pub titles: Vec<String>,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub thumbnails: Vec<ThumbnailConcept>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailConcept {
    pub concept_description: String,
    pub facial_expression: String,
    #[serde(default)]
    pub objects: Vec<String>,
    #[serde(default)]
    pub color_pairs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryReport {
    pub trending_channels: Vec<TrendingChannel>,
    pub viral_videos: Vec<ViralVideo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingChannel {
    pub name: String,
    pub subscriber_count: String,
    pub subscriber_growth: ChannelGrowth,
    pub avg_views: String,
    pub niche: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelGrowth {
    #[serde(rename = "last7Days")]
    pub last_7_days: String,
    #[serde(rename = "last30Days")]
    pub last_30_days: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViralVideo {
    pub title: String,
    pub channel_name: String,
    pub views: String,
    pub vph: String,
    pub viral_index: u32,
    pub upload_date: String,
}

/// Prompt for a single 16:9 thumbnail built from one SEO concept.
pub fn thumbnail_prompt(inputs: &SeoInputs, concept: &ThumbnailConcept) -> String {
    let mut prompt = format!(
        "Create a photorealistic YouTube thumbnail. Video topic: \"{}\".",
        inputs.topic.trim()
    );
    if !inputs.target_audience.trim().is_empty() {
        prompt.push_str(&format!(
            " Target audience: \"{}\"; the people in the image must match this audience.",
            inputs.target_audience.trim()
        ));
    }
    prompt.push_str(&format!(
        " Visual concept: \"{}\". A person with a \"{}\" expression.",
        concept.concept_description, concept.facial_expression
    ));
    if !concept.objects.is_empty() {
        prompt.push_str(&format!(" Include: {}.", concept.objects.join(", ")));
    }
    if !concept.color_pairs.is_empty() {
        prompt.push_str(&format!(
            " High-contrast palette with {}.",
            concept.color_pairs.join(" and ")
        ));
    }
    prompt.push_str(" Clean, modern, eye-catching. No text.");
    prompt
}

/// Context object for the text tools; built once and shared.
#[derive(Clone)]
pub struct Toolbox {
    api: Arc<dyn GenerationApi>,
    youtube: Option<Arc<YouTubeClient>>,
}

impl Toolbox {
    pub fn new(api: Arc<dyn GenerationApi>, youtube: Option<Arc<YouTubeClient>>) -> Self {
        Self { api, youtube }
    }

    pub async fn write_script(&self, topic: &str) -> Result<ScriptDraft, ToolError> {
        let prompt = format!(
            "You are an expert YouTube scriptwriter. Write a detailed script for a video about \
             \"{}\". Include a catchy title, a curiosity-driven hook, an introduction, 3-4 main \
             points with details, a summarizing conclusion and a strong call to action. Return a \
             JSON object following the given schema.",
            topic.trim()
        );
        generate_structured(self.api.as_ref(), &TextRequest::structured(prompt, script_schema()))
            .await
    }

    pub async fn rewrite_script(&self, script: &str) -> Result<String, ToolError> {
        let prompt = format!(
            "You are a YouTube script editor. Rewrite the script below to be more engaging and \
             improve audience retention: tighten the wording, strengthen the structure, add \
             curiosity gaps and a stronger call to action. Return only the rewritten script.\n\n\
             Original script:\n\"\"\"\n{script}\n\"\"\""
        );
        self.api.generate_text(&TextRequest::plain(prompt)).await
    }

    pub async fn seo_package(&self, inputs: &SeoInputs) -> Result<SeoPackage, ToolError> {
        let prompt = format!(
            "You are a YouTube SEO specialist. Produce a complete SEO package for a video.\n\
             Topic: {}\nKeywords: {}\nChannel link: {}\nBusiness email: {}\nTarget audience: {}\n\
             Desired emotion: {}\n\
             Give 5 title options, a description that repeats the main keywords naturally and ends \
             with the channel link and business email, 15-25 tags, and 3 thumbnail concepts. \
             Return a JSON object following the given schema.",
            inputs.topic.trim(),
            inputs.keywords.trim(),
            inputs.channel_link.trim(),
            inputs.business_email.trim(),
            inputs.target_audience.trim(),
            inputs.desired_emotion.trim(),
        );
        generate_structured(self.api.as_ref(), &TextRequest::structured(prompt, seo_schema())).await
    }

    pub async fn speak(&self, request: &SpeechRequest) -> Result<String, ToolError> {
        self.api.synthesize_speech(request).await
    }

    /// Searches the platform for `query`, then asks the model to rank channels and videos.
    pub async fn discover_channels(&self, query: &str) -> Result<DiscoveryReport, ToolError> {
        let youtube = self.youtube.as_ref().ok_or_else(|| {
            ToolError::new(FailureKind::Configuration, "platform data client is not configured")
        })?;
        let hits = youtube.search_videos(query, DISCOVERY_SEARCH_RESULTS).await?;
        if hits.is_empty() {
            return Err(ToolError::new(
                FailureKind::ExtractionEmpty,
                format!("no videos found for \"{query}\""),
            ));
        }
        let video_ids: Vec<String> = hits.iter().map(|hit| hit.video_id.clone()).collect();
        let channel_ids: Vec<String> = hits
            .iter()
            .map(|hit| hit.channel_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let (videos, channels) =
            tokio::try_join!(youtube.videos(&video_ids), youtube.channels(&channel_ids))?;
        engine_info!(
            "Discovery for {:?}: {} videos, {} channels",
            query,
            videos.len(),
            channels.len()
        );

        let digest = json!({
            "videos": videos,
            "channels": channels,
        });
        let prompt = format!(
            "You are a YouTube analytics tool. From the raw platform data below, identify the \
             trending faceless AI channels and the viral videos. Metrics must be plausible; compute \
             VPH (views per hour) from the view count and publish date. Return a JSON object \
             following the given schema.\n\nData: {digest}"
        );
        generate_structured(
            self.api.as_ref(),
            &TextRequest::structured(prompt, discovery_schema()),
        )
        .await
    }
}

fn string_field(description: &str) -> Value {
    json!({ "type": "STRING", "description": description })
}

fn string_list(description: &str) -> Value {
    json!({ "type": "ARRAY", "description": description, "items": { "type": "STRING" } })
}

fn script_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": string_field("Catchy video title."),
            "hook": string_field("Opening hook."),
            "introduction": string_field("Introduction."),
            "mainPoints": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "heading": string_field("Point heading."),
                        "details": string_field("Point details."),
                    },
                    "required": ["heading", "details"],
                },
            },
            "conclusion": string_field("Conclusion."),
            "callToAction": string_field("Call to action."),
        },
        "required": ["title", "hook", "introduction", "mainPoints", "conclusion", "callToAction"],
    })
}

fn seo_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "titles": string_list("Title options."),
            "description": string_field("Video description."),
            "tags": string_list("Tags."),
            "thumbnails": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "conceptDescription": string_field("Visual concept."),
                        "facialExpression": string_field("Facial expression of the subject."),
                        "objects": string_list("Objects in frame."),
                        "colorPairs": string_list("Contrasting color pairs."),
                    },
                    "required": ["conceptDescription", "facialExpression"],
                },
            },
        },
        "required": ["titles", "description", "tags", "thumbnails"],
    })
}

fn discovery_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "trendingChannels": {
                "type": "ARRAY",
                "description": "3-5 trending faceless AI channels from the data.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": string_field("Channel name."),
                        "subscriberCount": string_field("Subscribers, formatted like '123K' or '1.2M'."),
                        "subscriberGrowth": {
                            "type": "OBJECT",
                            "properties": {
                                "last7Days": string_field("Growth over 7 days."),
                                "last30Days": string_field("Growth over 30 days."),
                            },
                        },
                        "avgViews": string_field("Average views per video."),
                        "niche": string_field("Channel niche."),
                    },
                },
            },
            "viralVideos": {
                "type": "ARRAY",
                "description": "Most viral videos from the data.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": string_field("Video title."),
                        "channelName": string_field("Channel name."),
                        "views": string_field("Views, formatted."),
                        "vph": string_field("Views per hour, formatted."),
                        "viralIndex": { "type": "INTEGER", "description": "0-100." },
                        "uploadDate": string_field("Relative upload date."),
                    },
                },
            },
        },
        "required": ["trendingChannels", "viralVideos"],
    })
}
