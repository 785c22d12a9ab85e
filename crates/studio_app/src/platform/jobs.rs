//! Translation between core request specs and engine jobs and outputs.
use std::fs;
use std::path::Path;

use studio_core::{JobSpec, SeoBrief, Stage, ToolResult};
use studio_engine::{
    thumbnail_prompt, AspectRatio, DiscoveryReport, ScriptDraft, SeedImage, SeoInputs, SeoPackage,
    SpeechRequest, ToolJob, VideoRequest,
};

/// Thumbnails are always rendered widescreen.
const THUMBNAIL_ASPECT: AspectRatio = AspectRatio::Landscape;

pub(crate) fn to_tool_job(spec: JobSpec) -> Result<ToolJob, String> {
    let job = match spec {
        JobSpec::Images {
            prompt,
            style,
            negative_prompt,
            count,
            aspect_ratio,
        } => ToolJob::Images {
            prompt,
            style,
            negative_prompt,
            count,
            aspect_ratio: aspect_ratio.parse()?,
        },
        JobSpec::Bulk {
            script,
            style,
            aspect_ratio,
        } => ToolJob::Bulk {
            script,
            style,
            aspect_ratio: aspect_ratio.parse()?,
        },
        JobSpec::Video {
            prompt,
            seed_image,
            aspect_ratio,
        } => ToolJob::Video(VideoRequest {
            prompt,
            seed_image: seed_image.as_deref().map(read_seed_image).transpose()?,
            aspect_ratio: aspect_ratio.parse()?,
        }),
        JobSpec::Script { topic } => ToolJob::Script { topic },
        JobSpec::Rewrite { script } => ToolJob::Rewrite { script },
        JobSpec::Seo(brief) => ToolJob::Seo(seo_inputs(&brief)),
        JobSpec::Speech { text, voice } => ToolJob::Speech(SpeechRequest { text, voice }),
        JobSpec::Discovery { query } => ToolJob::Discovery { query },
        JobSpec::Thumbnail { prompt } => ToolJob::Images {
            prompt,
            style: None,
            negative_prompt: None,
            count: 1,
            aspect_ratio: THUMBNAIL_ASPECT,
        },
    };
    Ok(job)
}

pub(crate) fn seo_inputs(brief: &SeoBrief) -> SeoInputs {
    SeoInputs {
        topic: brief.topic.clone(),
        keywords: brief.keywords.clone(),
        channel_link: brief.channel_link.clone(),
        business_email: brief.business_email.clone(),
        target_audience: brief.target_audience.clone(),
        desired_emotion: brief.desired_emotion.clone(),
    }
}

fn read_seed_image(path: &str) -> Result<SeedImage, String> {
    let mime_type = match Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => return Err(format!("{path}: starting frame must be png, jpeg or webp")),
    };
    let bytes = fs::read(path).map_err(|err| format!("{path}: {err}"))?;
    Ok(SeedImage {
        bytes,
        mime_type: mime_type.to_string(),
    })
}

pub(crate) fn map_stage(stage: studio_engine::Stage) -> Stage {
    match stage {
        studio_engine::Stage::Queued => Stage::Queued,
        studio_engine::Stage::Submitting => Stage::Submitting,
        studio_engine::Stage::Polling => Stage::Polling,
        studio_engine::Stage::Downloading => Stage::Downloading,
        studio_engine::Stage::Extracting => Stage::Extracting,
        studio_engine::Stage::Generating => Stage::Generating,
        studio_engine::Stage::Done => Stage::Done,
    }
}

pub(crate) fn script_document(draft: ScriptDraft) -> ToolResult {
    let mut sections = vec![
        ("Hook".to_string(), draft.hook),
        ("Introduction".to_string(), draft.introduction),
    ];
    sections.extend(
        draft
            .main_points
            .into_iter()
            .map(|point| (point.heading, point.details)),
    );
    sections.push(("Conclusion".to_string(), draft.conclusion));
    sections.push(("Call to action".to_string(), draft.call_to_action));
    ToolResult::Document {
        title: draft.title,
        sections,
        follow_up_prompts: Vec::new(),
    }
}

/// The thumbnail concepts become ready-to-run image prompts.
pub(crate) fn seo_document(package: SeoPackage, inputs: Option<&SeoInputs>) -> ToolResult {
    let follow_up_prompts = match inputs {
        Some(inputs) => package
            .thumbnails
            .iter()
            .map(|concept| thumbnail_prompt(inputs, concept))
            .collect(),
        None => Vec::new(),
    };
    let mut sections = vec![
        ("Titles".to_string(), numbered(&package.titles)),
        ("Description".to_string(), package.description),
        ("Tags".to_string(), package.tags.join(", ")),
    ];
    for (n, concept) in package.thumbnails.iter().enumerate() {
        sections.push((
            format!("Thumbnail {}", n + 1),
            format!(
                "{}\nExpression: {}\nObjects: {}\nColors: {}",
                concept.concept_description,
                concept.facial_expression,
                concept.objects.join(", "),
                concept.color_pairs.join(", ")
            ),
        ));
    }
    ToolResult::Document {
        title: "SEO package".to_string(),
        sections,
        follow_up_prompts,
    }
}

pub(crate) fn discovery_document(query: &str, report: DiscoveryReport) -> ToolResult {
    let mut sections = Vec::new();
    for channel in report.trending_channels {
        sections.push((
            channel.name,
            format!(
                "{} subscribers ({} in 7 days, {} in 30 days), {} average views, niche: {}",
                channel.subscriber_count,
                channel.subscriber_growth.last_7_days,
                channel.subscriber_growth.last_30_days,
                channel.avg_views,
                channel.niche
            ),
        ));
    }
    for video in report.viral_videos {
        sections.push((
            video.title,
            format!(
                "{}: {} views, {} views/hour, viral index {}, uploaded {}",
                video.channel_name,
                video.views,
                video.vph,
                video.viral_index,
                video.upload_date
            ),
        ));
    }
    ToolResult::Document {
        title: format!("Channel discovery: {query}"),
        sections,
        follow_up_prompts: Vec::new(),
    }
}

fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(n, item)| format!("{}. {}", n + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}
