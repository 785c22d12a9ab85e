use std::collections::HashSet;

use studio_core::{AppViewModel, Stage, ToolResult, ToolStatus, ToolView};
use studio_engine::prepare_preview;

/// Prints each distinct line once, so repeated renders of an unchanged view
/// stay quiet.
#[derive(Default)]
pub(crate) struct Renderer {
    printed: HashSet<String>,
}

impl Renderer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn render(&mut self, view: &AppViewModel) -> Vec<String> {
        render(view)
            .into_iter()
            .filter(|line| self.printed.insert(line.clone()))
            .collect()
    }
}

pub(crate) fn render(view: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(notice) = &view.notice {
        lines.push(format!("! {notice}"));
    }
    for tool in &view.tools {
        render_tool(tool, &mut lines);
    }
    lines
}

fn render_tool(tool: &ToolView, lines: &mut Vec<String>) {
    let label = tool.tool.label();
    match tool.status {
        ToolStatus::Idle => {}
        ToolStatus::Running => {
            lines.push(format!("[{label}] {}", stage_text(tool)));
            if let Some(message) = &tool.status_message {
                lines.push(format!("[{label}] {message}"));
            }
        }
        ToolStatus::Done => {
            if let Some(result) = &tool.result {
                render_result(label, result, lines);
            }
        }
        ToolStatus::Failed => {
            lines.push(format!(
                "[{label}] failed: {}",
                tool.error.as_deref().unwrap_or("unknown error")
            ));
        }
    }
    for item in &tool.bulk.items {
        lines.push(format!(
            "[{label}] #{} {} -> {}",
            item.index + 1,
            item.prompt,
            item.location
        ));
    }
}

fn stage_text(tool: &ToolView) -> String {
    match (tool.stage, tool.polls, tool.bulk.generating) {
        (Stage::Polling, Some(polls), _) => format!("waiting for the result (check {polls})"),
        (Stage::Generating, _, Some(index)) if !tool.bulk.prompts.is_empty() => format!(
            "generating image {} of {}",
            index + 1,
            tool.bulk.prompts.len()
        ),
        (Stage::Extracting, _, _) => "reading the script".to_string(),
        (stage, _, _) => format!("{stage:?}").to_lowercase(),
    }
}

fn render_result(label: &str, result: &ToolResult, lines: &mut Vec<String>) {
    match result {
        ToolResult::Images(locations) => {
            for location in locations {
                lines.push(format!("[{label}] saved {location}"));
            }
        }
        ToolResult::Media {
            location,
            mime_type,
        } => lines.push(format!("[{label}] saved {location} ({mime_type})")),
        ToolResult::Text(text) => {
            lines.push(format!("[{label}]"));
            lines.push(prepare_preview(text));
        }
        ToolResult::Document {
            title,
            sections,
            follow_up_prompts,
        } => {
            lines.push(format!("[{label}] {title}"));
            for (heading, body) in sections {
                lines.push(format!("## {heading}\n{}", prepare_preview(body)));
            }
            if !follow_up_prompts.is_empty() {
                lines.push(format!(
                    "{} thumbnail prompt(s) available; rerun with --thumbnail N",
                    follow_up_prompts.len()
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_core::{update, AppState, JobSpec, Msg};

    fn running_video() -> AppState {
        let (state, _) = update(
            AppState::new(),
            Msg::ToolRequested(JobSpec::Video {
                prompt: "waves".to_string(),
                seed_image: None,
                aspect_ratio: "16:9".to_string(),
            }),
        );
        state
    }

    #[test]
    fn polling_progress_renders_count_and_message() {
        let (state, _) = update(
            running_video(),
            Msg::JobProgress {
                request_id: 1,
                stage: Stage::Polling,
                polls: Some(2),
                item: None,
            },
        );
        let lines = render(&state.view());
        assert!(lines.contains(&"[Video generator] waiting for the result (check 2)".to_string()));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn renderer_skips_lines_already_printed() {
        let state = running_video();
        let mut renderer = Renderer::new();
        assert!(!renderer.render(&state.view()).is_empty());
        assert!(renderer.render(&state.view()).is_empty());
    }

    #[test]
    fn failures_and_media_are_reported() {
        let (state, _) = update(
            running_video(),
            Msg::JobDone {
                request_id: 1,
                result: Ok(ToolResult::Media {
                    location: "out/videos/waves.mp4".to_string(),
                    mime_type: "video/mp4".to_string(),
                }),
            },
        );
        assert_eq!(
            render(&state.view()),
            vec!["[Video generator] saved out/videos/waves.mp4 (video/mp4)".to_string()]
        );

        let (state, _) = update(
            running_video(),
            Msg::JobDone {
                request_id: 1,
                result: Err("job failed: quota".to_string()),
            },
        );
        assert_eq!(
            render(&state.view()),
            vec!["[Video generator] failed: job failed: quota".to_string()]
        );
    }
}
