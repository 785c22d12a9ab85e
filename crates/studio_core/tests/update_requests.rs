use std::sync::Once;

use pretty_assertions::assert_eq;
use studio_core::{
    update, video_status_message, AppState, Effect, JobSpec, Msg, Stage, ToolKind, ToolResult,
    ToolStatus, HISTORY_LIMIT,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn image_job(prompt: &str) -> JobSpec {
    JobSpec::Images {
        prompt: prompt.to_string(),
        style: None,
        negative_prompt: None,
        count: 1,
        aspect_ratio: "1:1".to_string(),
    }
}

fn bulk_job() -> JobSpec {
    JobSpec::Bulk {
        script: "Scene one. Scene two.".to_string(),
        style: "cinematic".to_string(),
        aspect_ratio: "16:9".to_string(),
    }
}

fn run_id(effects: &[Effect]) -> u64 {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::Run { request_id, .. } => Some(*request_id),
            _ => None,
        })
        .expect("run effect")
}

#[test]
fn blank_input_sets_notice_without_effects() {
    init_logging();
    let (mut state, effects) = update(AppState::new(), Msg::ToolRequested(image_job("   ")));

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.notice.as_deref(), Some("Image generator needs a prompt"));
    assert_eq!(view.running, 0);
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());
}

#[test]
fn request_ids_increase_and_run_effect_carries_job() {
    init_logging();
    let (state, first) = update(AppState::new(), Msg::ToolRequested(image_job("a fox")));
    let (state, second) = update(
        state,
        Msg::ToolRequested(JobSpec::Script {
            topic: "foxes".to_string(),
        }),
    );

    assert_eq!(
        first,
        vec![Effect::Run {
            request_id: 1,
            job: image_job("a fox"),
        }]
    );
    assert_eq!(run_id(&second), 2);
    assert_eq!(state.view().running, 2);
}

#[test]
fn newer_request_cancels_and_outdates_the_older_one() {
    init_logging();
    let (state, first) = update(AppState::new(), Msg::ToolRequested(image_job("first")));
    let old = run_id(&first);
    let (state, second) = update(state, Msg::ToolRequested(image_job("second")));
    let new = run_id(&second);

    assert_eq!(second[0], Effect::Cancel { request_id: old });

    // The older request finishing late must not overwrite the newer result.
    let (state, _) = update(
        state,
        Msg::JobDone {
            request_id: old,
            result: Ok(ToolResult::Images(vec!["old.jpg".to_string()])),
        },
    );
    let view = state.view();
    let images = view.tool(ToolKind::Images).unwrap();
    assert_eq!(images.status, ToolStatus::Running);
    assert_eq!(images.result, None);
    assert!(view.history.is_empty());

    let (state, _) = update(
        state,
        Msg::JobDone {
            request_id: new,
            result: Ok(ToolResult::Images(vec!["new.jpg".to_string()])),
        },
    );
    let view = state.view();
    assert_eq!(view.tool(ToolKind::Images).unwrap().status, ToolStatus::Done);
    assert_eq!(view.history, vec!["new.jpg".to_string()]);
}

#[test]
fn finished_request_is_not_cancelled_by_the_next() {
    init_logging();
    let (state, first) = update(AppState::new(), Msg::ToolRequested(image_job("one")));
    let (state, _) = update(
        state,
        Msg::JobDone {
            request_id: run_id(&first),
            result: Err("quota".to_string()),
        },
    );
    let (_, effects) = update(state, Msg::ToolRequested(image_job("two")));
    assert_eq!(effects.len(), 1);
}

#[test]
fn cancel_requested_emits_cancel_and_drops_late_results() {
    init_logging();
    let video = JobSpec::Video {
        prompt: "sunrise".to_string(),
        seed_image: None,
        aspect_ratio: "16:9".to_string(),
    };
    let (state, effects) = update(AppState::new(), Msg::ToolRequested(video));
    let id = run_id(&effects);

    let (state, effects) = update(state, Msg::CancelRequested(ToolKind::Video));
    assert_eq!(effects, vec![Effect::Cancel { request_id: id }]);

    let (state, effects) = update(state, Msg::CancelRequested(ToolKind::Video));
    assert!(effects.is_empty());

    let (state, _) = update(
        state,
        Msg::JobDone {
            request_id: id,
            result: Ok(ToolResult::Media {
                location: "clip.mp4".to_string(),
                mime_type: "video/mp4".to_string(),
            }),
        },
    );
    let view = state.view();
    let tool = view.tool(ToolKind::Video).unwrap();
    assert_eq!(tool.status, ToolStatus::Failed);
    assert_eq!(tool.result, None);
    assert_eq!(view.running, 0);
}

#[test]
fn video_progress_rotates_status_message() {
    init_logging();
    let video = JobSpec::Video {
        prompt: "sunrise".to_string(),
        seed_image: None,
        aspect_ratio: "16:9".to_string(),
    };
    let (state, effects) = update(AppState::new(), Msg::ToolRequested(video));
    let id = run_id(&effects);

    let (state, _) = update(
        state,
        Msg::JobProgress {
            request_id: id,
            stage: Stage::Polling,
            polls: Some(3),
            item: None,
        },
    );
    let view = state.view();
    let tool = view.tool(ToolKind::Video).unwrap();
    assert_eq!(tool.stage, Stage::Polling);
    assert_eq!(tool.polls, Some(3));
    assert_eq!(tool.status_message.as_deref(), Some(video_status_message(3)));
    assert_ne!(video_status_message(3), video_status_message(4));
    assert_eq!(video_status_message(0), video_status_message(6));
}

#[test]
fn bulk_items_render_in_order_and_survive_failure() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::ToolRequested(bulk_job()));
    let id = run_id(&effects);

    let (state, _) = update(
        state,
        Msg::BulkPromptsExtracted {
            request_id: id,
            prompts: vec!["dawn".to_string(), "dusk".to_string()],
        },
    );
    let (state, _) = update(state, Msg::BulkItemStarted { request_id: id, index: 0 });
    assert_eq!(
        state.view().tool(ToolKind::Bulk).unwrap().bulk.generating,
        Some(0)
    );
    let (state, _) = update(
        state,
        Msg::BulkItemDone {
            request_id: id,
            index: 0,
            location: "dawn.jpg".to_string(),
        },
    );
    let (state, _) = update(state, Msg::BulkItemStarted { request_id: id, index: 1 });
    let (state, _) = update(
        state,
        Msg::JobDone {
            request_id: id,
            result: Err("generation failed on prompt 2".to_string()),
        },
    );

    let view = state.view();
    let bulk = view.tool(ToolKind::Bulk).unwrap();
    assert_eq!(bulk.status, ToolStatus::Failed);
    assert_eq!(bulk.bulk.generating, None);
    assert_eq!(bulk.bulk.items.len(), 1);
    assert_eq!(bulk.bulk.items[0].prompt, "dawn");
    assert_eq!(bulk.error.as_deref(), Some("generation failed on prompt 2"));
    assert_eq!(view.history, vec!["dawn.jpg".to_string()]);
}

#[test]
fn history_is_capped_and_newest_first() {
    init_logging();
    let mut state = AppState::new();
    for n in 0..(HISTORY_LIMIT + 3) {
        let (next, effects) = update(state, Msg::ToolRequested(image_job("again")));
        let (next, _) = update(
            next,
            Msg::JobDone {
                request_id: run_id(&effects),
                result: Ok(ToolResult::Images(vec![format!("{n}.jpg")])),
            },
        );
        state = next;
    }

    let history = state.view().history;
    assert_eq!(history.len(), HISTORY_LIMIT);
    assert_eq!(history[0], format!("{}.jpg", HISTORY_LIMIT + 2));
    assert_eq!(history[HISTORY_LIMIT - 1], "3.jpg");
}

#[test]
fn follow_up_prompt_runs_thumbnail_job() {
    init_logging();
    let seo = JobSpec::Seo(studio_core::SeoBrief {
        topic: "budget travel".to_string(),
        ..Default::default()
    });
    let (state, effects) = update(AppState::new(), Msg::ToolRequested(seo));
    let (state, _) = update(
        state,
        Msg::JobDone {
            request_id: run_id(&effects),
            result: Ok(ToolResult::Document {
                title: "SEO package".to_string(),
                sections: Vec::new(),
                follow_up_prompts: vec!["shocked face, passport".to_string()],
            }),
        },
    );

    let (state, effects) = update(state, Msg::FollowUpRequested { index: 0 });
    assert_eq!(
        effects,
        vec![Effect::Run {
            request_id: 2,
            job: JobSpec::Thumbnail {
                prompt: "shocked face, passport".to_string(),
            },
        }]
    );

    let (state, effects) = update(state, Msg::FollowUpRequested { index: 5 });
    assert!(effects.is_empty());
    assert!(state.view().notice.is_some());
}
