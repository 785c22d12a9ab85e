use engine_logging::{engine_debug, engine_info};

use crate::{referral_code, AppState, Effect, JobSpec, Msg, RequestId};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::ToolRequested(job) => request(&mut state, job),
        Msg::FollowUpRequested { index } => match state.follow_up_prompt(index) {
            Some(prompt) => request(&mut state, JobSpec::Thumbnail { prompt }),
            None => {
                state.set_notice(format!("There is no follow-up prompt #{}", index + 1));
                Vec::new()
            }
        },
        Msg::CancelRequested(tool) => match state.abandon(tool) {
            Some(request_id) => vec![Effect::Cancel { request_id }],
            None => Vec::new(),
        },
        Msg::JobProgress {
            request_id,
            stage,
            polls,
            item,
        } => {
            let applied = state.apply_progress(request_id, stage, polls, item);
            ignore_stale(applied, request_id);
            Vec::new()
        }
        Msg::BulkPromptsExtracted {
            request_id,
            prompts,
        } => {
            let applied = state.apply_extracted(request_id, prompts);
            ignore_stale(applied, request_id);
            Vec::new()
        }
        Msg::BulkItemStarted { request_id, index } => {
            let applied = state.apply_item_started(request_id, index);
            ignore_stale(applied, request_id);
            Vec::new()
        }
        Msg::BulkItemDone {
            request_id,
            index,
            location,
        } => {
            let applied = state.apply_item_done(request_id, index, location);
            ignore_stale(applied, request_id);
            Vec::new()
        }
        Msg::JobDone { request_id, result } => {
            let applied = state.apply_done(request_id, result);
            ignore_stale(applied, request_id);
            Vec::new()
        }
        Msg::SessionRestored { profile, referral } => {
            state.set_profile(profile);
            state.set_referral(referral);
            Vec::new()
        }
        Msg::ReferralCaptured(input) => match referral_code(&input) {
            Some(code) => {
                state.set_referral(Some(code));
                vec![persist(&state)]
            }
            None => {
                state.set_notice("That link does not carry a referral code");
                Vec::new()
            }
        },
        Msg::SignedIn(profile) => {
            let mut effects = Vec::with_capacity(2);
            if let Some(referral) = state.referral().map(str::to_owned) {
                engine_info!(
                    "User {} signed in with referral code {}",
                    profile.email,
                    referral
                );
                effects.push(Effect::AttributeReferral {
                    email: profile.email.clone(),
                    referral,
                });
                state.set_referral(None);
            }
            state.set_profile(Some(profile));
            effects.push(persist(&state));
            effects
        }
        Msg::SignedOut => {
            if state.profile().is_some() {
                state.set_profile(None);
                vec![persist(&state)]
            } else {
                Vec::new()
            }
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn request(state: &mut AppState, job: JobSpec) -> Vec<Effect> {
    let tool = job.tool();
    let (field, value) = job.required_input();
    if value.trim().is_empty() {
        state.set_notice(format!("{} needs {}", tool.label(), field));
        return Vec::new();
    }

    let (request_id, superseded) = state.start_request(tool);
    let mut effects = Vec::with_capacity(2);
    if let Some(old) = superseded {
        engine_debug!("Request {} supersedes {} for {:?}", request_id, old, tool);
        effects.push(Effect::Cancel { request_id: old });
    }
    effects.push(Effect::Run { request_id, job });
    effects
}

fn persist(state: &AppState) -> Effect {
    Effect::PersistSession {
        profile: state.profile().cloned(),
        referral: state.referral().map(str::to_owned),
    }
}

fn ignore_stale(applied: bool, request_id: RequestId) {
    if !applied {
        engine_debug!("Ignoring result for stale request {}", request_id);
    }
}
