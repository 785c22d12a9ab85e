use std::collections::{BTreeMap, VecDeque};

use crate::view_model::{
    AppViewModel, BulkItemView, BulkView, SessionView, ToolStatus, ToolView,
};
use crate::Profile;

pub type RequestId = u64;

/// Generated images kept in the gallery, newest first.
pub const HISTORY_LIMIT: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToolKind {
    Images,
    Bulk,
    Video,
    Script,
    Rewrite,
    Seo,
    Speech,
    Discovery,
    Thumbnail,
}

impl ToolKind {
    pub const ALL: [ToolKind; 9] = [
        ToolKind::Images,
        ToolKind::Bulk,
        ToolKind::Video,
        ToolKind::Script,
        ToolKind::Rewrite,
        ToolKind::Seo,
        ToolKind::Speech,
        ToolKind::Discovery,
        ToolKind::Thumbnail,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ToolKind::Images => "Image generator",
            ToolKind::Bulk => "Bulk image generator",
            ToolKind::Video => "Video generator",
            ToolKind::Script => "Script writer",
            ToolKind::Rewrite => "Script rewriter",
            ToolKind::Seo => "SEO optimizer",
            ToolKind::Speech => "Text to speech",
            ToolKind::Discovery => "Channel discovery",
            ToolKind::Thumbnail => "Thumbnail generator",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Queued,
    Submitting,
    Polling,
    Downloading,
    Extracting,
    Generating,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeoBrief {
    pub topic: String,
    pub keywords: String,
    pub channel_link: String,
    pub business_email: String,
    pub target_audience: String,
    pub desired_emotion: String,
}

/// Validated user inputs for one tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSpec {
    Images {
        prompt: String,
        style: Option<String>,
        negative_prompt: Option<String>,
        count: u8,
        aspect_ratio: String,
    },
    Bulk {
        script: String,
        style: String,
        aspect_ratio: String,
    },
    Video {
        prompt: String,
        /// Local path of an optional starting frame.
        seed_image: Option<String>,
        aspect_ratio: String,
    },
    Script {
        topic: String,
    },
    Rewrite {
        script: String,
    },
    Seo(SeoBrief),
    Speech {
        text: String,
        voice: String,
    },
    Discovery {
        query: String,
    },
    Thumbnail {
        prompt: String,
    },
}

impl JobSpec {
    pub fn tool(&self) -> ToolKind {
        match self {
            JobSpec::Images { .. } => ToolKind::Images,
            JobSpec::Bulk { .. } => ToolKind::Bulk,
            JobSpec::Video { .. } => ToolKind::Video,
            JobSpec::Script { .. } => ToolKind::Script,
            JobSpec::Rewrite { .. } => ToolKind::Rewrite,
            JobSpec::Seo(_) => ToolKind::Seo,
            JobSpec::Speech { .. } => ToolKind::Speech,
            JobSpec::Discovery { .. } => ToolKind::Discovery,
            JobSpec::Thumbnail { .. } => ToolKind::Thumbnail,
        }
    }

    /// The input that must not be blank, with its user-facing name.
    pub(crate) fn required_input(&self) -> (&'static str, &str) {
        match self {
            JobSpec::Images { prompt, .. }
            | JobSpec::Video { prompt, .. }
            | JobSpec::Thumbnail { prompt } => ("a prompt", prompt),
            JobSpec::Bulk { script, .. } | JobSpec::Rewrite { script } => ("a script", script),
            JobSpec::Script { topic } => ("a topic", topic),
            JobSpec::Seo(brief) => ("a topic", &brief.topic),
            JobSpec::Speech { text, .. } => ("some text", text),
            JobSpec::Discovery { query } => ("a search query", query),
        }
    }
}

/// What a finished request produced, as the front end stored it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult {
    /// Locations of saved images, in generation order.
    Images(Vec<String>),
    Media {
        location: String,
        mime_type: String,
    },
    Text(String),
    Document {
        title: String,
        sections: Vec<(String, String)>,
        /// Prompts the user can run next, e.g. thumbnail concepts.
        follow_up_prompts: Vec<String>,
    },
}

const VIDEO_STATUS_MESSAGES: [&str; 6] = [
    "Warming up the virtual cameras...",
    "Arranging pixels with artistic care...",
    "Rendering the first shots, please be patient...",
    "Syncing motion and light...",
    "A masterpiece takes time, still working...",
    "Almost there, adding the final details...",
];

/// Status line for a running video job; advances with every status query.
pub fn video_status_message(polls: u32) -> &'static str {
    VIDEO_STATUS_MESSAGES[polls as usize % VIDEO_STATUS_MESSAGES.len()]
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ToolSlot {
    current: Option<RequestId>,
    running: bool,
    stage: Stage,
    polls: Option<u32>,
    result: Option<ToolResult>,
    error: Option<String>,
    bulk: BulkView,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    next_request_id: RequestId,
    slots: BTreeMap<ToolKind, ToolSlot>,
    history: VecDeque<String>,
    profile: Option<Profile>,
    referral: Option<String>,
    notice: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        let tools = self
            .slots
            .iter()
            .map(|(tool, slot)| ToolView {
                tool: *tool,
                request_id: slot.current,
                status: slot.status(),
                stage: slot.stage,
                polls: slot.polls,
                status_message: (*tool == ToolKind::Video && slot.running)
                    .then(|| video_status_message(slot.polls.unwrap_or(0)).to_string()),
                result: slot.result.clone(),
                error: slot.error.clone(),
                bulk: slot.bulk.clone(),
            })
            .collect();
        AppViewModel {
            tools,
            history: self.history.iter().cloned().collect(),
            session: SessionView {
                profile: self.profile.clone(),
                referral: self.referral.clone(),
            },
            notice: self.notice.clone(),
            running: self.running_count(),
            dirty: self.dirty,
        }
    }

    /// Returns whether a render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn running_count(&self) -> usize {
        self.slots.values().filter(|slot| slot.running).count()
    }

    pub fn is_running(&self, tool: ToolKind) -> bool {
        self.slots.get(&tool).is_some_and(|slot| slot.running)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
        self.mark_dirty();
    }

    /// Assigns a fresh id to `tool` and returns it with the id it replaces, if
    /// that one was still running.
    pub(crate) fn start_request(&mut self, tool: ToolKind) -> (RequestId, Option<RequestId>) {
        self.next_request_id += 1;
        let request_id = self.next_request_id;
        let slot = self.slots.entry(tool).or_default();
        let superseded = slot.current.filter(|_| slot.running);
        *slot = ToolSlot {
            current: Some(request_id),
            running: true,
            ..ToolSlot::default()
        };
        self.notice = None;
        self.mark_dirty();
        (request_id, superseded)
    }

    /// Stops tracking the tool's running request and returns its id.
    pub(crate) fn abandon(&mut self, tool: ToolKind) -> Option<RequestId> {
        let slot = self.slots.get_mut(&tool).filter(|slot| slot.running)?;
        let request_id = slot.current.take();
        slot.running = false;
        slot.bulk.generating = None;
        slot.error = Some("Cancelled".to_string());
        self.mark_dirty();
        request_id
    }

    /// Slot of the running request `request_id`; `None` when it is stale.
    fn live_slot(&mut self, request_id: RequestId) -> Option<(ToolKind, &mut ToolSlot)> {
        self.slots
            .iter_mut()
            .find(|(_, slot)| slot.running && slot.current == Some(request_id))
            .map(|(tool, slot)| (*tool, slot))
    }

    pub(crate) fn apply_progress(
        &mut self,
        request_id: RequestId,
        stage: Stage,
        polls: Option<u32>,
        item: Option<usize>,
    ) -> bool {
        let Some((_, slot)) = self.live_slot(request_id) else {
            return false;
        };
        slot.stage = stage;
        if polls.is_some() {
            slot.polls = polls;
        }
        if item.is_some() {
            slot.bulk.generating = item;
        }
        self.mark_dirty();
        true
    }

    pub(crate) fn apply_extracted(&mut self, request_id: RequestId, prompts: Vec<String>) -> bool {
        let Some((_, slot)) = self.live_slot(request_id) else {
            return false;
        };
        slot.bulk.prompts = prompts;
        self.mark_dirty();
        true
    }

    pub(crate) fn apply_item_started(&mut self, request_id: RequestId, index: usize) -> bool {
        let Some((_, slot)) = self.live_slot(request_id) else {
            return false;
        };
        slot.bulk.generating = Some(index);
        self.mark_dirty();
        true
    }

    pub(crate) fn apply_item_done(
        &mut self,
        request_id: RequestId,
        index: usize,
        location: String,
    ) -> bool {
        let Some((_, slot)) = self.live_slot(request_id) else {
            return false;
        };
        let prompt = slot.bulk.prompts.get(index).cloned().unwrap_or_default();
        slot.bulk.items.push(BulkItemView {
            index,
            prompt,
            location: location.clone(),
        });
        if slot.bulk.generating == Some(index) {
            slot.bulk.generating = None;
        }
        self.push_history(location);
        self.mark_dirty();
        true
    }

    pub(crate) fn apply_done(
        &mut self,
        request_id: RequestId,
        result: Result<ToolResult, String>,
    ) -> bool {
        let Some((tool, slot)) = self.live_slot(request_id) else {
            return false;
        };
        slot.running = false;
        slot.bulk.generating = None;
        let mut gallery = Vec::new();
        match result {
            Ok(result) => {
                slot.stage = Stage::Done;
                if let (ToolKind::Images | ToolKind::Thumbnail, ToolResult::Images(locations)) =
                    (tool, &result)
                {
                    gallery = locations.clone();
                }
                slot.result = Some(result);
                slot.error = None;
            }
            Err(message) => {
                // Bulk keeps the images rendered before the failure.
                slot.error = Some(message);
            }
        }
        for location in gallery {
            self.push_history(location);
        }
        self.mark_dirty();
        true
    }

    pub(crate) fn follow_up_prompt(&self, index: usize) -> Option<String> {
        match self.slots.get(&ToolKind::Seo)?.result.as_ref()? {
            ToolResult::Document {
                follow_up_prompts, ..
            } => follow_up_prompts.get(index).cloned(),
            _ => None,
        }
    }

    fn push_history(&mut self, location: String) {
        self.history.push_front(location);
        self.history.truncate(HISTORY_LIMIT);
    }

    pub(crate) fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub(crate) fn referral(&self) -> Option<&str> {
        self.referral.as_deref()
    }

    pub(crate) fn set_profile(&mut self, profile: Option<Profile>) {
        self.profile = profile;
        self.mark_dirty();
    }

    pub(crate) fn set_referral(&mut self, referral: Option<String>) {
        self.referral = referral;
        self.mark_dirty();
    }
}

impl ToolSlot {
    fn status(&self) -> ToolStatus {
        if self.running {
            ToolStatus::Running
        } else if self.error.is_some() {
            ToolStatus::Failed
        } else if self.result.is_some() {
            ToolStatus::Done
        } else {
            ToolStatus::Idle
        }
    }
}
