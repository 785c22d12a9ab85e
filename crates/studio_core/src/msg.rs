use crate::{JobSpec, Profile, RequestId, Stage, ToolKind, ToolResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User asked a tool to run with the given inputs.
    ToolRequested(JobSpec),
    /// User picked one of the follow-up prompts of the last SEO package.
    FollowUpRequested { index: usize },
    /// User abandoned whatever the tool is doing.
    CancelRequested(ToolKind),
    /// Engine progress for a request.
    JobProgress {
        request_id: RequestId,
        stage: Stage,
        polls: Option<u32>,
        item: Option<usize>,
    },
    BulkPromptsExtracted {
        request_id: RequestId,
        prompts: Vec<String>,
    },
    BulkItemStarted {
        request_id: RequestId,
        index: usize,
    },
    /// One batch image is available at `location`.
    BulkItemDone {
        request_id: RequestId,
        index: usize,
        location: String,
    },
    /// Engine completion for a request. Errors arrive already rendered.
    JobDone {
        request_id: RequestId,
        result: Result<ToolResult, String>,
    },
    /// Persisted session loaded at start-up.
    SessionRestored {
        profile: Option<Profile>,
        referral: Option<String>,
    },
    /// A referral link or bare code seen on entry.
    ReferralCaptured(String),
    SignedIn(Profile),
    SignedOut,
    /// UI/render tick to coalesce rendering.
    Tick,
    NoOp,
}
