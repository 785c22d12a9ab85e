//! Studio core: pure state machine and view-model helpers.
mod effect;
mod msg;
mod session;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use session::{referral_code, Profile};
pub use state::{
    video_status_message, AppState, JobSpec, RequestId, SeoBrief, Stage, ToolKind, ToolResult,
    HISTORY_LIMIT,
};
pub use update::update;
pub use view_model::{AppViewModel, BulkItemView, BulkView, SessionView, ToolStatus, ToolView};
