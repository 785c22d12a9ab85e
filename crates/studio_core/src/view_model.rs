use crate::{Profile, RequestId, Stage, ToolKind, ToolResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatus {
    Idle,
    Running,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BulkItemView {
    pub index: usize,
    pub prompt: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BulkView {
    /// Prompts extracted from the script, in script order.
    pub prompts: Vec<String>,
    pub generating: Option<usize>,
    pub items: Vec<BulkItemView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolView {
    pub tool: ToolKind,
    pub request_id: Option<RequestId>,
    pub status: ToolStatus,
    pub stage: Stage,
    pub polls: Option<u32>,
    pub status_message: Option<String>,
    pub result: Option<ToolResult>,
    pub error: Option<String>,
    pub bulk: BulkView,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionView {
    pub profile: Option<Profile>,
    pub referral: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    /// Tools that have been used at least once.
    pub tools: Vec<ToolView>,
    /// Image locations, newest first.
    pub history: Vec<String>,
    pub session: SessionView,
    pub notice: Option<String>,
    pub running: usize,
    pub dirty: bool,
}

impl AppViewModel {
    pub fn tool(&self, tool: ToolKind) -> Option<&ToolView> {
        self.tools.iter().find(|view| view.tool == tool)
    }
}
