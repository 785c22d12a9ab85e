use std::sync::mpsc;

use crate::types::{BatchEvent, EngineEvent, JobProgress, RequestId};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);

    fn progress(&self, progress: JobProgress) {
        self.emit(EngineEvent::Progress(progress));
    }

    fn batch(&self, request_id: RequestId, event: BatchEvent) {
        self.emit(EngineEvent::Batch { request_id, event });
    }
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}
