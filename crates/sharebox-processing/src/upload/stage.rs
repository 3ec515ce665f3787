use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

/// Where an upload is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Received,
    Validated,
    /// Non-video input going straight to the store.
    Direct,
    Probing,
    Transcoding,
    Uploading,
    Completed,
    Aborted,
}

impl UploadStage {
    /// Whether the pipeline may move from `self` to `next`.
    pub fn can_advance_to(self, next: UploadStage) -> bool {
        use UploadStage::*;
        match (self, next) {
            (Completed, _) | (Aborted, _) => false,
            (_, Aborted) => true,
            (Received, Validated) => true,
            (Validated, Direct) | (Validated, Probing) => true,
            (Probing, Transcoding) => true,
            (Direct, Uploading) | (Transcoding, Uploading) => true,
            (Uploading, Completed) => true,
            _ => false,
        }
    }
}

impl Display for UploadStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            UploadStage::Received => "received",
            UploadStage::Validated => "validated",
            UploadStage::Direct => "direct",
            UploadStage::Probing => "probing",
            UploadStage::Transcoding => "transcoding",
            UploadStage::Uploading => "uploading",
            UploadStage::Completed => "completed",
            UploadStage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Logs every stage transition of one upload.
#[derive(Debug)]
pub(crate) struct StageTracker {
    upload_id: Uuid,
    current: UploadStage,
}

impl StageTracker {
    pub fn new(upload_id: Uuid) -> Self {
        tracing::info!(upload_id = %upload_id, stage = %UploadStage::Received, "Upload received");
        Self {
            upload_id,
            current: UploadStage::Received,
        }
    }

    pub fn current(&self) -> UploadStage {
        self.current
    }

    pub fn advance(&mut self, next: UploadStage) {
        if !self.current.can_advance_to(next) {
            tracing::warn!(
                upload_id = %self.upload_id,
                from = %self.current,
                to = %next,
                "Unexpected upload stage transition"
            );
        }
        tracing::info!(
            upload_id = %self.upload_id,
            from = %self.current,
            to = %next,
            "Upload stage transition"
        );
        self.current = next;
    }
}
