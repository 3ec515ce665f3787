//! Application state shared by every handler.

use crate::services::file_lifecycle::FileLifecycleService;
use sharebox_core::Config;
use sharebox_processing::UploadValidator;
use std::path::PathBuf;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub files: FileLifecycleService,
    /// Where multipart bodies are buffered before the pipeline takes them over
    pub upload_temp_dir: PathBuf,
}

impl AppState {
    pub fn new(config: Config, files: FileLifecycleService) -> Self {
        let upload_temp_dir = config.upload_temp_dir().clone();
        Self {
            config,
            files,
            upload_temp_dir,
        }
    }

    pub fn validator(&self) -> &UploadValidator {
        self.files.orchestrator().validator()
    }
}
