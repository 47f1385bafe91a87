use std::path::PathBuf;

use tokio::fs::File;

use crate::pipeline::{LineSource, LineStream, PipelineError};

use super::lines::line_stream;

/// Replays raw meter output captured to a text file.
///
/// Every session starts from the top of the file and ends at end of file.
pub struct CaptureFileSource {
    path: PathBuf,
    name: String,
}

impl CaptureFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

#[async_trait::async_trait]
impl LineSource for CaptureFileSource {
    async fn open(&self) -> Result<LineStream, PipelineError> {
        let file = File::open(&self.path).await.map_err(|e| {
            PipelineError::Source(format!("failed to open capture file {}: {e}", self.name))
        })?;

        Ok(line_stream(file, None))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
