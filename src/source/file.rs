use super::reader::RecordReader;
use anyhow::Context;
use async_trait::async_trait;

/// Reads grade files and rosters from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileReader;

impl FileReader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RecordReader for FileReader {
    async fn read(&self, location: &str) -> anyhow::Result<Vec<u8>> {
        tokio::fs::read(location)
            .await
            .with_context(|| format!("failed to read '{location}'"))
    }
}
