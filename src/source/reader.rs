use async_trait::async_trait;

/// Reads the raw bytes behind a location (a path, or any other key).
#[async_trait]
pub trait RecordReader: Send + Sync {
    async fn read(&self, location: &str) -> anyhow::Result<Vec<u8>>;
}
