//! Photo verification pipeline
//!
//! Stores an uploaded photo on shared storage, Brotli-compresses the stored
//! path and publishes it for the downstream face-verification consumer.
//! The outcome never feeds back into directory or token state.
//!
//! Author: hephaex@gmail.com

#[cfg(feature = "kafka")]
pub mod kafka;

#[cfg(feature = "kafka")]
pub use kafka::KafkaPublisher;

use async_trait::async_trait;
use keygate_core::{KeygateError, PhotoConfig, PhotoPublisher};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Brotli window size (log2)
const BROTLI_LGWIN: u32 = 22;
const BROTLI_BUFFER_SIZE: usize = 4096;

/// Photo pipeline errors
#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),

    #[error("Failed to store photo: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to publish photo: {0}")]
    Publish(#[from] KeygateError),
}

/// Reduce a client-supplied file name to its final path component
pub fn sanitize_file_name(raw: &str) -> Result<String, PhotoError> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(PhotoError::InvalidFileName(raw.to_string()));
    }

    Ok(name.to_string())
}

/// Brotli-compress a payload
pub fn compress(data: &[u8], quality: u32) -> Result<Vec<u8>, std::io::Error> {
    let mut writer =
        brotli::CompressorWriter::new(Vec::new(), BROTLI_BUFFER_SIZE, quality, BROTLI_LGWIN);
    writer.write_all(data)?;
    writer.flush()?;
    Ok(writer.into_inner())
}

/// Store-compress-publish pipeline
#[derive(Clone)]
pub struct PhotoPipeline {
    storage_dir: PathBuf,
    topic: String,
    quality: u32,
    publisher: Arc<dyn PhotoPublisher>,
}

impl PhotoPipeline {
    pub fn new(config: &PhotoConfig, publisher: Arc<dyn PhotoPublisher>) -> Self {
        Self {
            storage_dir: config.storage_dir.clone(),
            topic: config.topic.clone(),
            quality: config.compression_quality.min(11),
            publisher,
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Store a photo and publish its compressed path keyed by the submitter
    ///
    /// # Arguments
    /// * `submitter` - Name of the authenticated identity
    /// * `file_name` - Client-supplied file name
    /// * `content` - Raw photo bytes
    ///
    /// # Returns
    /// The path the photo was written to
    #[tracing::instrument(skip(self, content), fields(size = content.len()))]
    pub async fn submit(
        &self,
        submitter: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<PathBuf, PhotoError> {
        let file_name = sanitize_file_name(file_name)?;
        let path = self.storage_dir.join(&file_name);

        tokio::fs::write(&path, content).await?;

        let payload = compress(path.to_string_lossy().as_bytes(), self.quality)?;
        self.publisher
            .publish(&self.topic, submitter, payload)
            .await?;

        tracing::debug!(path = %path.display(), publisher = self.publisher.name(), "Photo published");
        Ok(path)
    }
}

/// Publisher that only logs, used when no broker is compiled in
#[derive(Debug, Default, Clone)]
pub struct LogPublisher;

#[async_trait]
impl PhotoPublisher for LogPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> keygate_core::Result<()> {
        tracing::info!(topic, key, bytes = payload.len(), "Photo message (log publisher)");
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// A message captured by [`RecordingPublisher`]
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
}

/// Publisher that keeps every message in memory
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    messages: std::sync::Mutex<Vec<PublishedMessage>>,
    fail: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "test-utils"))]
impl RecordingPublisher {
    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Make subsequent publishes fail (or succeed again)
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl PhotoPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> keygate_core::Result<()> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(KeygateError::PublishError("broker unavailable".to_string()));
        }

        if let Ok(mut messages) = self.messages.lock() {
            messages.push(PublishedMessage {
                topic: topic.to_string(),
                key: key.to_string(),
                payload,
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn decompress(data: &[u8]) -> String {
        let mut out = String::new();
        brotli::Decompressor::new(data, BROTLI_BUFFER_SIZE)
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    fn pipeline(dir: &Path, publisher: Arc<RecordingPublisher>) -> PhotoPipeline {
        let config = PhotoConfig {
            storage_dir: dir.to_path_buf(),
            topic: "faces".to_string(),
            ..Default::default()
        };
        PhotoPipeline::new(&config, publisher)
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("face.jpg").unwrap(), "face.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\me.png").unwrap(), "me.png");

        for bad in ["", "   ", ".", "..", "dir/", "a/.."] {
            assert!(
                matches!(sanitize_file_name(bad), Err(PhotoError::InvalidFileName(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_compress_is_decodable() {
        let compressed = compress(b"/usr/photos/face.jpg", 1).unwrap();
        assert_eq!(decompress(&compressed), "/usr/photos/face.jpg");
    }

    #[tokio::test]
    async fn test_submit_stores_and_publishes() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = Arc::new(RecordingPublisher::default());
        let pipeline = pipeline(dir.path(), publisher.clone());

        let path = pipeline
            .submit("alice", "nested/face.jpg", b"jpeg-bytes")
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("face.jpg"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"jpeg-bytes");

        let messages = publisher.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].topic, "faces");
        assert_eq!(messages[0].key, "alice");
        assert_eq!(decompress(&messages[0].payload), path.to_string_lossy());
    }

    #[tokio::test]
    async fn test_publish_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = Arc::new(RecordingPublisher::default());
        publisher.set_failing(true);
        let pipeline = pipeline(dir.path(), publisher.clone());

        let result = pipeline.submit("alice", "face.jpg", b"bytes").await;
        assert!(matches!(result, Err(PhotoError::Publish(_))));
        assert!(publisher.messages().is_empty());
    }

    #[tokio::test]
    async fn test_missing_storage_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = Arc::new(RecordingPublisher::default());
        let pipeline = pipeline(&dir.path().join("missing"), publisher.clone());

        let result = pipeline.submit("alice", "face.jpg", b"bytes").await;
        assert!(matches!(result, Err(PhotoError::Io(_))));
        assert!(publisher.messages().is_empty());
    }
}
