//! `ImageOcrProvider`: the text-extraction seam used by the Image entry node
//! (Image → MemoryExtraction → HITL → END). Real vision backends plug in behind this
//! trait; only a deterministic stub ships here.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("OCR failed: {0}")]
pub struct OcrError(pub String);

#[async_trait]
pub trait ImageOcrProvider: Send + Sync {
    /// Empty string is a valid, non-error result: if OCR finds nothing, only a
    /// `(no text found)` text event and `done` are emitted.
    async fn extract_text(&self, image_bytes: &[u8]) -> Result<String, OcrError>;
}

/// Returns a fixed string regardless of input, or empty bytes map to "" — used by tests
/// to drive both the populated and empty-OCR branches of the Image node.
pub struct StubOcrProvider {
    text: String,
}

impl StubOcrProvider {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn empty() -> Self {
        Self { text: String::new() }
    }
}

#[async_trait]
impl ImageOcrProvider for StubOcrProvider {
    async fn extract_text(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
        if image_bytes.is_empty() && self.text.is_empty() {
            return Ok(String::new());
        }
        Ok(self.text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_stub_returns_empty_string() {
        let provider = StubOcrProvider::empty();
        let text = provider.extract_text(b"irrelevant").await.unwrap();
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn populated_stub_returns_fixed_text() {
        let provider = StubOcrProvider::new("Meeting tomorrow 3pm with Bob");
        let text = provider.extract_text(b"bytes").await.unwrap();
        assert_eq!(text, "Meeting tomorrow 3pm with Bob");
    }
}
