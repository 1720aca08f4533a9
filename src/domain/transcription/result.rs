//! Transcript result value object

use serde::{Deserialize, Serialize};

/// The product of a completed transcription job.
///
/// `confidence` and `language` are only present when the engine reports
/// them; a transcript with neither is a degraded but still successful
/// result (see DESIGN.md on partial success).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    pub transcript: String,
    pub confidence: Option<f32>,
    pub language: Option<String>,
}

impl TranscriptResult {
    /// Create a result with transcript text only
    pub fn text_only(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            confidence: None,
            language: None,
        }
    }

    /// Whether the engine reported quality metadata alongside the text
    pub fn is_degraded(&self) -> bool {
        self.confidence.is_none() && self.language.is_none()
    }
}
