//! Transcription domain types

pub mod result;
pub mod tier;
pub mod video_url;

pub use result::TranscriptResult;
pub use tier::ProcessingTier;
pub use video_url::VideoUrl;
