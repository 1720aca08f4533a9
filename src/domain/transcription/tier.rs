//! Processing tier value object

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::InvalidTierError;

/// Processing tier selecting which pipeline and cost apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingTier {
    /// Fast transcript-only pass
    #[default]
    QuickScan,
    /// Full pipeline with downstream AI analysis
    AiAnalysis,
}

impl ProcessingTier {
    /// All supported tiers
    pub const ALL: [ProcessingTier; 2] = [Self::QuickScan, Self::AiAnalysis];

    /// Get the CLI-facing identifier
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::QuickScan => "quick-scan",
            Self::AiAnalysis => "ai-analysis",
        }
    }

    /// Get the identifier used on the Business Engine wire
    pub const fn wire_name(&self) -> &'static str {
        match self {
            Self::QuickScan => "QUICK_SCAN",
            Self::AiAnalysis => "AI_ANALYSIS",
        }
    }
}

impl fmt::Display for ProcessingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProcessingTier {
    type Err = InvalidTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "quick-scan" | "quickscan" | "quick" => Ok(Self::QuickScan),
            "ai-analysis" | "aianalysis" | "ai" => Ok(Self::AiAnalysis),
            _ => Err(InvalidTierError {
                input: s.to_string(),
            }),
        }
    }
}
