//! Request and response shapes exchanged with the transport layer.

use inkgrid_core::Rgb;
use inkgrid_grid::StrategyKind;
use inkgrid_match::{MatchKind, MatchRecord, MatchResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectPatternResponse {
    pub success: bool,
    pub grid_detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    /// `size × size` sampled RGB triples.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_colors: Option<Vec<Vec<Rgb>>>,
    /// Strategy that fixed the grid size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyKind>,
    pub message: String,
}

impl DetectPatternResponse {
    pub fn failure(grid_detected: bool, message: impl Into<String>) -> Self {
        Self {
            success: false,
            grid_detected,
            pattern: None,
            size: None,
            extracted_colors: None,
            strategy: None,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerifyRequest {
    /// Row-major ink ids.
    pub pattern: Vec<u32>,
    #[serde(default)]
    pub algorithm: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_colors: Option<Vec<Vec<Rgb>>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub found: bool,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MatchKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_mapping: Option<BTreeMap<u32, u32>>,
    pub matches: Vec<MatchRecord>,
    pub partial_matches: Vec<MatchRecord>,
}

impl From<MatchResult> for VerifyResponse {
    fn from(r: MatchResult) -> Self {
        Self {
            found: r.found,
            confidence: r.confidence,
            kind: r.kind,
            color_mapping: r.color_mapping,
            matches: r.matches,
            partial_matches: r.partial_matches,
        }
    }
}

/// Detection followed, when it succeeded, by verification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanResponse {
    pub detection: DetectPatternResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerifyResponse>,
}
