use chrono::{DateTime, Utc};
use inkgrid_core::Rgb;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A pattern issued at some earlier time. Read-only during verification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredPatternRecord {
    pub id: u64,
    /// Public identifier; [`StoredPatternRecord::public_id`] falls back to `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Row-major ink ids.
    pub pattern: Vec<u32>,
    pub size: usize,
    /// Reference color of each stored ink id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<BTreeMap<u32, Rgb>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_profile: Option<String>,
    #[serde(default)]
    pub input_text: String,
    #[serde(default)]
    pub algorithm: String,
    pub issued_at: DateTime<Utc>,
}

impl StoredPatternRecord {
    pub fn public_id(&self) -> String {
        self.uuid.clone().unwrap_or_else(|| self.id.to_string())
    }

    pub fn to_match_record(&self, confidence: f32) -> MatchRecord {
        MatchRecord {
            id: self.public_id(),
            input_text: self.input_text.clone(),
            algorithm: self.algorithm.clone(),
            timestamp: self.issued_at,
            confidence,
        }
    }
}

/// Caller-facing summary of one matching record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: String,
    #[serde(rename = "inputText")]
    pub input_text: String,
    pub algorithm: String,
    pub timestamp: DateTime<Utc>,
    pub confidence: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Ink ids compared as-is.
    Exact,
    /// Ink ids compared after mapping scanned colors onto a stored palette.
    Remapped,
}

/// Outcome of matching one pattern against a candidate set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub found: bool,
    pub matched_record_id: Option<u64>,
    /// In `[0, 1]`; `0` when nothing matched.
    pub confidence: f32,
    pub kind: Option<MatchKind>,
    /// Scanned ink id → stored ink id, for remapped matches.
    pub color_mapping: Option<BTreeMap<u32, u32>>,
    pub matches: Vec<MatchRecord>,
    /// Near misses, best first. Never set `found`.
    pub partial_matches: Vec<MatchRecord>,
}

/// Audit entry written once per verification call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationLogRecord {
    pub pattern_input: Vec<u32>,
    pub algorithm: String,
    pub found: bool,
    pub matched_pattern_id: Option<u64>,
    pub confidence: Option<f32>,
    pub scanned_at: DateTime<Utc>,
    pub response_time_ms: u64,
}

impl VerificationLogRecord {
    pub fn from_result(
        pattern: &[u32],
        algorithm: &str,
        result: &MatchResult,
        scanned_at: DateTime<Utc>,
        response_time_ms: u64,
    ) -> Self {
        Self {
            pattern_input: pattern.to_vec(),
            algorithm: algorithm.to_string(),
            found: result.found,
            matched_pattern_id: result.matched_record_id,
            confidence: result.found.then_some(result.confidence),
            scanned_at,
            response_time_ms,
        }
    }
}
