//! Pattern matching against issued records.
//!
//! Two modes are tried in order:
//! - **remapped**: when per-cell colors are supplied, each scanned ink id is
//!   paired with a stored ink id by color, the scanned pattern is rewritten
//!   through that pairing and compared with the stored pattern,
//! - **exact**: the scanned ink ids are compared with the stored ones as-is.
//!
//! When neither mode finds a match, candidates agreeing on most cells are
//! reported as partial matches.

use crate::assignment::{assign, Assignment};
use crate::{MatchKind, MatchRecord, MatchResult, StoredPatternRecord};
use inkgrid_core::{rgb_distance, Rgb, MAX_RGB_DISTANCE};
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherParams {
    pub assignment: Assignment,
    /// Upper bound on reported exact matches, most recently issued first.
    pub max_exact_matches: usize,
    /// Minimum fraction of agreeing cells for a partial match.
    pub partial_match_min_agreement: f32,
    pub max_partial_matches: usize,
}

impl Default for MatcherParams {
    fn default() -> Self {
        Self {
            assignment: Assignment::Optimal,
            max_exact_matches: 10,
            partial_match_min_agreement: 0.85,
            max_partial_matches: 5,
        }
    }
}

/// Pairing of scanned inks with one candidate's stored inks.
#[derive(Clone, Debug, PartialEq)]
pub struct Remap {
    /// Scanned ink id → stored ink id.
    pub mapping: BTreeMap<u32, u32>,
    /// Mean RGB distance between paired colors.
    pub mean_distance: f32,
    /// Fraction of cells equal to the stored pattern after remapping.
    pub agreement: f32,
}

impl Remap {
    pub fn is_exact(&self) -> bool {
        self.agreement >= 1.0
    }

    /// `max(0, 1 - mean_distance / 442)`.
    pub fn confidence(&self) -> f32 {
        (1.0 - self.mean_distance / MAX_RGB_DISTANCE).max(0.0)
    }
}

/// Mean sampled color of every scanned ink id.
pub fn scanned_palette(pattern: &[u32], colors: &[Rgb]) -> BTreeMap<u32, Rgb> {
    let mut acc: BTreeMap<u32, ([u32; 3], u32)> = BTreeMap::new();
    for (&id, rgb) in pattern.iter().zip(colors) {
        let (sum, n) = acc.entry(id).or_insert(([0; 3], 0));
        for c in 0..3 {
            sum[c] += rgb[c] as u32;
        }
        *n += 1;
    }
    acc.into_iter()
        .map(|(id, (sum, n))| (id, sum.map(|v| ((v + n / 2) / n) as u8)))
        .collect()
}

/// Fraction of equal cells. Patterns of different length agree nowhere.
pub fn agreement(a: &[u32], b: &[u32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let same = a.iter().zip(b).filter(|(x, y)| x == y).count();
    same as f32 / a.len() as f32
}

/// Pair the scanned inks with `candidate`'s palette.
///
/// The tag may use only some inks of the palette. Returns `None` when the
/// candidate has no palette, when a scanned id has no palette entry, or when
/// the scan has more inks than the palette.
pub fn remap_candidate(
    pattern: &[u32],
    colors: &[Rgb],
    candidate: &StoredPatternRecord,
    method: Assignment,
) -> Option<Remap> {
    let palette = candidate.palette.as_ref()?;
    let scanned = scanned_palette(pattern, colors);
    if !scanned.keys().all(|id| palette.contains_key(id)) || scanned.len() > palette.len() {
        return None;
    }

    let targets: Vec<(u32, Rgb)> = palette.iter().map(|(&id, &rgb)| (id, rgb)).collect();
    let cost: Vec<Vec<f32>> = scanned
        .values()
        .map(|&s| targets.iter().map(|&(_, t)| rgb_distance(s, t)).collect())
        .collect();
    let pairs = assign(&cost, method)?;

    let mut mapping = BTreeMap::new();
    let mut total = 0.0;
    for ((&scanned_id, row), &col) in scanned.keys().zip(&cost).zip(&pairs) {
        mapping.insert(scanned_id, targets[col].0);
        total += row[col];
    }
    let mean_distance = total / pairs.len().max(1) as f32;

    let remapped: Vec<u32> = pattern
        .iter()
        .map(|id| mapping.get(id).copied().unwrap_or(*id))
        .collect();
    Some(Remap {
        agreement: agreement(&remapped, &candidate.pattern),
        mapping,
        mean_distance,
    })
}

#[derive(Clone, Debug, Default)]
pub struct PatternMatcher {
    params: MatcherParams,
}

impl PatternMatcher {
    pub fn new(params: MatcherParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MatcherParams {
        &self.params
    }

    /// Match `pattern` (and optionally its per-cell colors, row-major) against
    /// `candidates`. Candidates of another length are ignored.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, pattern, colors, candidates),
            fields(cells = pattern.len(), candidates = candidates.len())
        )
    )]
    pub fn match_pattern(
        &self,
        pattern: &[u32],
        colors: Option<&[Rgb]>,
        candidates: &[StoredPatternRecord],
    ) -> MatchResult {
        let candidates: Vec<&StoredPatternRecord> = candidates
            .iter()
            .filter(|c| c.pattern.len() == pattern.len())
            .collect();
        let colors = colors.filter(|c| {
            let usable = c.len() == pattern.len();
            if !usable {
                debug!("ignoring {} colors for {} cells", c.len(), pattern.len());
            }
            usable
        });

        let remaps: Vec<Option<Remap>> = match colors {
            Some(colors) => candidates
                .par_iter()
                .map(|c| remap_candidate(pattern, colors, c, self.params.assignment))
                .collect(),
            None => vec![None; candidates.len()],
        };

        if let Some(result) = self.best_remapped(&candidates, &remaps) {
            info!(
                "remapped match: record {:?} confidence {:.3}",
                result.matched_record_id, result.confidence
            );
            return result;
        }
        if let Some(result) = self.exact(pattern, &candidates) {
            info!("exact match: {} record(s)", result.matches.len());
            return result;
        }

        let partial_matches = self.partial(pattern, &candidates, &remaps);
        info!(
            "no match among {} candidates, {} partial",
            candidates.len(),
            partial_matches.len()
        );
        MatchResult {
            partial_matches,
            ..MatchResult::default()
        }
    }

    fn best_remapped(
        &self,
        candidates: &[&StoredPatternRecord],
        remaps: &[Option<Remap>],
    ) -> Option<MatchResult> {
        let mut best: Option<(&StoredPatternRecord, &Remap)> = None;
        for (cand, remap) in candidates.iter().zip(remaps) {
            let Some(remap) = remap.as_ref().filter(|r| r.is_exact()) else {
                continue;
            };
            if best.map_or(true, |(_, b)| remap.confidence() > b.confidence()) {
                best = Some((*cand, remap));
            }
        }
        let (record, remap) = best?;
        let confidence = remap.confidence();
        Some(MatchResult {
            found: true,
            matched_record_id: Some(record.id),
            confidence,
            kind: Some(MatchKind::Remapped),
            color_mapping: Some(remap.mapping.clone()),
            matches: vec![record.to_match_record(confidence)],
            partial_matches: Vec::new(),
        })
    }

    fn exact(&self, pattern: &[u32], candidates: &[&StoredPatternRecord]) -> Option<MatchResult> {
        let mut hits: Vec<&StoredPatternRecord> = candidates
            .iter()
            .copied()
            .filter(|c| c.pattern == pattern)
            .collect();
        hits.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        hits.truncate(self.params.max_exact_matches);
        let first = hits.first()?;
        Some(MatchResult {
            found: true,
            matched_record_id: Some(first.id),
            confidence: 1.0,
            kind: Some(MatchKind::Exact),
            color_mapping: None,
            matches: hits.iter().map(|r| r.to_match_record(1.0)).collect(),
            partial_matches: Vec::new(),
        })
    }

    fn partial(
        &self,
        pattern: &[u32],
        candidates: &[&StoredPatternRecord],
        remaps: &[Option<Remap>],
    ) -> Vec<MatchRecord> {
        let mut scored: Vec<(f32, &StoredPatternRecord)> = candidates
            .iter()
            .zip(remaps)
            .map(|(c, r)| {
                let score = match r {
                    Some(r) => r.agreement,
                    None => agreement(pattern, &c.pattern),
                };
                (score, *c)
            })
            .filter(|(score, _)| *score >= self.params.partial_match_min_agreement)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(self.params.max_partial_matches);
        scored
            .into_iter()
            .map(|(score, c)| c.to_match_record(score))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    const CYAN: Rgb = [0, 229, 255];
    const TEAL: Rgb = [0, 150, 136];

    fn record(id: u64, pattern: Vec<u32>, day: u32) -> StoredPatternRecord {
        let size = (pattern.len() as f64).sqrt() as usize;
        StoredPatternRecord {
            id,
            uuid: Some(format!("uuid-{id}")),
            pattern,
            size,
            palette: None,
            material_profile: None,
            input_text: format!("tag {id}"),
            algorithm: "standard".into(),
            issued_at: Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap(),
        }
    }

    fn with_palette(mut r: StoredPatternRecord, palette: &[(u32, Rgb)]) -> StoredPatternRecord {
        r.palette = Some(palette.iter().copied().collect());
        r
    }

    #[test]
    fn exact_matches_are_most_recent_first() {
        let p = vec![0, 1, 0, 1, 0, 1, 0, 1, 1];
        let cands = vec![
            record(1, p.clone(), 1),
            record(2, p.clone(), 5),
            record(3, vec![0; 9], 9),
        ];
        let res = PatternMatcher::default().match_pattern(&p, None, &cands);
        assert!(res.found);
        assert_eq!(res.kind, Some(MatchKind::Exact));
        assert_eq!(res.matched_record_id, Some(2));
        assert_eq!(res.confidence, 1.0);
        let ids: Vec<&str> = res.matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["uuid-2", "uuid-1"]);
    }

    #[test]
    fn exact_matches_are_capped() {
        let p = vec![1, 0, 1, 0, 1, 0, 1, 0, 0];
        let cands: Vec<_> = (1..=12).map(|d| record(d as u64, p.clone(), d)).collect();
        let res = PatternMatcher::default().match_pattern(&p, None, &cands);
        assert_eq!(res.matches.len(), 10);
        assert_eq!(res.matched_record_id, Some(12));
    }

    #[test]
    fn remap_swaps_ids_by_color() {
        // The scan numbered inks the other way round.
        let stored = with_palette(
            record(4, vec![0, 1, 1, 0, 1, 1, 0, 0, 1], 1),
            &[(0, CYAN), (1, TEAL)],
        );
        let scanned = vec![1, 0, 0, 1, 0, 0, 1, 1, 0];
        let colors: Vec<Rgb> = scanned
            .iter()
            .map(|&id| if id == 1 { CYAN } else { TEAL })
            .collect();
        let res = PatternMatcher::default().match_pattern(&scanned, Some(&colors), &[stored]);
        assert!(res.found);
        assert_eq!(res.kind, Some(MatchKind::Remapped));
        assert_relative_eq!(res.confidence, 1.0);
        let mapping = res.color_mapping.expect("mapping");
        assert_eq!(mapping[&0], 1);
        assert_eq!(mapping[&1], 0);
    }

    #[test]
    fn scan_with_more_inks_than_palette_is_not_remapped() {
        let stored = with_palette(
            record(5, vec![0, 1, 2, 0, 1, 2, 0, 1, 2], 1),
            &[(0, CYAN), (1, TEAL)],
        );
        let scanned = vec![0, 1, 2, 0, 1, 2, 0, 1, 2];
        let colors = vec![CYAN; 9];
        assert!(remap_candidate(&scanned, &colors, &stored, Assignment::Optimal).is_none());
    }

    #[test]
    fn scanned_id_without_palette_entry_is_not_remapped() {
        let stored = with_palette(
            record(9, vec![1, 2, 1, 2, 1, 2, 1, 2, 2], 1),
            &[(1, CYAN), (2, TEAL)],
        );
        let scanned = vec![0, 1, 0, 1, 0, 1, 0, 1, 1];
        let colors: Vec<Rgb> = scanned
            .iter()
            .map(|&id| if id == 0 { CYAN } else { TEAL })
            .collect();
        assert!(remap_candidate(&scanned, &colors, &stored, Assignment::Optimal).is_none());
    }

    #[test]
    fn near_misses_become_partial_matches() {
        let stored: Vec<u32> = (0..64).map(|i| (i % 3) as u32).collect();
        let mut scanned = stored.clone();
        for cell in [0, 9, 18, 27, 36] {
            scanned[cell] = (scanned[cell] + 1) % 3;
        }
        let far: Vec<u32> = (0..64).map(|i| (i % 2) as u32).collect();
        let cands = vec![record(6, far, 2), record(7, stored, 3)];
        let res = PatternMatcher::default().match_pattern(&scanned, None, &cands);
        assert!(!res.found);
        assert_eq!(res.confidence, 0.0);
        assert_eq!(res.partial_matches.len(), 1);
        assert_eq!(res.partial_matches[0].id, "uuid-7");
        assert_relative_eq!(res.partial_matches[0].confidence, 59.0 / 64.0);
    }

    #[test]
    fn nothing_matches_patterns_of_other_sizes() {
        let res = PatternMatcher::default().match_pattern(
            &[0, 1, 0, 1],
            None,
            &[record(8, vec![0, 1, 0, 1, 0, 1, 0, 1, 0], 1)],
        );
        assert_eq!(res, MatchResult::default());
    }
}
