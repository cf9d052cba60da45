//! Grid-size estimation strategies.
//!
//! Each strategy looks at the cropped tag and either proposes a size with a
//! confidence or declines. The detector ranks proposals by confidence, so the
//! confidence bands of the strategies decide which one wins:
//!
//! | strategy                    | band         |
//! |-----------------------------|--------------|
//! | color regions, dense        | `0.85..=1.0` |
//! | lines                       | `0.5..=0.8`  |
//! | color regions, sparse       | `0.2..=0.4`  |
//!
//! A sparse region count (few components or a small size) therefore defers
//! to the line strategy, and is still used when the line strategy declines.

mod lines;
mod region;

pub use lines::LineStrategy;
pub use region::ColorRegionStrategy;

use inkgrid_core::{GrayImage, RgbView};
use serde::{Deserialize, Serialize};

/// Cropped tag handed to every strategy.
#[derive(Clone, Debug)]
pub struct RoiInput<'a> {
    pub color: RgbView<'a>,
    pub gray: GrayImage,
}

impl<'a> RoiInput<'a> {
    pub fn new(color: RgbView<'a>) -> Self {
        let gray = color.to_gray();
        Self { color, gray }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.color.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.color.height()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    ColorRegions,
    Lines,
}

/// What a strategy measured on the way to its estimate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    ColorRegions {
        /// Components inside the plausible area band.
        component_count: usize,
        /// Rows found by grouping component centroids.
        row_count: usize,
    },
    Lines {
        /// Clustered horizontal line positions, ROI pixels.
        horizontal: Vec<f32>,
        /// Clustered vertical line positions, ROI pixels.
        vertical: Vec<f32>,
    },
}

/// One strategy's proposal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridEstimate {
    pub size: usize,
    pub confidence: f32,
    pub strategy: StrategyKind,
    pub evidence: Evidence,
}

pub trait GridStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Propose a grid size for `roi`, or `None` if the strategy found nothing
    /// to count.
    fn estimate(&self, roi: &RoiInput<'_>) -> Option<GridEstimate>;
}

/// Most confident estimate whose size lies in `min..=max`. Ties keep the
/// earlier estimate.
pub fn select_estimate(
    estimates: &[GridEstimate],
    min: usize,
    max: usize,
) -> Option<&GridEstimate> {
    estimates
        .iter()
        .filter(|e| (min..=max).contains(&e.size))
        .fold(None, |best: Option<&GridEstimate>, e| match best {
            Some(b) if b.confidence >= e.confidence => Some(b),
            _ => Some(e),
        })
}

/// Round `v` to the nearest integer and clamp it into `min..=max`.
pub(crate) fn round_clamp(v: f32, min: usize, max: usize) -> usize {
    if !v.is_finite() || v <= 0.0 {
        return min;
    }
    (v.round() as usize).clamp(min, max)
}

/// Group sorted values: a value further than `tol` from the first member of
/// the current group starts a new group. Returns group means.
pub(crate) fn cluster_sorted(values: &[f32], tol: f32) -> Vec<f32> {
    let mut out = Vec::new();
    let mut start = 0usize;
    for i in 1..=values.len() {
        if i == values.len() || values[i] - values[start] > tol {
            if i > start {
                let group = &values[start..i];
                out.push(group.iter().sum::<f32>() / group.len() as f32);
            }
            start = i;
        }
    }
    out
}
