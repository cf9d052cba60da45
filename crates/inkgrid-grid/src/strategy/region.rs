use super::{
    cluster_sorted, round_clamp, Evidence, GridEstimate, GridStrategy, RoiInput, StrategyKind,
};
use crate::components::{label_components, Connectivity};
use crate::RegionStrategyParams;
use inkgrid_core::{kmeans, nearest_center, rgb_to_lab, Rgb};
use log::debug;
use std::collections::HashMap;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Counts same-color regions.
///
/// ROI pixels are clustered in Lab, labelled, cleaned with a 3×3 majority
/// filter and split into 4-connected components. An `N×N` grid of separated
/// cells yields about `N²` components in the plausible area band, so the size
/// is `round(√count)`.
#[derive(Clone, Debug)]
pub struct ColorRegionStrategy {
    params: RegionStrategyParams,
    min_size: usize,
    max_size: usize,
}

impl ColorRegionStrategy {
    pub fn new(params: RegionStrategyParams, min_size: usize, max_size: usize) -> Self {
        Self {
            params,
            min_size,
            max_size,
        }
    }

    /// Confidence for a region estimate. Sparse counts land below every line
    /// estimate, dense ones above.
    /// Component areas within `[min_area_frac, max_area_frac]` of the ROI,
    /// bounds included, count as cells.
    pub(crate) fn plausible_area(&self, area: usize, total: usize) -> bool {
        let frac = area as f32 / total as f32;
        frac >= self.params.min_area_frac && frac <= self.params.max_area_frac
    }

    pub(crate) fn confidence(&self, count: usize, size: usize, row_agreement: f32) -> f32 {
        let agreement = row_agreement.clamp(0.0, 1.0);
        let sparse =
            count < self.params.sparse_component_count || size < self.params.sparse_min_size;
        if sparse {
            0.2 + 0.2 * agreement
        } else {
            0.85 + 0.15 * agreement
        }
    }
}

/// Replace a label with the label held by at least five of its 3×3
/// neighbourhood (itself included), if there is one.
fn majority_filter(labels: &[u32], k: usize, width: usize, height: usize) -> Vec<u32> {
    let mut out = labels.to_vec();
    let mut counts = vec![0u8; k];
    for y in 0..height {
        for x in 0..width {
            counts.iter_mut().for_each(|c| *c = 0);
            for ny in y.saturating_sub(1)..(y + 2).min(height) {
                for nx in x.saturating_sub(1)..(x + 2).min(width) {
                    counts[labels[ny * width + nx] as usize] += 1;
                }
            }
            if let Some((label, _)) = counts.iter().enumerate().find(|&(_, &c)| c >= 5) {
                out[y * width + x] = label as u32;
            }
        }
    }
    out
}

impl GridStrategy for ColorRegionStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ColorRegions
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, roi), fields(width = roi.width(), height = roi.height()))
    )]
    fn estimate(&self, roi: &RoiInput<'_>) -> Option<GridEstimate> {
        let (w, h) = (roi.width(), roi.height());
        let total = w * h;
        if total == 0 {
            return None;
        }

        let mut cache: HashMap<Rgb, [f32; 3]> = HashMap::new();
        let labs: Vec<[f32; 3]> = roi
            .color
            .pixels()
            .map(|p| *cache.entry(p).or_insert_with(|| rgb_to_lab(p).to_array()))
            .collect();

        let stride = total.div_ceil(self.params.max_fit_samples.max(1));
        let fit: Vec<[f32; 3]> = labs.iter().step_by(stride).copied().collect();
        let km = kmeans(&fit, &self.params.kmeans)?;

        let raw: Vec<u32> = labs
            .iter()
            .map(|p| nearest_center(p, &km.centers).0 as u32)
            .collect();
        let labels = majority_filter(&raw, km.k(), w, h);

        let comps = label_components(w, h, Connectivity::Four, |i| Some(labels[i]));
        let valid: Vec<_> = comps
            .iter()
            .filter(|c| self.plausible_area(c.area, total))
            .collect();

        debug!(
            "color regions: k={} components={} valid={}",
            km.k(),
            comps.len(),
            valid.len()
        );
        if valid.is_empty() {
            return None;
        }

        let count = valid.len();
        let size = round_clamp((count as f32).sqrt(), self.min_size, self.max_size);

        let mut ys: Vec<f32> = valid.iter().map(|c| c.centroid().1).collect();
        ys.sort_by(f32::total_cmp);
        let rows = cluster_sorted(&ys, self.params.row_tolerance_px).len();
        let agreement = 1.0 - (rows as f32 - size as f32).abs() / size as f32;

        Some(GridEstimate {
            size,
            confidence: self.confidence(count, size, agreement),
            strategy: StrategyKind::ColorRegions,
            evidence: Evidence::ColorRegions {
                component_count: count,
                row_count: rows,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkgrid_core::synth::{render_tag, TagStyle};
    use inkgrid_core::PixelRect;

    const A: Rgb = [0, 188, 212];
    const B: Rgb = [33, 150, 243];

    fn strategy() -> ColorRegionStrategy {
        ColorRegionStrategy::new(RegionStrategyParams::default(), 3, 8)
    }

    fn tag_only(style: &TagStyle, size: usize) -> PixelRect {
        PixelRect::new(
            style.margin_px,
            style.margin_px,
            style.tag_side(size),
            style.tag_side(size),
        )
    }

    #[test]
    fn checkerboard_counts_every_cell() {
        let style = TagStyle {
            line_px: 1,
            ..TagStyle::default()
        };
        let pattern: Vec<u32> = (0..64).map(|i| ((i / 8 + i % 8) % 2) as u32).collect();
        let img = render_tag(&pattern, 8, &[A, B], &style).expect("img");
        let view = img.crop(tag_only(&style, 8)).expect("crop");

        let est = strategy().estimate(&RoiInput::new(view)).expect("estimate");
        assert_eq!(est.size, 8);
        assert!(est.confidence >= 0.85, "{est:?}");
        match est.evidence {
            Evidence::ColorRegions {
                component_count, ..
            } => assert!(component_count >= 64, "{component_count}"),
            other => panic!("unexpected evidence {other:?}"),
        }
    }

    #[test]
    fn small_grid_is_low_confidence() {
        let style = TagStyle::default();
        let pattern = [0, 1, 0, 1, 0, 1, 0, 1, 0];
        let img = render_tag(&pattern, 3, &[A, B], &style).expect("img");
        let view = img.crop(tag_only(&style, 3)).expect("crop");

        let est = strategy().estimate(&RoiInput::new(view)).expect("estimate");
        assert_eq!(est.size, 3);
        assert!(est.confidence < 0.5, "{est:?}");
    }

    #[test]
    fn area_band_keeps_its_bounds() {
        let s = strategy();
        assert!(s.plausible_area(5, 1000));
        assert!(s.plausible_area(500, 1000));
        assert!(!s.plausible_area(4, 1000));
        assert!(!s.plausible_area(501, 1000));
    }

    #[test]
    fn sparse_counts_sit_below_line_band() {
        let s = strategy();
        assert!(s.confidence(20, 4, 1.0) < 0.5);
        assert!(s.confidence(64, 5, 1.0) < 0.5);
        assert!(s.confidence(64, 8, 0.0) > 0.8);
    }

    #[test]
    fn majority_filter_erases_thin_lines() {
        // 5×5: a one-pixel line of label 2 between two label-0 blocks.
        let mut labels = vec![0u32; 25];
        for x in 0..5 {
            labels[2 * 5 + x] = 2;
        }
        let out = majority_filter(&labels, 3, 5, 5);
        // Border pixels see too few neighbours to be outvoted.
        assert_eq!(&out[10..15], &[2, 0, 0, 0, 2]);
        assert!(out[..10].iter().chain(&out[15..]).all(|&l| l == 0));
    }
}
