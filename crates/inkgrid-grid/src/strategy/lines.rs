use super::{
    cluster_sorted, round_clamp, Evidence, GridEstimate, GridStrategy, RoiInput, StrategyKind,
};
use crate::hough::{detect_lines, measure_segment, sobel_edges};
use crate::LineStrategyParams;
use log::debug;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Counts grid lines.
///
/// Axis-aligned segments are found with a Hough transform over the Sobel
/// edges of the ROI. Their positions are clustered per axis; the mean spacing
/// between clusters gives the cell size and therefore the grid size. When both
/// axes are usable the larger estimate wins.
#[derive(Clone, Debug)]
pub struct LineStrategy {
    params: LineStrategyParams,
    min_size: usize,
    max_size: usize,
}

struct AxisEstimate {
    size: usize,
    regularity: f32,
}

impl LineStrategy {
    pub fn new(params: LineStrategyParams, min_size: usize, max_size: usize) -> Self {
        Self {
            params,
            min_size,
            max_size,
        }
    }

    fn axis_estimate(&self, clusters: &[f32], extent: usize) -> Option<AxisEstimate> {
        if clusters.len() < 2 {
            return None;
        }
        let gaps: Vec<f32> = clusters.windows(2).map(|w| w[1] - w[0]).collect();
        let mean = gaps.iter().sum::<f32>() / gaps.len() as f32;
        if mean <= 0.0 {
            return None;
        }
        let var = gaps.iter().map(|g| (g - mean).powi(2)).sum::<f32>() / gaps.len() as f32;
        let cv = var.sqrt() / mean;

        Some(AxisEstimate {
            size: round_clamp(extent as f32 / mean, self.min_size, self.max_size),
            regularity: (1.0 - cv).clamp(0.0, 1.0),
        })
    }
}

impl GridStrategy for LineStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Lines
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, roi), fields(width = roi.width(), height = roi.height()))
    )]
    fn estimate(&self, roi: &RoiInput<'_>) -> Option<GridEstimate> {
        let p = &self.params;
        let (w, h) = (roi.width(), roi.height());

        let edges = sobel_edges(&roi.gray, p.edge_threshold);
        let lines = detect_lines(&edges, p.angle_tolerance_deg, p.vote_threshold, p.max_lines);
        let min_len = p.min_length_frac * w as f32;

        let mut horizontal = Vec::new();
        let mut vertical = Vec::new();
        for line in &lines {
            let Some(seg) = measure_segment(&edges, line, p.max_gap_px) else {
                continue;
            };
            if seg.length() < min_len {
                continue;
            }
            let angle = seg.angle_deg().abs();
            let mid = seg.midpoint();
            if angle < p.angle_tolerance_deg || (angle - 180.0).abs() < p.angle_tolerance_deg {
                horizontal.push(mid.y);
            } else if (angle - 90.0).abs() < p.angle_tolerance_deg {
                vertical.push(mid.x);
            }
        }

        horizontal.sort_by(f32::total_cmp);
        vertical.sort_by(f32::total_cmp);
        let divisor = p.cluster_divisor.max(1.0);
        let h_clusters = cluster_sorted(&horizontal, h as f32 / divisor);
        let v_clusters = cluster_sorted(&vertical, w as f32 / divisor);

        debug!(
            "lines: {} edge px, {} candidates, {} horizontal / {} vertical segments, clusters {}x{}",
            edges.count(),
            lines.len(),
            horizontal.len(),
            vertical.len(),
            h_clusters.len(),
            v_clusters.len()
        );

        let axes: Vec<AxisEstimate> = [
            self.axis_estimate(&h_clusters, h),
            self.axis_estimate(&v_clusters, w),
        ]
        .into_iter()
        .flatten()
        .collect();
        let size = axes.iter().map(|a| a.size).max()?;
        let regularity = axes.iter().map(|a| a.regularity).sum::<f32>() / axes.len() as f32;

        Some(GridEstimate {
            size,
            confidence: 0.5 + 0.3 * regularity,
            strategy: StrategyKind::Lines,
            evidence: Evidence::Lines {
                horizontal: h_clusters,
                vertical: v_clusters,
            },
        })
    }
}
