use inkgrid_core::KMeansParams;
use serde::{Deserialize, Serialize};

/// Tag outline search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiParams {
    /// Radius of the box blur applied before thresholding (`2` → 5×5).
    pub blur_radius: usize,
    /// Side of the adaptive threshold window, in pixels. Odd.
    pub threshold_block: usize,
    /// A pixel is foreground when it is at least this much darker than its
    /// local mean.
    pub threshold_offset: i32,
    /// Minimum area enclosed by the outline quadrilateral, in pixels.
    pub min_outline_area_px: f32,
    /// Minimum ratio between the outline quadrilateral area and its bounding box.
    pub min_quad_fill: f32,
    /// Minimum fraction of points on each quadrilateral side that lie on the
    /// component.
    pub min_edge_support: f32,
}

impl Default for RoiParams {
    fn default() -> Self {
        Self {
            blur_radius: 2,
            threshold_block: 11,
            threshold_offset: 2,
            min_outline_area_px: 1000.0,
            min_quad_fill: 0.45,
            min_edge_support: 0.6,
        }
    }
}

/// Grid-size estimation from color regions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionStrategyParams {
    pub kmeans: KMeansParams,
    /// Upper bound on the number of ROI pixels fed to k-means. Every pixel is
    /// still labelled against the fitted centers.
    pub max_fit_samples: usize,
    /// Components smaller than this fraction of the ROI are noise.
    pub min_area_frac: f32,
    /// Components larger than this fraction of the ROI are background.
    pub max_area_frac: f32,
    /// Below this many components the estimate is treated as unreliable.
    pub sparse_component_count: usize,
    /// Estimates below this size are treated as unreliable.
    pub sparse_min_size: usize,
    /// Vertical tolerance when grouping component centroids into rows.
    pub row_tolerance_px: f32,
}

impl Default for RegionStrategyParams {
    fn default() -> Self {
        Self {
            kmeans: KMeansParams::default(),
            max_fit_samples: 6000,
            min_area_frac: 0.005,
            max_area_frac: 0.5,
            sparse_component_count: 50,
            sparse_min_size: 6,
            row_tolerance_px: 15.0,
        }
    }
}

/// Grid-size estimation from straight lines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineStrategyParams {
    /// Sobel gradient magnitude above which a pixel is an edge.
    pub edge_threshold: f32,
    /// Minimum Hough votes for a line candidate.
    pub vote_threshold: u32,
    /// Hard cap on line candidates, strongest first.
    pub max_lines: usize,
    /// Minimum segment length as a fraction of the ROI width.
    pub min_length_frac: f32,
    /// Largest run of missing edge pixels bridged inside one segment.
    pub max_gap_px: usize,
    /// Segments within this many degrees of an axis are horizontal/vertical.
    pub angle_tolerance_deg: f32,
    /// Positions closer than `extent / cluster_divisor` collapse into one line.
    pub cluster_divisor: f32,
}

impl Default for LineStrategyParams {
    fn default() -> Self {
        Self {
            edge_threshold: 120.0,
            vote_threshold: 50,
            max_lines: 256,
            min_length_frac: 0.25,
            max_gap_px: 10,
            angle_tolerance_deg: 10.0,
            cluster_divisor: 16.0,
        }
    }
}

/// Grid detection as a whole.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParams {
    pub roi: RoiParams,
    pub region: RegionStrategyParams,
    pub lines: LineStrategyParams,
    /// Smallest plausible grid size.
    pub min_size: usize,
    /// Largest plausible grid size.
    pub max_size: usize,
    /// An estimate at or above this confidence is accepted without consulting
    /// later strategies.
    pub accept_confidence: f32,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            roi: RoiParams::default(),
            region: RegionStrategyParams::default(),
            lines: LineStrategyParams::default(),
            min_size: 3,
            max_size: 8,
            accept_confidence: 0.85,
        }
    }
}
