//! Cell sampling and ink-ID classification.
//!
//! Takes the per-cell sample points produced by `inkgrid-grid` and turns
//! them into a row-major pattern of small integer ink ids. Ids carry no
//! absolute color meaning: they are numbered by first appearance, so two
//! photos of the same tag under different lighting read back the same
//! pattern.

mod classifier;
mod error;
mod params;
mod sampling;

pub use classifier::{Classification, ClusterQuality, InkClassifier, InkCluster};
pub use error::ClassifyError;
pub use params::{
    ClassifierParams, ColorVarietyRule, KSelection, PixelFilter, Rejection, SamplingParams,
};
pub use sampling::{sample_at, sample_cells, to_grid, window_radius, SampledColor};
