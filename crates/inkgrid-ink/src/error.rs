#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
    #[error("no cell samples to classify")]
    NoSamples,

    #[error("no ink cluster survived background filtering")]
    NoInkClusters,

    #[error("pattern uses {distinct} distinct inks, expected {min}..={max}")]
    ColorVariety {
        distinct: usize,
        min: usize,
        max: usize,
    },

    #[error("ink clusters are not separable (mean distance {mean_distance:.1} > {max:.1})")]
    PoorSeparation { mean_distance: f32, max: f32 },
}
