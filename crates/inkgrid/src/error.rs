use inkgrid_grid::GridError;
use inkgrid_ink::{ClassifyError, ColorVarietyRule};
use inkgrid_match::RegistryError;

/// A submitted pattern is malformed. Raised before any matching.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("pattern is empty")]
    Empty,

    #[error("pattern length {len} is not a square")]
    NotSquare { len: usize },

    #[error("grid size {size} is outside {min}..={max}")]
    SizeOutOfRange { size: usize, min: usize, max: usize },

    #[error("pattern uses {distinct} colors, at least {min} required")]
    TooFewColors { distinct: usize, min: usize },

    #[error("too many colors: pattern uses {distinct}, at most {max} allowed")]
    TooManyColors { distinct: usize, max: usize },

    #[error("extracted colors are {rows} rows, expected {size}x{size}")]
    ColorRows { rows: usize, size: usize },

    #[error("extracted colors row {row} has {cols} cells, expected {size}")]
    ColorCols {
        row: usize,
        cols: usize,
        size: usize,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum VerifyError {
    #[error("image could not be decoded: {0}")]
    ImageDecode(String),

    #[error("grid not detected: {0}")]
    GridNotDetected(#[from] GridError),

    #[error("insufficient color variety: {distinct} distinct inks, at least {min} required")]
    InsufficientColorVariety { distinct: usize, min: usize },

    #[error("poor image quality: {0}")]
    PoorImageQuality(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl VerifyError {
    /// Map a classifier failure onto the resubmission class. `rule` is the
    /// configured variety rule, reported when no ink was found at all.
    pub fn from_classify(err: ClassifyError, rule: &ColorVarietyRule) -> Self {
        match err {
            ClassifyError::NoSamples | ClassifyError::NoInkClusters => {
                VerifyError::InsufficientColorVariety {
                    distinct: 0,
                    min: rule.min_distinct,
                }
            }
            ClassifyError::ColorVariety { distinct, min, .. } if distinct < min => {
                VerifyError::InsufficientColorVariety { distinct, min }
            }
            other @ (ClassifyError::ColorVariety { .. } | ClassifyError::PoorSeparation { .. }) => {
                VerifyError::PoorImageQuality(other.to_string())
            }
        }
    }

    /// True when a new photo of the same tag may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VerifyError::GridNotDetected(_)
                | VerifyError::InsufficientColorVariety { .. }
                | VerifyError::PoorImageQuality(_)
        )
    }

    /// Text shown to the person holding the camera.
    pub fn user_message(&self) -> String {
        match self {
            VerifyError::ImageDecode(_) => "The uploaded file is not a readable image.".into(),
            VerifyError::GridNotDetected(_) => {
                "No tag grid was found. Photograph the whole tag, flat and in focus.".into()
            }
            VerifyError::InsufficientColorVariety { .. } => {
                "Not enough distinct ink colors were found. Retake the photo in even light.".into()
            }
            VerifyError::PoorImageQuality(_) => {
                "The ink colors could not be told apart reliably. Retake the photo.".into()
            }
            VerifyError::Validation(e) => format!("Invalid pattern: {e}."),
            VerifyError::Registry(_) => "The pattern registry is unavailable.".into(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("config JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
}
