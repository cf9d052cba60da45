use inkgrid_core::{saturation, KMeansParams, Rgb};
use serde::{Deserialize, Serialize};

/// Why a color is not considered ink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    NearWhite,
    NearBlack,
    LowSaturation,
}

/// Background / grid-line rejection thresholds, shared by per-pixel sampling
/// and per-cluster validity checks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PixelFilter {
    /// Near-white when every channel is above this.
    pub white_min: u8,
    /// Near-black when every channel is below this.
    pub black_max: u8,
    /// Near-black when the channel sum is below this.
    pub min_sum: u16,
    /// Low saturation when `max - min` is below this.
    pub min_saturation: u8,
}

impl Default for PixelFilter {
    fn default() -> Self {
        Self {
            white_min: 200,
            black_max: 40,
            min_sum: 100,
            min_saturation: 50,
        }
    }
}

impl PixelFilter {
    pub fn rejection(&self, rgb: Rgb) -> Option<Rejection> {
        let min = rgb[0].min(rgb[1]).min(rgb[2]);
        let max = rgb[0].max(rgb[1]).max(rgb[2]);
        let sum: u16 = rgb.iter().map(|&c| c as u16).sum();
        if min > self.white_min {
            Some(Rejection::NearWhite)
        } else if max < self.black_max || sum < self.min_sum {
            Some(Rejection::NearBlack)
        } else if saturation(rgb) < self.min_saturation {
            Some(Rejection::LowSaturation)
        } else {
            None
        }
    }

    #[inline]
    pub fn is_ink(&self, rgb: Rgb) -> bool {
        self.rejection(rgb).is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    /// Half-size of the square window around each sample point.
    pub radius_px: usize,
    /// The window never exceeds this fraction of the smaller cell pitch.
    pub max_cell_fraction: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            radius_px: 5,
            max_cell_fraction: 0.25,
        }
    }
}

/// How many ink clusters to look for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KSelection {
    Fixed(usize),
    /// Try every `k` in `min..=max` and keep the one with the lowest
    /// intra/inter-cluster distance ratio.
    Auto {
        min: usize,
        max: usize,
    },
}

impl Default for KSelection {
    fn default() -> Self {
        KSelection::Fixed(3)
    }
}

/// Accepted range of distinct ink ids in a pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorVarietyRule {
    pub min_distinct: usize,
    pub max_distinct: usize,
}

impl Default for ColorVarietyRule {
    fn default() -> Self {
        Self {
            min_distinct: 2,
            max_distinct: 5,
        }
    }
}

impl ColorVarietyRule {
    #[inline]
    pub fn accepts(&self, distinct: usize) -> bool {
        (self.min_distinct..=self.max_distinct).contains(&distinct)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierParams {
    pub sampling: SamplingParams,
    pub filter: PixelFilter,
    pub k: KSelection,
    /// k-means settings; `kmeans.k` is overridden by [`ClassifierParams::k`].
    pub kmeans: KMeansParams,
    /// Clusters whose RGB centroids differ by less than this on every
    /// channel are merged.
    pub merge_tolerance: u8,
    /// Upper bound on the mean Lab distance from a cell to its cluster center.
    pub max_mean_intra_distance: f32,
    pub variety: ColorVarietyRule,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            sampling: SamplingParams::default(),
            filter: PixelFilter::default(),
            k: KSelection::default(),
            kmeans: KMeansParams::default(),
            merge_tolerance: 5,
            max_mean_intra_distance: 49.0,
            variety: ColorVarietyRule::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_classifies_background_and_ink() {
        let f = PixelFilter::default();
        assert_eq!(f.rejection([250, 248, 252]), Some(Rejection::NearWhite));
        assert_eq!(f.rejection([30, 35, 20]), Some(Rejection::NearBlack));
        assert_eq!(f.rejection([90, 5, 4]), Some(Rejection::NearBlack));
        assert_eq!(f.rejection([120, 130, 140]), Some(Rejection::LowSaturation));
        for ink in [
            [0, 229, 255],
            [0, 188, 212],
            [29, 233, 182],
            [0, 150, 136],
            [33, 150, 243],
        ] {
            assert!(f.is_ink(ink), "{ink:?}");
        }
    }

    #[test]
    fn variety_rule_bounds_are_inclusive() {
        let rule = ColorVarietyRule::default();
        assert!(!rule.accepts(1));
        assert!(rule.accepts(2));
        assert!(rule.accepts(5));
        assert!(!rule.accepts(6));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let p: ClassifierParams =
            serde_json::from_str(r#"{ "k": { "auto": { "min": 2, "max": 5 } } }"#).expect("json");
        assert_eq!(p.k, KSelection::Auto { min: 2, max: 5 });
        assert_eq!(p.merge_tolerance, 5);
        assert_eq!(p.filter, PixelFilter::default());
    }
}
