//! sRGB ⇄ CIELAB conversion and color distances.
//!
//! Conversion follows sRGB → linear → CIE XYZ → CIELAB under the D65 white
//! point. Clustering and matching decisions are made on [`LabColor`]; plain
//! RGB distance is only used where a score is defined in RGB units.

use palette::{FromColor, Lab, Srgb};
use serde::{Deserialize, Serialize};

/// An 8-bit color in RGB channel order.
pub type Rgb = [u8; 3];

/// Euclidean distance between black and white in 8-bit RGB (`255·√3`, rounded).
pub const MAX_RGB_DISTANCE: f32 = 442.0;

/// CIELAB coordinates (D65).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LabColor {
    pub l: f32,
    pub a: f32,
    pub b: f32,
}

impl LabColor {
    pub const fn new(l: f32, a: f32, b: f32) -> Self {
        Self { l, a, b }
    }

    #[inline]
    pub fn to_array(self) -> [f32; 3] {
        [self.l, self.a, self.b]
    }

    #[inline]
    pub fn from_array(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Convert an 8-bit RGB triple to CIELAB.
pub fn rgb_to_lab(rgb: Rgb) -> LabColor {
    let srgb: Srgb<f32> = Srgb::new(rgb[0], rgb[1], rgb[2]).into_format();
    let lab: Lab = Lab::from_color(srgb);
    LabColor::new(lab.l, lab.a, lab.b)
}

/// Convert CIELAB back to 8-bit RGB, clamping out-of-gamut values.
pub fn lab_to_rgb(lab: LabColor) -> Rgb {
    let srgb = Srgb::from_color(Lab::new(lab.l, lab.a, lab.b));
    let to_u8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    [to_u8(srgb.red), to_u8(srgb.green), to_u8(srgb.blue)]
}

/// Euclidean distance in CIELAB (CIE76 ΔE).
#[inline]
pub fn perceptual_distance(a: LabColor, b: LabColor) -> f32 {
    let dl = a.l - b.l;
    let da = a.a - b.a;
    let db = a.b - b.b;
    (dl * dl + da * da + db * db).sqrt()
}

/// Euclidean distance in 8-bit RGB.
#[inline]
pub fn rgb_distance(a: Rgb, b: Rgb) -> f32 {
    let d = |i: usize| a[i] as f32 - b[i] as f32;
    (d(0) * d(0) + d(1) * d(1) + d(2) * d(2)).sqrt()
}

/// `max - min` over the three channels.
#[inline]
pub fn saturation(rgb: Rgb) -> u8 {
    let max = rgb[0].max(rgb[1]).max(rgb[2]);
    let min = rgb[0].min(rgb[1]).min(rgb[2]);
    max - min
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn white_and_black_hit_lab_extremes() {
        let white = rgb_to_lab([255, 255, 255]);
        assert_abs_diff_eq!(white.l, 100.0, epsilon = 0.05);
        assert_abs_diff_eq!(white.a, 0.0, epsilon = 0.05);
        assert_abs_diff_eq!(white.b, 0.0, epsilon = 0.05);

        let black = rgb_to_lab([0, 0, 0]);
        assert_abs_diff_eq!(black.l, 0.0, epsilon = 0.05);
    }

    #[test]
    fn pure_red_matches_reference_values() {
        let red = rgb_to_lab([255, 0, 0]);
        assert_abs_diff_eq!(red.l, 53.24, epsilon = 0.1);
        assert_abs_diff_eq!(red.a, 80.09, epsilon = 0.2);
        assert_abs_diff_eq!(red.b, 67.20, epsilon = 0.2);
    }

    #[test]
    fn lightness_distance_grows_with_luminance_step() {
        let base = [120u8, 90, 60];
        let base_lab = rgb_to_lab(base);
        let mut prev = 0.0f32;
        for step in 1..=40u8 {
            let brighter = [base[0] + step, base[1] + step, base[2] + step];
            let dl = (rgb_to_lab(brighter).l - base_lab.l).abs();
            assert!(dl >= prev, "step {step}: {dl} < {prev}");
            prev = dl;
        }
    }

    #[test]
    fn lab_round_trip_is_close() {
        for rgb in [
            [0u8, 229, 255],
            [29, 233, 182],
            [0, 150, 136],
            [33, 150, 243],
        ] {
            let back = lab_to_rgb(rgb_to_lab(rgb));
            for c in 0..3 {
                assert!(
                    (back[c] as i32 - rgb[c] as i32).abs() <= 1,
                    "{rgb:?} -> {back:?}"
                );
            }
        }
    }

    #[test]
    fn perceptual_and_rgb_distances_disagree_on_close_blues() {
        // Two dark blues that are close in RGB can be further apart in Lab than
        // two bright greens with the same RGB step.
        let d_rgb_blue = rgb_distance([0, 0, 40], [0, 0, 60]);
        let d_rgb_green = rgb_distance([0, 220, 0], [0, 240, 0]);
        assert_abs_diff_eq!(d_rgb_blue, d_rgb_green, epsilon = 1e-6);

        let d_lab_blue = perceptual_distance(rgb_to_lab([0, 0, 40]), rgb_to_lab([0, 0, 60]));
        let d_lab_green = perceptual_distance(rgb_to_lab([0, 220, 0]), rgb_to_lab([0, 240, 0]));
        assert!(d_lab_blue > d_lab_green);
    }

    #[test]
    fn saturation_is_channel_spread() {
        assert_eq!(saturation([10, 200, 60]), 190);
        assert_eq!(saturation([128, 128, 128]), 0);
    }
}
