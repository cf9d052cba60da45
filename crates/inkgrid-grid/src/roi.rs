//! Tag outline localisation.
//!
//! The tag is found as the largest dark, roughly quadrilateral blob after an
//! inverted adaptive threshold. Its outline is approximated by the four
//! extreme points of the blob; the ROI is the outline's axis-aligned bounding
//! box.

use crate::components::{label_components, Component, Connectivity};
use crate::{GridError, RoiParams};
use inkgrid_core::{GrayImage, PixelBuffer, PixelRect};
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Located tag region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Roi {
    /// Axis-aligned crop, in image pixels.
    pub rect: PixelRect,
    /// Outline corners `[top-left, top-right, bottom-right, bottom-left]`.
    pub outline: [Point2<f32>; 4],
    /// Area enclosed by the outline.
    pub outline_area: f32,
}

/// Foreground mask of an inverted mean-adaptive threshold.
pub(crate) fn adaptive_threshold_inv(gray: &GrayImage, params: &RoiParams) -> Vec<bool> {
    let blurred = gray.box_blur(params.blur_radius);
    let mean = blurred.box_blur(params.threshold_block / 2);
    blurred
        .data
        .iter()
        .zip(&mean.data)
        .map(|(&v, &m)| v as i32 <= m as i32 - params.threshold_offset)
        .collect()
}

fn quad_area(q: &[Point2<f32>; 4]) -> f32 {
    let mut acc = 0.0f32;
    for i in 0..4 {
        let a = q[i];
        let b = q[(i + 1) % 4];
        acc += a.x * b.y - b.x * a.y;
    }
    0.5 * acc.abs()
}

/// Fraction of samples along `a → b` that have a foreground pixel within two
/// pixels.
fn side_support(mask: &[bool], width: usize, height: usize, a: Point2<f32>, b: Point2<f32>) -> f32 {
    const SAMPLES: usize = 32;
    const R: i64 = 2;
    let mut hits = 0usize;
    for s in 0..SAMPLES {
        let t = (s as f32 + 0.5) / SAMPLES as f32;
        let p = a + (b - a) * t;
        let (cx, cy) = (p.x.round() as i64, p.y.round() as i64);
        let found = (-R..=R).any(|dy| {
            (-R..=R).any(|dx| {
                let (x, y) = (cx + dx, cy + dy);
                x >= 0
                    && y >= 0
                    && (x as usize) < width
                    && (y as usize) < height
                    && mask[y as usize * width + x as usize]
            })
        });
        if found {
            hits += 1;
        }
    }
    hits as f32 / SAMPLES as f32
}

fn outline_of(c: &Component) -> [Point2<f32>; 4] {
    c.extremes.map(|(x, y)| Point2::new(x as f32, y as f32))
}

/// Find the tag outline in `buf`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(buf, params), fields(width = buf.width(), height = buf.height()))
)]
pub fn locate_roi(buf: &PixelBuffer, params: &RoiParams) -> Result<Roi, GridError> {
    let gray = buf.to_gray();
    let (w, h) = (gray.width, gray.height);
    let mask = adaptive_threshold_inv(&gray, params);
    let comps = label_components(w, h, Connectivity::Eight, |i| mask[i].then_some(0));

    let mut best: Option<(f32, &Component)> = None;
    for c in &comps {
        let outline = outline_of(c);
        let area = quad_area(&outline);
        if area < params.min_outline_area_px {
            continue;
        }
        let fill = area / (c.bbox_width() * c.bbox_height()) as f32;
        if fill < params.min_quad_fill {
            continue;
        }
        let support = (0..4)
            .map(|i| side_support(&mask, w, h, outline[i], outline[(i + 1) % 4]))
            .fold(f32::INFINITY, f32::min);
        if support < params.min_edge_support {
            continue;
        }
        if best.map_or(true, |(a, _)| area > a) {
            best = Some((area, c));
        }
    }

    let (outline_area, c) = best.ok_or(GridError::NoOutline)?;
    let rect = PixelRect::new(c.min_x, c.min_y, c.bbox_width(), c.bbox_height());
    debug!(
        "roi: {} components, outline area {:.0}, rect {:?}",
        comps.len(),
        outline_area,
        rect
    );
    Ok(Roi {
        rect,
        outline: outline_of(c),
        outline_area,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkgrid_core::synth::{render_tag, TagStyle};
    use inkgrid_core::ChannelOrder;

    #[test]
    fn finds_framed_tag() {
        let style = TagStyle::default();
        let pattern = [0, 1, 1, 0, 1, 0, 0, 0, 1];
        let img = render_tag(&pattern, 3, &[[0, 188, 212], [33, 150, 243]], &style).expect("img");
        let roi = locate_roi(&img, &RoiParams::default()).expect("roi");

        let m = style.margin_px;
        let side = style.tag_side(3);
        // The blur may widen the dark outline by a couple of pixels.
        assert!(roi.rect.x <= m && roi.rect.x + 3 >= m, "{:?}", roi.rect);
        assert!(roi.rect.y <= m && roi.rect.y + 3 >= m, "{:?}", roi.rect);
        assert!(roi.rect.width >= side && roi.rect.width <= side + 6);
        assert!(roi.rect.height >= side && roi.rect.height <= side + 6);
    }

    #[test]
    fn blank_image_has_no_outline() {
        let img =
            PixelBuffer::from_fn(200, 150, ChannelOrder::Bgr, |_, _| [240, 240, 240]).expect("img");
        assert_eq!(
            locate_roi(&img, &RoiParams::default()),
            Err(GridError::NoOutline)
        );
    }

    #[test]
    fn small_blob_is_rejected() {
        let img = PixelBuffer::from_fn(200, 200, ChannelOrder::Rgb, |x, y| {
            if (90..110).contains(&x) && (90..110).contains(&y) {
                [0, 0, 0]
            } else {
                [255, 255, 255]
            }
        })
        .expect("img");
        assert!(locate_roi(&img, &RoiParams::default()).is_err());
    }

    #[test]
    fn quad_area_of_unit_square() {
        let q = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        assert_eq!(quad_area(&q), 1.0);
    }
}
