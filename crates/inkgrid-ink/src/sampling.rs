//! Robust per-cell color sampling.

use crate::{PixelFilter, SamplingParams};
use inkgrid_core::{PixelBuffer, Rgb};
use inkgrid_grid::GridGeometry;
use serde::{Deserialize, Serialize};

/// Representative color of one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampledColor {
    pub row: usize,
    pub col: usize,
    pub rgb: Rgb,
    /// Window pixels that passed the filter. `0` means the center pixel was
    /// used as a fallback.
    pub support: usize,
}

/// Window half-size for a given geometry.
pub fn window_radius(geometry: &GridGeometry, params: &SamplingParams) -> usize {
    let (pw, ph) = geometry.cell_pitch();
    let cap = (pw.min(ph) * params.max_cell_fraction).floor() as usize;
    params.radius_px.min(cap).max(1)
}

fn median(values: &mut [u8]) -> u8 {
    values.sort_unstable();
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        ((values[n / 2 - 1] as u16 + values[n / 2] as u16) / 2) as u8
    }
}

/// Per-channel median of the window pixels that look like ink, or the center
/// pixel when none do.
pub fn sample_at(
    buf: &PixelBuffer,
    cx: usize,
    cy: usize,
    radius: usize,
    filter: &PixelFilter,
) -> (Rgb, usize) {
    let x0 = cx.saturating_sub(radius);
    let y0 = cy.saturating_sub(radius);
    let x1 = (cx + radius + 1).min(buf.width());
    let y1 = (cy + radius + 1).min(buf.height());

    let mut channels: [Vec<u8>; 3] = Default::default();
    for y in y0..y1 {
        for x in x0..x1 {
            let px = buf.rgb(x, y);
            if filter.is_ink(px) {
                for c in 0..3 {
                    channels[c].push(px[c]);
                }
            }
        }
    }

    let support = channels[0].len();
    if support == 0 {
        return (buf.rgb(cx, cy), 0);
    }
    let [r, g, b] = &mut channels;
    ([median(r), median(g), median(b)], support)
}

/// Sample every cell of `geometry`, in row-major order.
pub fn sample_cells(
    buf: &PixelBuffer,
    geometry: &GridGeometry,
    params: &SamplingParams,
    filter: &PixelFilter,
) -> Vec<SampledColor> {
    let radius = window_radius(geometry, params);
    let max_x = buf.width().saturating_sub(1);
    let max_y = buf.height().saturating_sub(1);

    geometry
        .cells
        .iter()
        .map(|cell| {
            let cx = (cell.point.x.max(0.0) as usize).min(max_x);
            let cy = (cell.point.y.max(0.0) as usize).min(max_y);
            let (rgb, support) = sample_at(buf, cx, cy, radius, filter);
            SampledColor {
                row: cell.row,
                col: cell.col,
                rgb,
                support,
            }
        })
        .collect()
}

/// Arrange row-major samples as `rows × cols` RGB triples.
pub fn to_grid(samples: &[SampledColor], size: usize) -> Vec<Vec<Rgb>> {
    samples
        .chunks(size.max(1))
        .map(|row| row.iter().map(|s| s.rgb).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkgrid_core::{ChannelOrder, PixelRect};

    #[test]
    fn median_ignores_grid_line_pixels() {
        // Ink on the left, a dark grid line through the middle column.
        let buf = PixelBuffer::from_fn(11, 11, ChannelOrder::Rgb, |x, _| {
            if x == 5 {
                [20, 20, 20]
            } else if x < 5 {
                [0, 190, 210]
            } else {
                [0, 186, 214]
            }
        })
        .expect("buf");
        let (rgb, support) = sample_at(&buf, 5, 5, 5, &PixelFilter::default());
        assert_eq!(support, 110);
        assert_eq!(rgb, [0, 188, 212]);
    }

    #[test]
    fn falls_back_to_center_pixel() {
        let buf =
            PixelBuffer::from_fn(9, 9, ChannelOrder::Bgr, |_, _| [245, 245, 245]).expect("buf");
        let (rgb, support) = sample_at(&buf, 4, 4, 3, &PixelFilter::default());
        assert_eq!(support, 0);
        assert_eq!(rgb, [245, 245, 245]);
    }

    #[test]
    fn radius_shrinks_for_small_cells() {
        let params = SamplingParams::default();
        let small = GridGeometry::uniform(8, PixelRect::new(0, 0, 64, 64));
        assert_eq!(window_radius(&small, &params), 2);
        let large = GridGeometry::uniform(3, PixelRect::new(0, 0, 300, 300));
        assert_eq!(window_radius(&large, &params), 5);
    }

    #[test]
    fn grid_layout_is_row_major() {
        let samples: Vec<SampledColor> = (0..9)
            .map(|i| SampledColor {
                row: i / 3,
                col: i % 3,
                rgb: [i as u8, 0, 0],
                support: 1,
            })
            .collect();
        let grid = to_grid(&samples, 3);
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[1][2], [5, 0, 0]);
    }
}
