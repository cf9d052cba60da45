use inkgrid_core::PixelRect;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Sample location of one cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellSample {
    pub row: usize,
    pub col: usize,
    /// Image pixel coordinates of the cell center.
    pub point: Point2<f32>,
}

/// Grid size plus one sample point per cell, in row-major order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub size: usize,
    pub roi: PixelRect,
    pub cells: Vec<CellSample>,
}

impl GridGeometry {
    /// Divide `roi` into `size × size` equal cells and place each sample at
    /// the cell center: `((c + ½)·w/N, (r + ½)·h/N)` relative to the ROI.
    pub fn uniform(size: usize, roi: PixelRect) -> Self {
        let cw = roi.width as f32 / size as f32;
        let ch = roi.height as f32 / size as f32;
        let cells = (0..size)
            .flat_map(|row| (0..size).map(move |col| (row, col)))
            .map(|(row, col)| CellSample {
                row,
                col,
                point: Point2::new(
                    roi.x as f32 + (col as f32 + 0.5) * cw,
                    roi.y as f32 + (row as f32 + 0.5) * ch,
                ),
            })
            .collect();
        Self { size, roi, cells }
    }

    /// Horizontal and vertical cell pitch in pixels.
    pub fn cell_pitch(&self) -> (f32, f32) {
        (
            self.roi.width as f32 / self.size as f32,
            self.roi.height as f32 / self.size as f32,
        )
    }

    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> Option<&CellSample> {
        if row < self.size && col < self.size {
            self.cells.get(row * self.size + col)
        } else {
            None
        }
    }
}
