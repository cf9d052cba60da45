//! Synthetic tag rendering.
//!
//! Draws a framed `N×N` ink grid on a plain background. Used by the test
//! suites of every crate in the workspace and by the CLI `render` command to
//! produce images the detector can be tried on.

use crate::{ChannelOrder, ImageBufferError, PixelBuffer, Rgb};
use serde::{Deserialize, Serialize};

/// Drawing style for [`render_tag`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagStyle {
    /// Cell side in pixels.
    pub cell_px: usize,
    /// Plain background around the tag.
    pub margin_px: usize,
    /// Outer frame thickness. `0` disables the frame.
    pub frame_px: usize,
    /// Thickness of the lines between cells. `0` disables grid lines.
    pub line_px: usize,
    pub frame_color: Rgb,
    pub line_color: Rgb,
    pub background: Rgb,
    pub order: ChannelOrder,
}

impl Default for TagStyle {
    fn default() -> Self {
        Self {
            cell_px: 40,
            margin_px: 24,
            frame_px: 3,
            line_px: 2,
            frame_color: [0, 0, 0],
            line_color: [40, 40, 40],
            background: [250, 250, 250],
            order: ChannelOrder::Rgb,
        }
    }
}

impl TagStyle {
    /// Side of the framed tag in pixels.
    pub fn tag_side(&self, size: usize) -> usize {
        size * self.cell_px + 2 * self.frame_px
    }

    /// Side of the whole rendered image in pixels.
    pub fn image_side(&self, size: usize) -> usize {
        self.tag_side(size) + 2 * self.margin_px
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("pattern has {got} cells, expected {expected} for a {size}x{size} grid")]
    PatternLength {
        size: usize,
        expected: usize,
        got: usize,
    },
    #[error("ink id {ink} has no palette color")]
    MissingInk { ink: u32 },
    #[error(transparent)]
    Buffer(#[from] ImageBufferError),
}

/// Render `pattern` (row-major ink ids) as a framed grid. `palette[id]` is the
/// color of ink `id`.
pub fn render_tag(
    pattern: &[u32],
    size: usize,
    palette: &[Rgb],
    style: &TagStyle,
) -> Result<PixelBuffer, RenderError> {
    if pattern.len() != size * size || size == 0 {
        return Err(RenderError::PatternLength {
            size,
            expected: size * size,
            got: pattern.len(),
        });
    }
    if let Some(&ink) = pattern.iter().find(|&&i| i as usize >= palette.len()) {
        return Err(RenderError::MissingInk { ink });
    }

    let side = style.image_side(size);
    let tag0 = style.margin_px;
    let tag1 = tag0 + style.tag_side(size);
    let inner0 = tag0 + style.frame_px;
    let half_line = style.line_px / 2;

    let on_line = |p: usize| -> bool {
        if style.line_px == 0 {
            return false;
        }
        let rel = p - inner0;
        (1..size).any(|i| {
            let pos = i * style.cell_px;
            rel + half_line >= pos && rel + half_line < pos + style.line_px
        })
    };

    let buf = PixelBuffer::from_fn(side, side, style.order, |x, y| {
        if x < tag0 || y < tag0 || x >= tag1 || y >= tag1 {
            return style.background;
        }
        let inner1 = tag1 - style.frame_px;
        if x < inner0 || y < inner0 || x >= inner1 || y >= inner1 {
            return style.frame_color;
        }
        if on_line(x) || on_line(y) {
            return style.line_color;
        }
        let col = ((x - inner0) / style.cell_px).min(size - 1);
        let row = ((y - inner0) / style.cell_px).min(size - 1);
        palette[pattern[row * size + col] as usize]
    })?;
    Ok(buf)
}
