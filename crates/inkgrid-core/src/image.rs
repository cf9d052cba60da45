use crate::Rgb;
use serde::{Deserialize, Serialize};

/// Byte order of the three color channels in a [`PixelBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageBufferError {
    #[error("invalid pixel buffer length (expected {expected} bytes, got {got})")]
    LengthMismatch { expected: usize, got: usize },

    #[error("invalid pixel buffer dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
}

/// Axis-aligned pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelRect {
    pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.width * self.height
    }
}

/// Decoded 3-channel, 8-bit image. Immutable once built.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    order: ChannelOrder,
    data: Vec<u8>, // row-major, len = w*h*3
}

impl PixelBuffer {
    pub fn new(
        width: usize,
        height: usize,
        order: ChannelOrder,
        data: Vec<u8>,
    ) -> Result<Self, ImageBufferError> {
        if width == 0 || height == 0 {
            return Err(ImageBufferError::InvalidDimensions { width, height });
        }
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(3))
            .ok_or(ImageBufferError::InvalidDimensions { width, height })?;
        if data.len() != expected {
            return Err(ImageBufferError::LengthMismatch {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            order,
            data,
        })
    }

    /// Build a buffer by evaluating `f(x, y)` for every pixel, stored in `order`.
    pub fn from_fn(
        width: usize,
        height: usize,
        order: ChannelOrder,
        mut f: impl FnMut(usize, usize) -> Rgb,
    ) -> Result<Self, ImageBufferError> {
        let mut data = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                let [r, g, b] = f(x, y);
                match order {
                    ChannelOrder::Rgb => data.extend_from_slice(&[r, g, b]),
                    ChannelOrder::Bgr => data.extend_from_slice(&[b, g, r]),
                }
            }
        }
        Self::new(width, height, order, data)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    #[inline]
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Pixel at `(x, y)` in RGB order, whatever the storage order.
    #[inline]
    pub fn rgb(&self, x: usize, y: usize) -> Rgb {
        let i = (y * self.width + x) * 3;
        let px = [self.data[i], self.data[i + 1], self.data[i + 2]];
        match self.order {
            ChannelOrder::Rgb => px,
            ChannelOrder::Bgr => [px[2], px[1], px[0]],
        }
    }

    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width, self.height)
    }

    /// View of the whole buffer.
    pub fn view(&self) -> RgbView<'_> {
        RgbView {
            buf: self,
            rect: self.bounds(),
        }
    }

    /// View of `rect`, or `None` if it is empty or leaves the buffer.
    pub fn crop(&self, rect: PixelRect) -> Option<RgbView<'_>> {
        if rect.width == 0
            || rect.height == 0
            || rect.x + rect.width > self.width
            || rect.y + rect.height > self.height
        {
            return None;
        }
        Some(RgbView { buf: self, rect })
    }

    pub fn to_gray(&self) -> GrayImage {
        self.view().to_gray()
    }
}

/// Borrowed rectangular window into a [`PixelBuffer`]. Coordinates are
/// relative to the window origin.
#[derive(Clone, Copy, Debug)]
pub struct RgbView<'a> {
    buf: &'a PixelBuffer,
    rect: PixelRect,
}

impl<'a> RgbView<'a> {
    #[inline]
    pub fn width(&self) -> usize {
        self.rect.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.rect.height
    }

    /// Placement of this view inside its parent buffer.
    #[inline]
    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    #[inline]
    pub fn rgb(&self, x: usize, y: usize) -> Rgb {
        self.buf.rgb(self.rect.x + x, self.rect.y + y)
    }

    /// Iterate pixels row-major.
    pub fn pixels(&self) -> impl Iterator<Item = Rgb> + '_ {
        (0..self.height()).flat_map(move |y| (0..self.width()).map(move |x| self.rgb(x, y)))
    }

    /// ITU-R BT.601 luma, the usual `RGB2GRAY` weighting.
    pub fn to_gray(&self) -> GrayImage {
        let data = self
            .pixels()
            .map(|[r, g, b]| {
                (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32)
                    .round()
                    .clamp(0.0, 255.0) as u8
            })
            .collect();
        GrayImage {
            width: self.width(),
            height: self.height(),
            data,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>, // row-major, len = w*h
}

impl GrayImage {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    /// Value at `(x, y)` with edge clamping.
    #[inline]
    pub fn get_clamped(&self, x: i64, y: i64) -> u8 {
        let cx = x.clamp(0, self.width as i64 - 1) as usize;
        let cy = y.clamp(0, self.height as i64 - 1) as usize;
        self.get(cx, cy)
    }

    /// Summed-area table with a zero guard row/column: `(w+1)*(h+1)` entries.
    pub fn integral(&self) -> Vec<u64> {
        let stride = self.width + 1;
        let mut sat = vec![0u64; stride * (self.height + 1)];
        for y in 0..self.height {
            let mut row = 0u64;
            for x in 0..self.width {
                row += self.get(x, y) as u64;
                sat[(y + 1) * stride + x + 1] = sat[y * stride + x + 1] + row;
            }
        }
        sat
    }

    /// Mean filter over a `(2r+1)²` window, truncated at the borders.
    pub fn box_blur(&self, radius: usize) -> GrayImage {
        if radius == 0 || self.data.is_empty() {
            return self.clone();
        }
        let sat = self.integral();
        let stride = self.width + 1;
        let mut data = vec![0u8; self.data.len()];
        for y in 0..self.height {
            let y0 = y.saturating_sub(radius);
            let y1 = (y + radius + 1).min(self.height);
            for x in 0..self.width {
                let x0 = x.saturating_sub(radius);
                let x1 = (x + radius + 1).min(self.width);
                let sum = sat[y1 * stride + x1] + sat[y0 * stride + x0]
                    - sat[y0 * stride + x1]
                    - sat[y1 * stride + x0];
                let n = ((y1 - y0) * (x1 - x0)) as u64;
                data[y * self.width + x] = ((sum + n / 2) / n) as u8;
            }
        }
        GrayImage {
            width: self.width,
            height: self.height,
            data,
        }
    }
}
