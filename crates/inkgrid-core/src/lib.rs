//! Core types and utilities for ink-grid tag verification.
//!
//! This crate is intentionally small. It holds the pieces every stage of the
//! pipeline shares: explicit-channel-order pixel buffers, the CIELAB color
//! converter, a seeded k-means, and the logger. It knows nothing about grids,
//! patterns or registries.

mod color;
mod image;
mod kmeans;
mod logger;
pub mod synth;

pub use color::{
    lab_to_rgb, perceptual_distance, rgb_distance, rgb_to_lab, saturation, LabColor, Rgb,
    MAX_RGB_DISTANCE,
};
pub use image::{ChannelOrder, GrayImage, ImageBufferError, PixelBuffer, PixelRect, RgbView};
pub use kmeans::{kmeans, nearest_center, KMeansParams, KMeansResult};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{default_filter, init_with_verbosity, LoggerError, LOG_ENV};
