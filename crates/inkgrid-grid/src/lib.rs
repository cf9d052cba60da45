//! Tag localisation and grid geometry for ink-grid tags.
//!
//! Given a decoded photo, [`GridDetector`] finds the tag outline, estimates
//! the number of cells per side (3 to 8) and returns one sample point per
//! cell.
//!
//! Two size estimators are provided behind the [`GridStrategy`] trait:
//! - [`ColorRegionStrategy`] counts same-color regions, reliable when most
//!   cells are separated from their neighbours,
//! - [`LineStrategy`] measures the spacing of straight grid lines, which
//!   survives neighbouring cells sharing a color.
//!
//! ```no_run
//! use inkgrid_core::{ChannelOrder, PixelBuffer};
//! use inkgrid_grid::{GridDetector, GridParams};
//!
//! let img = PixelBuffer::new(640, 480, ChannelOrder::Rgb, vec![0; 640 * 480 * 3]).unwrap();
//! let detector = GridDetector::new(GridParams::default());
//! if let Ok(found) = detector.detect(&img) {
//!     println!("{}x{} grid at {:?}", found.size(), found.size(), found.roi.rect);
//! }
//! ```

mod components;
mod detect;
mod error;
mod geometry;
mod hough;
mod params;
mod roi;
pub mod strategy;

pub use components::{label_components, Component, Connectivity};
pub use detect::{detect_grid, GridDetection, GridDetector};
pub use error::GridError;
pub use geometry::{CellSample, GridGeometry};
pub use params::{GridParams, LineStrategyParams, RegionStrategyParams, RoiParams};
pub use roi::{locate_roi, Roi};
pub use strategy::{
    select_estimate, ColorRegionStrategy, Evidence, GridEstimate, GridStrategy, LineStrategy,
    RoiInput, StrategyKind,
};
