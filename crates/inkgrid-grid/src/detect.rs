use crate::geometry::GridGeometry;
use crate::roi::{locate_roi, Roi};
use crate::strategy::{
    select_estimate, ColorRegionStrategy, GridEstimate, GridStrategy, LineStrategy, RoiInput,
};
use crate::{GridError, GridParams};
use inkgrid_core::PixelBuffer;
use log::{debug, info};
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Everything the detector found.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GridDetection {
    pub roi: Roi,
    pub geometry: GridGeometry,
    /// The estimate the geometry was built from.
    pub chosen: GridEstimate,
    /// Every estimate produced, in strategy order.
    pub estimates: Vec<GridEstimate>,
}

impl GridDetection {
    #[inline]
    pub fn size(&self) -> usize {
        self.geometry.size
    }
}

/// Locates the tag and estimates its grid size with a ranked list of
/// strategies.
///
/// Strategies run in order. An estimate at or above
/// [`GridParams::accept_confidence`] ends the search early; otherwise every
/// strategy runs and the most confident plausible estimate is used.
pub struct GridDetector {
    params: GridParams,
    strategies: Vec<Box<dyn GridStrategy>>,
}

impl GridDetector {
    /// Color regions first, then lines.
    pub fn new(params: GridParams) -> Self {
        let strategies: Vec<Box<dyn GridStrategy>> = vec![
            Box::new(ColorRegionStrategy::new(
                params.region.clone(),
                params.min_size,
                params.max_size,
            )),
            Box::new(LineStrategy::new(
                params.lines.clone(),
                params.min_size,
                params.max_size,
            )),
        ];
        Self::with_strategies(params, strategies)
    }

    pub fn with_strategies(params: GridParams, strategies: Vec<Box<dyn GridStrategy>>) -> Self {
        Self { params, strategies }
    }

    pub fn params(&self) -> &GridParams {
        &self.params
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, buf), fields(width = buf.width(), height = buf.height()))
    )]
    pub fn detect(&self, buf: &PixelBuffer) -> Result<GridDetection, GridError> {
        let roi = locate_roi(buf, &self.params.roi)?;
        self.detect_in_roi(buf, roi)
    }

    /// Run the size strategies on an already located tag.
    pub fn detect_in_roi(&self, buf: &PixelBuffer, roi: Roi) -> Result<GridDetection, GridError> {
        let view = buf.crop(roi.rect).ok_or(GridError::EmptyRoi)?;
        let input = RoiInput::new(view);
        let (min, max) = (self.params.min_size, self.params.max_size);

        let mut estimates = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            match strategy.estimate(&input) {
                Some(e) => {
                    debug!(
                        "{:?}: size {} confidence {:.2}",
                        e.strategy, e.size, e.confidence
                    );
                    let accept = e.confidence >= self.params.accept_confidence
                        && (min..=max).contains(&e.size);
                    estimates.push(e);
                    if accept {
                        break;
                    }
                }
                None => debug!("{:?}: no estimate", strategy.kind()),
            }
        }

        let chosen = select_estimate(&estimates, min, max)
            .cloned()
            .ok_or(GridError::NoPlausibleSize { min, max })?;
        info!(
            "grid {}x{} from {:?} (confidence {:.2})",
            chosen.size, chosen.size, chosen.strategy, chosen.confidence
        );

        Ok(GridDetection {
            geometry: GridGeometry::uniform(chosen.size, roi.rect),
            roi,
            chosen,
            estimates,
        })
    }
}

impl Default for GridDetector {
    fn default() -> Self {
        Self::new(GridParams::default())
    }
}

/// One-shot detection with default strategies.
pub fn detect_grid(buf: &PixelBuffer, params: &GridParams) -> Result<GridDetection, GridError> {
    GridDetector::new(params.clone()).detect(buf)
}
