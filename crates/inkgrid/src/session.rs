//! End-to-end verification: photo → grid → ink pattern → registry match.

use crate::api::{DetectPatternResponse, VerifyRequest, VerifyResponse};
use crate::{EngineConfig, ValidationError, VerifyError};
use chrono::Utc;
use inkgrid_core::{PixelBuffer, Rgb};
use inkgrid_grid::{GridDetection, GridDetector};
use inkgrid_ink::{Classification, InkClassifier};
use inkgrid_match::{PatternMatcher, PatternRegistry, VerificationLogRecord};
use log::{info, warn};
use std::collections::BTreeSet;
use std::time::Instant;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Grid and ink pattern read from one photo.
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    pub detection: GridDetection,
    pub classification: Classification,
}

/// Stateless verification pipeline. One instance can serve concurrent calls.
pub struct Engine {
    config: EngineConfig,
    detector: GridDetector,
    classifier: InkClassifier,
    matcher: PatternMatcher,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            detector: GridDetector::new(config.grid.clone()),
            classifier: InkClassifier::new(config.classifier.clone()),
            matcher: PatternMatcher::new(config.matcher.clone()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Locate the grid and classify its cells.
    pub fn analyze(&self, buf: &PixelBuffer) -> Result<Analysis, VerifyError> {
        let detection = self.detector.detect(buf)?;
        let classification = self
            .classifier
            .classify_cells(buf, &detection.geometry)
            .map_err(|e| VerifyError::from_classify(e, &self.config.classifier.variety))?;
        Ok(Analysis {
            detection,
            classification,
        })
    }

    /// Never fails: errors are reported through `success` and `message`.
    pub fn detect_pattern_from_pixels(&self, buf: &PixelBuffer) -> DetectPatternResponse {
        match self.analyze(buf) {
            Ok(a) => {
                let c = &a.classification;
                DetectPatternResponse {
                    success: true,
                    grid_detected: true,
                    pattern: Some(c.pattern.clone()),
                    size: Some(c.size),
                    extracted_colors: Some(c.extracted_colors()),
                    strategy: Some(a.detection.chosen.strategy),
                    message: format!(
                        "Detected {}x{} pattern with {} inks",
                        c.size,
                        c.size,
                        c.distinct_inks()
                    ),
                }
            }
            Err(e) => {
                info!("detection failed: {e}");
                let grid_detected = !matches!(
                    e,
                    VerifyError::GridNotDetected(_) | VerifyError::ImageDecode(_)
                );
                DetectPatternResponse::failure(grid_detected, e.user_message())
            }
        }
    }

    #[cfg(feature = "image")]
    pub fn detect_pattern_from_image(&self, image_bytes: &[u8]) -> DetectPatternResponse {
        match decode_image(image_bytes) {
            Ok(buf) => self.detect_pattern_from_pixels(&buf),
            Err(e) => {
                info!("{e}");
                DetectPatternResponse::failure(false, e.user_message())
            }
        }
    }

    /// Check a submitted pattern and optional colors; returns the grid size.
    pub fn validate(
        &self,
        pattern: &[u32],
        extracted_colors: Option<&[Vec<Rgb>]>,
    ) -> Result<usize, ValidationError> {
        if pattern.is_empty() {
            return Err(ValidationError::Empty);
        }
        let size = (pattern.len() as f64).sqrt().round() as usize;
        if size * size != pattern.len() {
            return Err(ValidationError::NotSquare { len: pattern.len() });
        }
        let (min, max) = (self.config.grid.min_size, self.config.grid.max_size);
        if !(min..=max).contains(&size) {
            return Err(ValidationError::SizeOutOfRange { size, min, max });
        }

        let distinct = pattern.iter().collect::<BTreeSet<_>>().len();
        let rule = self.config.classifier.variety;
        if distinct < rule.min_distinct {
            return Err(ValidationError::TooFewColors {
                distinct,
                min: rule.min_distinct,
            });
        }
        if distinct > rule.max_distinct {
            return Err(ValidationError::TooManyColors {
                distinct,
                max: rule.max_distinct,
            });
        }

        if let Some(rows) = extracted_colors {
            if rows.len() != size {
                return Err(ValidationError::ColorRows {
                    rows: rows.len(),
                    size,
                });
            }
            if let Some((row, cols)) = rows
                .iter()
                .map(Vec::len)
                .enumerate()
                .find(|&(_, cols)| cols != size)
            {
                return Err(ValidationError::ColorCols { row, cols, size });
            }
        }
        Ok(size)
    }

    /// Match a pattern against the registry and append one audit record.
    ///
    /// An audit write failure is logged and does not affect the response.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, registry, request), fields(cells = request.pattern.len()))
    )]
    pub fn verify_pattern(
        &self,
        registry: &dyn PatternRegistry,
        request: &VerifyRequest,
    ) -> Result<VerifyResponse, VerifyError> {
        let started = Instant::now();
        let size = self.validate(&request.pattern, request.extracted_colors.as_deref())?;
        let candidates = registry.find_candidates(size)?;

        let colors: Option<Vec<Rgb>> = request
            .extracted_colors
            .as_ref()
            .map(|rows| rows.iter().flatten().copied().collect());
        let result = self
            .matcher
            .match_pattern(&request.pattern, colors.as_deref(), &candidates);

        let record = VerificationLogRecord::from_result(
            &request.pattern,
            &request.algorithm,
            &result,
            Utc::now(),
            started.elapsed().as_millis() as u64,
        );
        if let Err(e) = registry.append_verification_log(record) {
            warn!("verification log write failed: {e}");
        }

        info!(
            "verified {}x{} pattern against {} candidates: found={}",
            size,
            size,
            candidates.len(),
            result.found
        );
        Ok(result.into())
    }

    /// Detect a pattern in an encoded photo, then verify it with its colors.
    ///
    /// Detection failures are reported in the response; only validation and
    /// registry failures are errors.
    #[cfg(feature = "image")]
    pub fn scan_and_verify(
        &self,
        registry: &dyn PatternRegistry,
        image_bytes: &[u8],
        algorithm: &str,
    ) -> Result<crate::api::ScanResponse, VerifyError> {
        let detection = self.detect_pattern_from_image(image_bytes);
        let Some(pattern) = detection.pattern.clone().filter(|_| detection.success) else {
            return Ok(crate::api::ScanResponse {
                detection,
                verification: None,
            });
        };
        let request = VerifyRequest {
            pattern,
            algorithm: algorithm.to_string(),
            extracted_colors: detection.extracted_colors.clone(),
        };
        let verification = self.verify_pattern(registry, &request)?;
        Ok(crate::api::ScanResponse {
            detection,
            verification: Some(verification),
        })
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Decode PNG or JPEG bytes into an RGB pixel buffer.
#[cfg(feature = "image")]
pub fn decode_image(bytes: &[u8]) -> Result<PixelBuffer, VerifyError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| VerifyError::ImageDecode(e.to_string()))?
        .to_rgb8();
    let (w, h) = img.dimensions();
    PixelBuffer::new(
        w as usize,
        h as usize,
        inkgrid_core::ChannelOrder::Rgb,
        img.into_raw(),
    )
    .map_err(|e| VerifyError::ImageDecode(e.to_string()))
}
