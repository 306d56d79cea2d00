// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan pipeline — edge map, boundary, rectification, and tone enhancement in
// one pass, degrading to the original raster whenever a stage cannot proceed.

use scanwerk_core::error::{Result, ScanError};
use scanwerk_core::{FallbackReason, PipelineConfig, PipelineResult, Quadrilateral, Raster};
use tracing::{debug, info, instrument, warn};

use super::boundary::{BoundaryEstimator, MIN_EDGE_POINTS};
use super::enhance::ToneEnhancer;
use super::gradient::GradientField;
use super::rectify::PerspectiveRectifier;

/// Orchestrates the four stages and owns the fallback policy.
///
/// ```ignore
/// let result = ScanPipeline::default().process(raster);
/// assert!(result.success);
/// let png = codec::encode_png(&result.processed)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScanPipeline {
    config: PipelineConfig,
    gradient: GradientField,
    estimator: BoundaryEstimator,
    rectifier: PerspectiveRectifier,
    enhancer: ToneEnhancer,
}

/// What the fallible part of the pipeline produced.
struct Outcome {
    processed: Raster,
    quadrilateral: Option<Quadrilateral>,
    reason: Option<FallbackReason>,
}

impl ScanPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            gradient: GradientField::new(config.edge_threshold),
            estimator: BoundaryEstimator::new(config.quad_validation),
            rectifier: PerspectiveRectifier::new(config.rectify_strategy),
            enhancer: ToneEnhancer::new(config.enhancement),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one page.
    ///
    /// Never fails: without a usable boundary the page is enhanced
    /// unrectified, and if a stage cannot run at all the original raster is
    /// returned unprocessed with `reason` set.
    #[instrument(skip_all, fields(width = raster.width(), height = raster.height()))]
    pub fn process(&self, raster: Raster) -> PipelineResult {
        info!("Processing scanned page");
        match self.run(&raster) {
            Ok(outcome) => PipelineResult {
                success: true,
                original: raster,
                processed: outcome.processed,
                rectified: outcome.quadrilateral.is_some(),
                quadrilateral: outcome.quadrilateral,
                enhanced: true,
                reason: outcome.reason,
            },
            Err(err) => {
                warn!(error = %err, "Pipeline failed; returning original page unprocessed");
                PipelineResult::fallback(raster, FallbackReason::StageFailure(err.to_string()))
            }
        }
    }

    /// Run [`ScanPipeline::process`] on tokio's blocking pool.
    ///
    /// A panicked or cancelled task degrades to the same full fallback as a
    /// stage failure.
    #[cfg(feature = "async")]
    pub async fn process_async(&self, raster: Raster) -> PipelineResult {
        let pipeline = self.clone();
        let original = raster.clone();
        match tokio::task::spawn_blocking(move || pipeline.process(raster)).await {
            Ok(result) => result,
            Err(join_err) => {
                let err = ScanError::Join(join_err.to_string());
                warn!(error = %err, "Pipeline task failed; returning original page unprocessed");
                PipelineResult::fallback(original, FallbackReason::StageFailure(err.to_string()))
            }
        }
    }

    fn run(&self, raster: &Raster) -> Result<Outcome> {
        if raster.is_empty() {
            return Err(ScanError::EmptyRaster);
        }
        self.check_pixels(raster.pixel_count())?;

        let (width, height) = raster.dimensions();
        let edges = self.gradient.compute(raster);

        let (rectified, quadrilateral, reason) = match self.estimator.estimate(&edges, width, height)
        {
            Some(quad) => {
                let rectified = self
                    .rectifier
                    .try_rectify(raster, &quad, self.config.max_pixels)?;
                (Some(rectified), Some(quad), None)
            }
            None => {
                let found = edges.edge_count();
                let reason = if found < MIN_EDGE_POINTS {
                    FallbackReason::InsufficientEdges { found }
                } else {
                    FallbackReason::DegenerateQuadrilateral
                };
                warn!(%reason, "No document boundary; enhancing the uncropped page");
                (None, None, Some(reason))
            }
        };

        let processed = self.enhancer.enhance(rectified.as_ref().unwrap_or(raster));
        debug!(
            out_w = processed.width(),
            out_h = processed.height(),
            rectified = quadrilateral.is_some(),
            "Page processed"
        );

        Ok(Outcome {
            processed,
            quadrilateral,
            reason,
        })
    }

    fn check_pixels(&self, pixels: u64) -> Result<()> {
        if pixels > self.config.max_pixels {
            return Err(ScanError::TooLarge {
                pixels,
                limit: self.config.max_pixels,
            });
        }
        Ok(())
    }
}
