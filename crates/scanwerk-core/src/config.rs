// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// Tone curve and cleanup constants for the enhancement pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementParameters {
    /// Unsharp mask strength applied to `original - blurred`.
    pub unsharp_amount: f32,
    /// Linear contrast factor around mid-grey (128).
    pub contrast: f32,
    /// Brightness offset added after the contrast stretch.
    pub brightness: f32,
    /// Luminance above which a pixel counts as background.
    pub background_threshold: f32,
    /// Fraction of the remaining headroom pushed toward white.
    pub background_push: f32,
    /// Luminance below which a pixel counts as foreground ink.
    pub foreground_threshold: f32,
    /// Fraction of luminance subtracted from foreground pixels.
    pub foreground_pull: f32,
}

impl Default for EnhancementParameters {
    fn default() -> Self {
        Self {
            unsharp_amount: 0.8,
            contrast: 1.4,
            brightness: 20.0,
            background_threshold: 190.0,
            background_push: 0.4,
            foreground_threshold: 120.0,
            foreground_pull: 0.05,
        }
    }
}

/// How the detected quadrilateral is mapped onto the output rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RectifyStrategy {
    /// Bilinear interpolation across the four corners. Exact for
    /// parallelograms, approximate under true perspective.
    #[default]
    BilinearPatch,
    /// Planar homography through the four corners.
    Projective,
}

/// Acceptance rule for corners produced by the boundary estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuadValidation {
    /// Any four resolved corners are accepted, even if degenerate.
    #[default]
    AcceptAny,
    /// Reject repeated corners and non-convex or self-intersecting quads.
    RequireConvex,
}

/// Settings for one scan pipeline instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Gradient magnitude (0-255 luminance scale) above which a pixel is an edge.
    pub edge_threshold: f32,
    pub enhancement: EnhancementParameters,
    pub rectify_strategy: RectifyStrategy,
    pub quad_validation: QuadValidation,
    /// Largest raster, in pixels, any stage may allocate.
    pub max_pixels: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            edge_threshold: 50.0,
            enhancement: EnhancementParameters::default(),
            rectify_strategy: RectifyStrategy::default(),
            quad_validation: QuadValidation::default(),
            max_pixels: 100_000_000,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Reject values that would make the numeric stages meaningless.
    pub fn validate(&self) -> Result<()> {
        if !self.edge_threshold.is_finite() || self.edge_threshold < 0.0 {
            return Err(ScanError::Config(format!(
                "edge_threshold must be a non-negative number, got {}",
                self.edge_threshold
            )));
        }
        if self.max_pixels == 0 {
            return Err(ScanError::Config("max_pixels must be positive".into()));
        }
        let e = &self.enhancement;
        let fields = [
            ("unsharp_amount", e.unsharp_amount),
            ("contrast", e.contrast),
            ("brightness", e.brightness),
            ("background_threshold", e.background_threshold),
            ("background_push", e.background_push),
            ("foreground_threshold", e.foreground_threshold),
            ("foreground_pull", e.foreground_pull),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ScanError::Config(format!("{name} must be finite")));
            }
        }
        Ok(())
    }
}
