// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-document — Document page processing for Scanwerk.
//
// Detects the page boundary in a photographed or rendered page, rectifies it
// to an upright rectangle, and applies a sharpen/contrast/background cleanup
// so the result reads like a flatbed scan. Decoding and encoding go through
// the `image` crate at the edges only; every stage works on `Raster`.

pub mod image;
pub mod integrity;
pub mod scan;

// Re-export the primary structs so callers can use `scanwerk_document::ScanPipeline` etc.
pub use scan::{
    BoundaryEstimator, GradientField, PerspectiveRectifier, ScanPipeline, ToneEnhancer,
};
