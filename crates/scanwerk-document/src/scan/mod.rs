// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline — edge detection, boundary estimation, perspective
// rectification, and tone enhancement.

pub mod boundary;
pub mod enhance;
pub mod gradient;
pub mod pipeline;
pub mod rectify;

pub use boundary::BoundaryEstimator;
pub use enhance::ToneEnhancer;
pub use gradient::GradientField;
pub use pipeline::ScanPipeline;
pub use rectify::PerspectiveRectifier;
