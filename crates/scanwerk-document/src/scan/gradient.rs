// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Gradient field — Sobel edge strength over mean-RGB luminance, thresholded
// into a binary edge map.

use scanwerk_core::{EdgeMap, Raster};
use tracing::{debug, instrument};

/// Default magnitude threshold on the 0-255 luminance scale.
pub const DEFAULT_EDGE_THRESHOLD: f32 = 50.0;

/// Computes a binary edge map from a raster.
#[derive(Debug, Clone, Copy)]
pub struct GradientField {
    threshold: f32,
}

impl Default for GradientField {
    fn default() -> Self {
        Self::new(DEFAULT_EDGE_THRESHOLD)
    }
}

impl GradientField {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Classify every pixel as edge (255) or non-edge (0).
    ///
    /// Only interior pixels are evaluated; the one-pixel border is always
    /// non-edge. Rasters narrower or shorter than 3 pixels yield an all-zero
    /// map.
    #[instrument(skip_all, fields(width = raster.width(), height = raster.height()))]
    pub fn compute(&self, raster: &Raster) -> EdgeMap {
        let (width, height) = raster.dimensions();
        let mut edges = EdgeMap::new(width, height);
        if width < 3 || height < 3 {
            debug!("Raster too small for a 3x3 kernel; edge map left empty");
            return edges;
        }

        // Work on R+G+B sums so the comparison is exact: the mean-luminance
        // magnitude exceeds t iff the sum magnitude squared exceeds (3t)^2.
        let sums = channel_sums(raster);
        let w = width as usize;
        let limit = 3.0 * f64::from(self.threshold);

        // Gx: [-1 0 1; -2 0 2; -1 0 1]
        // Gy: [-1 -2 -1; 0 0 0; 1 2 1]
        for y in 1..height as usize - 1 {
            let above = &sums[(y - 1) * w..y * w];
            let row = &sums[y * w..(y + 1) * w];
            let below = &sums[(y + 1) * w..(y + 2) * w];
            for x in 1..w - 1 {
                let gx = (above[x + 1] - above[x - 1])
                    + 2 * (row[x + 1] - row[x - 1])
                    + (below[x + 1] - below[x - 1]);
                let gy = (below[x - 1] - above[x - 1])
                    + 2 * (below[x] - above[x])
                    + (below[x + 1] - above[x + 1]);
                let magnitude_sq = i64::from(gx) * i64::from(gx) + i64::from(gy) * i64::from(gy);
                if limit < 0.0 || magnitude_sq as f64 > limit * limit {
                    edges.mark(x as u32, y as u32);
                }
            }
        }

        debug!(edge_count = edges.edge_count(), "Edge map computed");
        edges
    }
}

/// Per-pixel R+G+B, three times the unweighted mean luminance. Alpha is
/// ignored.
fn channel_sums(raster: &Raster) -> Vec<i32> {
    raster
        .pixels()
        .map(|p| i32::from(p[0]) + i32::from(p[1]) + i32::from(p[2]))
        .collect()
}
