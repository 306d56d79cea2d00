// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Boundary estimation — pick one edge point per image corner to approximate
// the document quadrilateral.

use scanwerk_core::{EdgeMap, Point, QuadValidation, Quadrilateral};
use tracing::{debug, instrument, warn};

/// Minimum number of edge points needed before corners are attempted.
pub const MIN_EDGE_POINTS: usize = 4;

/// Which image corner a candidate is scored against.
#[derive(Debug, Clone, Copy)]
enum Corner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Corner {
    const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    /// Manhattan-style distance from `(x, y)` to this corner of the image.
    fn score(self, x: f32, y: f32, width: f32, height: f32) -> f32 {
        match self {
            Corner::TopLeft => x + y,
            Corner::TopRight => (width - x) + y,
            Corner::BottomRight => (width - x) + (height - y),
            Corner::BottomLeft => x + (height - y),
        }
    }
}

/// Derives a four-corner document boundary from an edge map.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundaryEstimator {
    validation: QuadValidation,
}

impl BoundaryEstimator {
    pub fn new(validation: QuadValidation) -> Self {
        Self { validation }
    }

    /// Estimate the document quadrilateral, or `None` without enough evidence.
    ///
    /// Each corner independently takes the edge point closest to it by the
    /// corner score; ties keep the first point in row-major order. With
    /// [`QuadValidation::AcceptAny`] the result is not checked for convexity
    /// or distinct corners.
    #[instrument(skip(self, edges))]
    pub fn estimate(&self, edges: &EdgeMap, width: u32, height: u32) -> Option<Quadrilateral> {
        let points: Vec<(f32, f32)> = edges
            .edge_points()
            .map(|(x, y)| (x as f32, y as f32))
            .collect();

        if points.len() < MIN_EDGE_POINTS {
            debug!(edge_points = points.len(), "Too few edge points for a boundary");
            return None;
        }

        let (w, h) = (width as f32, height as f32);
        let mut best: [Option<(f32, Point)>; 4] = [None; 4];

        for &(x, y) in &points {
            for (slot, corner) in best.iter_mut().zip(Corner::ALL) {
                let score = corner.score(x, y, w, h);
                let better = match *slot {
                    Some((current, _)) => score < current,
                    None => true,
                };
                if better {
                    *slot = Some((score, Point::new(x, y)));
                }
            }
        }

        let [Some((_, tl)), Some((_, tr)), Some((_, br)), Some((_, bl))] = best else {
            return None;
        };
        let quad = Quadrilateral::new(tl, tr, br, bl);

        debug!(
            top_left = ?quad.top_left,
            top_right = ?quad.top_right,
            bottom_right = ?quad.bottom_right,
            bottom_left = ?quad.bottom_left,
            "Boundary corners selected"
        );

        if self.validation == QuadValidation::RequireConvex && !quad.is_convex() {
            warn!(area = quad.area(), "Rejecting non-convex boundary");
            return None;
        }

        Some(quad)
    }
}
