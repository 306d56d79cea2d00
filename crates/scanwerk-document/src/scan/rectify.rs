// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectification — resample the detected quadrilateral onto an
// upright rectangle.

use imageproc::geometric_transformations::Projection;
use scanwerk_core::error::{Result, ScanError};
use scanwerk_core::{Point, Quadrilateral, Raster, RectifyStrategy};
use tracing::{debug, info, instrument, warn};

/// The homography is evaluated in `f32`; positions this close to an integer
/// are taken as that integer before flooring.
const PROJECTIVE_SNAP: f64 = 1e-4;

/// Warps a raster so a quadrilateral region fills an upright rectangle.
///
/// Sampling never fails: destination pixels whose source position falls
/// outside the raster are left fully transparent.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerspectiveRectifier {
    strategy: RectifyStrategy,
}

impl PerspectiveRectifier {
    pub fn new(strategy: RectifyStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> RectifyStrategy {
        self.strategy
    }

    /// Output dimensions for `quad`: the longer of each pair of opposite
    /// edges, rounded, at least 1x1.
    pub fn output_size(quad: &Quadrilateral) -> (u32, u32) {
        let width = quad.top_length().max(quad.bottom_length());
        let height = quad.left_length().max(quad.right_length());
        (round_dimension(width), round_dimension(height))
    }

    /// Like [`PerspectiveRectifier::rectify`], but refuses quads whose output
    /// would exceed `max_pixels` instead of allocating it.
    pub fn try_rectify(
        &self,
        raster: &Raster,
        quad: &Quadrilateral,
        max_pixels: u64,
    ) -> Result<Raster> {
        let (out_w, out_h) = Self::output_size(quad);
        let pixels = out_w as u64 * out_h as u64;
        if pixels > max_pixels {
            warn!(out_w, out_h, max_pixels, "Rectified output too large");
            return Err(ScanError::TooLarge {
                pixels,
                limit: max_pixels,
            });
        }
        Ok(self.rectify(raster, quad))
    }

    /// Resample `raster` so `quad` maps onto a `output_size(quad)` rectangle.
    ///
    /// The full output is allocated up front, so a quad far larger than the
    /// source (corners at 1e6, say) needs a matching amount of memory. Use
    /// [`PerspectiveRectifier::try_rectify`] when the quad is not bounded by
    /// the source raster.
    #[instrument(skip_all, fields(strategy = ?self.strategy))]
    pub fn rectify(&self, raster: &Raster, quad: &Quadrilateral) -> Raster {
        let (out_w, out_h) = Self::output_size(quad);
        debug!(out_w, out_h, "Rectified size computed");

        let output = match self.strategy {
            RectifyStrategy::BilinearPatch => bilinear_patch(raster, quad, out_w, out_h),
            RectifyStrategy::Projective => match homography(quad, out_w, out_h) {
                Some(projection) => sample(raster, out_w, out_h, |x, y| {
                    let (sx, sy) = projection * (x as f32, y as f32);
                    (snap(sx as f64), snap(sy as f64))
                }),
                None => {
                    warn!("Degenerate homography; using bilinear patch instead");
                    bilinear_patch(raster, quad, out_w, out_h)
                }
            },
        };

        info!(out_w, out_h, "Rectification applied");
        output
    }
}

fn round_dimension(length: f32) -> u32 {
    if length.is_finite() {
        (length.round() as u32).max(1)
    } else {
        1
    }
}

/// Inverse bilinear-patch mapping: destination `(u, v) = (x / w, y / h)`
/// blends the four corners.
///
/// Weights stay in integer units (`w - x`, `x`, `h - y`, `y`) and the single
/// division comes last, so integer corners map to exact integer positions.
fn bilinear_patch(raster: &Raster, quad: &Quadrilateral, out_w: u32, out_h: u32) -> Raster {
    let [tl, tr, br, bl] = quad.corners().map(as_f64);
    let (fw, fh) = (out_w as f64, out_h as f64);
    let area = fw * fh;

    sample(raster, out_w, out_h, |x, y| {
        let (x, y) = (x as f64, y as f64);
        let (left, right) = (fw - x, x);
        let (upper, lower) = (fh - y, y);
        let top = (left * tl.0 + right * tr.0, left * tl.1 + right * tr.1);
        let bottom = (left * bl.0 + right * br.0, left * bl.1 + right * br.1);
        (
            (upper * top.0 + lower * bottom.0) / area,
            (upper * top.1 + lower * bottom.1) / area,
        )
    })
}

fn snap(v: f64) -> f64 {
    let nearest = v.round();
    if (v - nearest).abs() < PROJECTIVE_SNAP {
        nearest
    } else {
        v
    }
}

/// Planar homography taking the output rectangle's corners to `quad`.
fn homography(quad: &Quadrilateral, out_w: u32, out_h: u32) -> Option<Projection> {
    let (w, h) = (out_w as f32, out_h as f32);
    let from = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
    let to = quad.corners().map(<(f32, f32)>::from);
    Projection::from_control_points(from, to)
}

/// Nearest-pixel (floor) sampling through `map`, which takes a destination
/// pixel to a source position.
fn sample(
    raster: &Raster,
    out_w: u32,
    out_h: u32,
    map: impl Fn(u32, u32) -> (f64, f64),
) -> Raster {
    let (src_w, src_h) = (raster.width() as f64, raster.height() as f64);
    let mut output = Raster::transparent(out_w, out_h);
    let mut blank = 0usize;

    for y in 0..out_h {
        for x in 0..out_w {
            let (sx, sy) = map(x, y);
            let (sx, sy) = (sx.floor(), sy.floor());
            // Negated comparisons also reject NaN.
            if !(sx >= 0.0 && sx < src_w && sy >= 0.0 && sy < src_h) {
                blank += 1;
                continue;
            }
            if let Some([r, g, b, _]) = raster.get_pixel(sx as u32, sy as u32) {
                output.put_pixel(x, y, [r, g, b, 255]);
            }
        }
    }

    if blank > 0 {
        debug!(blank, "Destination pixels mapped outside the source");
    }
    output
}

fn as_f64(p: Point) -> (f64, f64) {
    (p.x as f64, p.y as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_raster(width: u32, height: u32) -> Raster {
        Raster::from_fn(width, height, |x, y| {
            [(x * 7 % 256) as u8, (y * 11 % 256) as u8, ((x + y) % 256) as u8, 255]
        })
    }

    #[test]
    fn axis_aligned_quad_sets_output_size() {
        let quad = Quadrilateral::new(
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 80.0),
            Point::new(0.0, 80.0),
        );
        assert_eq!(PerspectiveRectifier::output_size(&quad), (100, 80));

        let out = PerspectiveRectifier::default().rectify(&gradient_raster(120, 90), &quad);
        assert_eq!(out.dimensions(), (100, 80));
    }

    #[test]
    fn output_uses_longer_opposite_edges() {
        let quad = Quadrilateral::new(
            Point::new(10.0, 10.0),
            Point::new(50.0, 12.0),
            Point::new(60.0, 70.0),
            Point::new(5.0, 65.0),
        );
        let (w, h) = PerspectiveRectifier::output_size(&quad);
        assert_eq!(w, quad.top_length().max(quad.bottom_length()).round() as u32);
        assert_eq!(h, quad.left_length().max(quad.right_length()).round() as u32);
    }

    #[test]
    fn collapsed_quad_yields_one_pixel() {
        let p = Point::new(3.0, 3.0);
        let quad = Quadrilateral::new(p, p, p, p);
        let out = PerspectiveRectifier::default().rectify(&gradient_raster(8, 8), &quad);
        assert_eq!(out.dimensions(), (1, 1));
        assert_eq!(out.get_pixel(0, 0), gradient_raster(8, 8).get_pixel(3, 3).map(|[r, g, b, _]| [r, g, b, 255]));
    }

    #[test]
    fn identity_quad_reproduces_input() {
        let mut input = gradient_raster(37, 23);
        // Source alpha is replaced by full opacity.
        input.put_pixel(5, 5, [1, 2, 3, 10]);
        let quad = Quadrilateral::from_bounds(37, 23);

        let out = PerspectiveRectifier::default().rectify(&input, &quad);
        assert_eq!(out.dimensions(), (37, 23));
        for y in 0..23 {
            for x in 0..37 {
                let [r, g, b, _] = input.get_pixel(x, y).expect("in bounds");
                assert_eq!(out.get_pixel(x, y), Some([r, g, b, 255]), "at ({x}, {y})");
            }
        }
    }

    #[test]
    fn projective_identity_matches_input() {
        let input = gradient_raster(40, 30);
        let quad = Quadrilateral::from_bounds(40, 30);
        let out = PerspectiveRectifier::new(RectifyStrategy::Projective).rectify(&input, &quad);
        assert_eq!(out.dimensions(), (40, 30));

        // The homography is solved numerically; allow a sliver of rounding.
        let mismatched = (0..30)
            .flat_map(|y| (0..40).map(move |x| (x, y)))
            .filter(|&(x, y)| {
                let [r, g, b, _] = input.get_pixel(x, y).expect("in bounds");
                out.get_pixel(x, y) != Some([r, g, b, 255])
            })
            .count();
        assert!(mismatched <= 12, "{mismatched} pixels differ");
    }

    #[test]
    fn out_of_bounds_samples_are_transparent() {
        let input = Raster::filled(10, 10, [200, 200, 200, 255]);
        // Right half of the quad lies beyond the raster.
        let quad = Quadrilateral::new(
            Point::new(0.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(20.0, 10.0),
            Point::new(0.0, 10.0),
        );
        let out = PerspectiveRectifier::default().rectify(&input, &quad);
        assert_eq!(out.dimensions(), (20, 10));
        assert_eq!(out.get_pixel(2, 4), Some([200, 200, 200, 255]));
        assert_eq!(out.get_pixel(15, 4), Some([0, 0, 0, 0]));
    }

    #[test]
    fn parallelogram_is_sheared_back_upright() {
        // Columns are coloured by x; the quad leans right by one pixel per row.
        let input = Raster::from_fn(30, 10, |x, _| [x as u8, 0, 0, 255]);
        let quad = Quadrilateral::new(
            Point::new(0.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(30.0, 10.0),
            Point::new(10.0, 10.0),
        );
        let out = PerspectiveRectifier::default().rectify(&input, &quad);
        assert_eq!(out.dimensions(), (20, 14));
        // Row 0 starts at source column 0.
        assert_eq!(out.get_pixel(0, 0).map(|p| p[0]), Some(0));
        // Destination column 5 always shifts with the row's lean.
        let first = out.get_pixel(5, 0).expect("px")[0];
        let later = out.get_pixel(5, 7).expect("px")[0];
        assert!(later > first);
    }

    #[test]
    fn fractional_positions_floor_without_rounding_up() {
        let input = Raster::from_fn(12, 2, |x, _| [(x * 10) as u8, 0, 0, 255]);
        let quad = Quadrilateral::new(
            Point::new(0.0, 0.0),
            Point::new(9.999, 0.0),
            Point::new(9.999, 1.0),
            Point::new(0.0, 1.0),
        );
        let out = PerspectiveRectifier::default().rectify(&input, &quad);
        assert_eq!(out.dimensions(), (10, 1));
        // x = 5 maps to 4.9995, which floors to column 4.
        assert_eq!(out.get_pixel(5, 0).map(|p| p[0]), Some(40));
        assert_eq!(out.get_pixel(0, 0).map(|p| p[0]), Some(0));
        // x = 9 maps to 8.9991.
        assert_eq!(out.get_pixel(9, 0).map(|p| p[0]), Some(80));
    }

    #[test]
    fn try_rectify_refuses_oversized_output() {
        let input = gradient_raster(8, 8);
        let huge = Quadrilateral::from_bounds(1_000_000, 1_000_000);
        let err = PerspectiveRectifier::default()
            .try_rectify(&input, &huge, 100_000_000)
            .unwrap_err();
        match err {
            ScanError::TooLarge { pixels, limit } => {
                assert_eq!(pixels, 1_000_000_000_000);
                assert_eq!(limit, 100_000_000);
            }
            other => panic!("unexpected error variant: {other}"),
        }

        let fits = Quadrilateral::from_bounds(8, 8);
        let out = PerspectiveRectifier::default()
            .try_rectify(&input, &fits, 64)
            .expect("64 pixels is within the limit");
        assert_eq!(out.dimensions(), (8, 8));
    }
}
