// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Scanwerk document pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// Number of interleaved channels per pixel (red, green, blue, alpha).
pub const CHANNELS: usize = 4;

/// Value stored in an [`EdgeMap`] cell that lies on an edge.
pub const EDGE: u8 = 255;

// -- Raster -------------------------------------------------------------------

/// A decoded image: row-major RGBA8 pixels with a top-left origin.
///
/// The buffer length is always `width * height * 4`. Stages never alias one
/// another's buffers; each produces a fresh `Raster`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Raster {
    /// Wrap an existing RGBA buffer, validating its length.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = byte_len(width, height).ok_or(ScanError::TooLarge {
            pixels: width as u64 * height as u64,
            limit: (usize::MAX / CHANNELS) as u64,
        })?;
        if pixels.len() != expected {
            return Err(ScanError::InvalidRaster {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A fully transparent (all-zero) raster.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    /// A raster where every pixel is `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * CHANNELS);
        for _ in 0..count {
            pixels.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Build a raster by evaluating `f` at every pixel in row-major order.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * CHANNELS);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Total pixel count (not bytes).
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Borrow the raw RGBA bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutably borrow the raw RGBA bytes.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Consume the raster and return the raw RGBA bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels
    }

    /// Byte offset of pixel `(x, y)`.
    #[inline]
    pub fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    /// Read the pixel at `(x, y)`, or `None` outside the raster.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// Overwrite the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics when `(x, y)` lies outside the raster.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} raster",
            self.width,
            self.height
        );
        let i = self.offset(x, y);
        self.pixels[i..i + CHANNELS].copy_from_slice(&rgba);
    }

    /// Iterate over pixels as 4-byte slices in row-major order.
    pub fn pixels(&self) -> std::slice::ChunksExact<'_, u8> {
        self.pixels.chunks_exact(CHANNELS)
    }

    /// Mutable counterpart of [`Raster::pixels`].
    pub fn pixels_mut(&mut self) -> std::slice::ChunksExactMut<'_, u8> {
        self.pixels.chunks_exact_mut(CHANNELS)
    }
}

fn byte_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(CHANNELS)
}

// -- EdgeMap ------------------------------------------------------------------

/// Binary per-pixel edge classification aligned with a [`Raster`].
///
/// Every cell is either `0` or [`EDGE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeMap {
    width: u32,
    height: u32,
    cells: Vec<u8>,
}

impl EdgeMap {
    /// An edge map with no edges marked.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw cell values, row-major.
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Mark `(x, y)` as an edge.
    pub fn mark(&mut self, x: u32, y: u32) {
        let i = y as usize * self.width as usize + x as usize;
        self.cells[i] = EDGE;
    }

    pub fn is_edge(&self, x: u32, y: u32) -> bool {
        x < self.width
            && y < self.height
            && self.cells[y as usize * self.width as usize + x as usize] == EDGE
    }

    /// Number of cells marked as edges.
    pub fn edge_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c == EDGE).count()
    }

    /// Coordinates of every edge cell, in row-major scan order.
    pub fn edge_points(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.width.max(1) as usize;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == EDGE)
            .map(move |(i, _)| ((i % width) as u32, (i / width) as u32))
    }
}

// -- Geometry -----------------------------------------------------------------

/// A sub-pixel position in source-raster coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (f32, f32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// Four document corners in fixed positional order.
///
/// The order (top-left, top-right, bottom-right, bottom-left) defines the
/// rectification mapping and is never re-sorted by angle or area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
}

impl Quadrilateral {
    pub fn new(top_left: Point, top_right: Point, bottom_right: Point, bottom_left: Point) -> Self {
        Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }

    /// The quadrilateral covering a whole `width` x `height` raster.
    pub fn from_bounds(width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self::new(
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        )
    }

    /// Corners as `[top_left, top_right, bottom_right, bottom_left]`.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    pub fn top_length(&self) -> f32 {
        self.top_left.distance(&self.top_right)
    }

    pub fn bottom_length(&self) -> f32 {
        self.bottom_left.distance(&self.bottom_right)
    }

    pub fn left_length(&self) -> f32 {
        self.top_left.distance(&self.bottom_left)
    }

    pub fn right_length(&self) -> f32 {
        self.top_right.distance(&self.bottom_right)
    }

    /// Area via the shoelace formula. Self-intersecting quads under-report.
    pub fn area(&self) -> f32 {
        let c = self.corners();
        let mut twice = 0.0f32;
        for i in 0..4 {
            let j = (i + 1) % 4;
            twice += c[i].x * c[j].y - c[j].x * c[i].y;
        }
        twice.abs() / 2.0
    }

    /// True when the corners are pairwise distinct and every turn between
    /// consecutive edges has the same, non-zero orientation.
    pub fn is_convex(&self) -> bool {
        let c = self.corners();
        for i in 0..4 {
            for j in (i + 1)..4 {
                if c[i] == c[j] {
                    return false;
                }
            }
        }

        let mut sign = 0.0f32;
        for i in 0..4 {
            let a = c[i];
            let b = c[(i + 1) % 4];
            let d = c[(i + 2) % 4];
            let cross = (b.x - a.x) * (d.y - b.y) - (b.y - a.y) * (d.x - b.x);
            if cross == 0.0 {
                return false;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }
}

// -- Pipeline outcome ---------------------------------------------------------

/// Why the pipeline skipped rectification or enhancement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackReason {
    /// Fewer than four edge cells; rectification skipped, enhancement ran.
    InsufficientEdges { found: usize },
    /// Corners resolved but were rejected by quad validation; rectification
    /// skipped, enhancement ran.
    DegenerateQuadrilateral,
    /// A stage failed; the original raster is returned unprocessed.
    StageFailure(String),
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientEdges { found } => {
                write!(f, "insufficient edge evidence ({found} edge points)")
            }
            Self::DegenerateQuadrilateral => write!(f, "detected quadrilateral is degenerate"),
            Self::StageFailure(detail) => write!(f, "processing failed: {detail}"),
        }
    }
}

/// Output of one pipeline invocation.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Always true: failures degrade to the original raster instead.
    pub success: bool,
    /// The input raster, untouched.
    pub original: Raster,
    /// Rectified and enhanced raster, or a copy of the original on fallback.
    pub processed: Raster,
    /// Boundary used for rectification, if one was found.
    pub quadrilateral: Option<Quadrilateral>,
    pub rectified: bool,
    pub enhanced: bool,
    pub reason: Option<FallbackReason>,
}

impl PipelineResult {
    /// Full fallback: the processed raster is a copy of the original.
    pub fn fallback(original: Raster, reason: FallbackReason) -> Self {
        Self {
            success: true,
            processed: original.clone(),
            original,
            quadrilateral: None,
            rectified: false,
            enhanced: false,
            reason: Some(reason),
        }
    }
}
