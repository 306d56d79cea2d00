// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Scanwerk.

use thiserror::Error;

/// Top-level error type for all Scanwerk operations.
///
/// The pixel pipeline itself never hands one of these to its caller; they
/// surface only from decoding, encoding, configuration I/O, and the CLI.
#[derive(Debug, Error)]
pub enum ScanError {
    // -- Raster errors --
    #[error("raster buffer is {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    InvalidRaster {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("raster has zero width or height")]
    EmptyRaster,

    #[error("raster of {pixels} pixels exceeds the limit of {limit}")]
    TooLarge { pixels: u64, limit: u64 },

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Async boundary --
    #[error("pipeline task failed: {0}")]
    Join(String),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanError>;
