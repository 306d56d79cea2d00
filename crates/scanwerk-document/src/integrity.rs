// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster integrity — SHA-256 fingerprints so callers can confirm that a retry
// produced byte-identical output.

use scanwerk_core::Raster;
use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Fingerprint a raster's dimensions and pixels.
///
/// Dimensions are hashed as big-endian `u32`s ahead of the pixel bytes, so
/// two rasters with the same bytes but different shapes differ.
pub fn raster_digest(raster: &Raster) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raster.width().to_be_bytes());
    hasher.update(raster.height().to_be_bytes());
    hasher.update(raster.as_bytes());
    hex::encode(hasher.finalize())
}
