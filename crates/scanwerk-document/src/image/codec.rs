// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster codec — decode PNG/JPEG/etc. into a `Raster` and encode the
// pipeline's output back to PNG, using the `image` crate.

use std::path::Path;

use ::image::{DynamicImage, GrayImage, ImageFormat, RgbaImage};
use scanwerk_core::error::{Result, ScanError};
use scanwerk_core::{EdgeMap, Raster};
use tracing::{debug, info, instrument};

/// Decode encoded image bytes (JPEG, PNG, TIFF, etc.) into an RGBA raster.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode(data: &[u8]) -> Result<Raster> {
    let img = ::image::load_from_memory(data)
        .map_err(|err| ScanError::ImageError(format!("failed to decode image: {}", err)))?;
    debug!(width = img.width(), height = img.height(), "Image decoded from bytes");
    from_rgba_image(img.into_rgba8())
}

/// Load and decode an image file.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn open(path: impl AsRef<Path>) -> Result<Raster> {
    let img = ::image::open(path.as_ref()).map_err(|err| {
        ScanError::ImageError(format!(
            "failed to open {}: {}",
            path.as_ref().display(),
            err
        ))
    })?;
    info!(width = img.width(), height = img.height(), "Image loaded");
    from_rgba_image(img.into_rgba8())
}

/// Wrap an `image` buffer as a raster.
pub fn from_rgba_image(img: RgbaImage) -> Result<Raster> {
    let (width, height) = img.dimensions();
    Raster::from_raw(width, height, img.into_raw())
}

/// Copy a raster into an `image` buffer.
pub fn to_rgba_image(raster: &Raster) -> Result<RgbaImage> {
    let (width, height) = raster.dimensions();
    RgbaImage::from_raw(width, height, raster.as_bytes().to_vec()).ok_or_else(|| {
        ScanError::ImageError(format!("raster buffer does not fit {width}x{height}"))
    })
}

/// Render an edge map as a black/white grayscale image.
pub fn edge_map_to_gray(edges: &EdgeMap) -> Result<GrayImage> {
    GrayImage::from_raw(edges.width(), edges.height(), edges.cells().to_vec()).ok_or_else(|| {
        ScanError::ImageError(format!(
            "edge map does not fit {}x{}",
            edges.width(),
            edges.height()
        ))
    })
}

/// Encode a raster as PNG bytes.
pub fn encode_png(raster: &Raster) -> Result<Vec<u8>> {
    encode_to_format(&DynamicImage::ImageRgba8(to_rgba_image(raster)?), ImageFormat::Png)
}

/// Encode an edge map as a grayscale PNG.
pub fn encode_edges_png(edges: &EdgeMap) -> Result<Vec<u8>> {
    encode_to_format(&DynamicImage::ImageLuma8(edge_map_to_gray(edges)?), ImageFormat::Png)
}

/// Write a raster to `path` as PNG.
pub fn save_png(raster: &Raster, path: impl AsRef<Path>) -> Result<()> {
    let bytes = encode_png(raster)?;
    std::fs::write(path.as_ref(), bytes)?;
    Ok(())
}

fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| ScanError::ImageError(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_preserves_pixels() {
        let raster = Raster::from_fn(5, 3, |x, y| [x as u8 * 40, y as u8 * 80, 7, 200]);
        let png = encode_png(&raster).expect("encode");
        assert_eq!(&png[1..4], b"PNG");
        assert_eq!(decode(&png).expect("decode"), raster);
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ScanError::ImageError(_)));
    }

    #[test]
    fn edge_map_renders_binary_gray() {
        let mut edges = EdgeMap::new(4, 4);
        edges.mark(1, 2);
        let gray = edge_map_to_gray(&edges).expect("gray");
        assert_eq!(gray.get_pixel(1, 2).0, [255]);
        assert_eq!(gray.get_pixel(0, 0).0, [0]);
    }

    #[test]
    fn save_png_writes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("page.png");
        let raster = Raster::filled(3, 3, [1, 2, 3, 255]);
        save_png(&raster, &path).expect("save");
        assert_eq!(open(&path).expect("open"), raster);
    }
}
