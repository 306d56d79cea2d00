// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tone enhancement — unsharp mask, linear contrast/brightness, and
// background/foreground cleanup so a photographed page reads like a scan.

use scanwerk_core::{EnhancementParameters, Raster};
use tracing::{debug, info, instrument};

/// Applies the scan-look tone passes to a raster.
///
/// Each pass reads the previous pass's output and writes a fresh buffer.
/// Colour channels are clamped to `[0, 255]` and stored as 8-bit after every
/// pass; alpha is never modified.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToneEnhancer {
    params: EnhancementParameters,
}

impl ToneEnhancer {
    pub fn new(params: EnhancementParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &EnhancementParameters {
        &self.params
    }

    /// Run all three passes in order:
    ///
    /// 1. Unsharp mask against a 3x3 box blur
    /// 2. Contrast stretch around 128 plus brightness offset
    /// 3. Push light pixels toward white, pull dark pixels toward black
    #[instrument(skip_all, fields(width = raster.width(), height = raster.height()))]
    pub fn enhance(&self, raster: &Raster) -> Raster {
        info!("Running tone enhancement");
        let sharpened = self.unsharp_mask(raster);
        let toned = self.adjust_tone(&sharpened);
        let cleaned = self.clean_background(&toned);
        debug!("Tone enhancement complete");
        cleaned
    }

    /// `original + amount * (original - blurred)` per colour channel.
    pub fn unsharp_mask(&self, raster: &Raster) -> Raster {
        let blurred = box_blur(raster);
        let amount = self.params.unsharp_amount;

        let mut output = raster.clone();
        for (out, blur) in output.pixels_mut().zip(blurred.pixels()) {
            for c in 0..3 {
                let original = out[c] as f32;
                out[c] = store(original + amount * (original - blur[c] as f32));
            }
        }
        output
    }

    /// `(value - 128) * contrast + 128 + brightness` per colour channel.
    pub fn adjust_tone(&self, raster: &Raster) -> Raster {
        let EnhancementParameters {
            contrast,
            brightness,
            ..
        } = self.params;

        let mut output = raster.clone();
        for px in output.pixels_mut() {
            for channel in &mut px[..3] {
                *channel = store((*channel as f32 - 128.0) * contrast + 128.0 + brightness);
            }
        }
        output
    }

    /// Luminance-banded cleanup.
    ///
    /// Above the background threshold every channel gains
    /// `(255 - luminance) * push`; below the foreground threshold every
    /// channel loses `luminance * pull`. Pixels in between are untouched.
    pub fn clean_background(&self, raster: &Raster) -> Raster {
        let p = &self.params;
        let mut lightened = 0usize;
        let mut darkened = 0usize;

        let mut output = raster.clone();
        for px in output.pixels_mut() {
            let luminance = (px[0] as f32 + px[1] as f32 + px[2] as f32) / 3.0;
            let delta = if luminance > p.background_threshold {
                lightened += 1;
                (255.0 - luminance) * p.background_push
            } else if luminance < p.foreground_threshold {
                darkened += 1;
                -(luminance * p.foreground_pull)
            } else {
                continue;
            };
            for channel in &mut px[..3] {
                *channel = store(*channel as f32 + delta);
            }
        }

        debug!(lightened, darkened, "Background cleanup applied");
        output
    }
}

/// 3x3 unweighted mean per colour channel. Border pixels keep their original
/// values.
fn box_blur(raster: &Raster) -> Raster {
    let (width, height) = raster.dimensions();
    let mut blurred = raster.clone();
    if width < 3 || height < 3 {
        return blurred;
    }

    let src = raster.as_bytes();
    let dst = blurred.as_bytes_mut();
    let stride = width as usize * 4;

    for y in 1..height as usize - 1 {
        for x in 1..width as usize - 1 {
            let idx = y * stride + x * 4;
            for c in 0..3 {
                let mut sum = 0u32;
                for ky in [y - 1, y, y + 1] {
                    let row = ky * stride;
                    for kx in [x - 1, x, x + 1] {
                        sum += src[row + kx * 4 + c] as u32;
                    }
                }
                dst[idx + c] = store(sum as f32 / 9.0);
            }
        }
    }
    blurred
}

/// Clamp to `[0, 255]` and round half-to-even into a byte.
#[inline]
fn store(value: f32) -> u8 {
    value.clamp(0.0, 255.0).round_ties_even() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grey(width: u32, height: u32, v: u8) -> Raster {
        Raster::filled(width, height, [v, v, v, 255])
    }

    #[test]
    fn white_stays_white() {
        let enhancer = ToneEnhancer::default();
        let white = grey(4, 4, 255);
        assert_eq!(enhancer.clean_background(&white), white);
        assert_eq!(enhancer.enhance(&white), white);
    }

    #[test]
    fn black_stays_black() {
        let black = grey(5, 5, 0);
        assert_eq!(ToneEnhancer::default().enhance(&black), black);
    }

    #[test]
    fn mid_grey_follows_tone_curve() {
        // 128 -> (0 * 1.4) + 128 + 20 = 148, inside the untouched band.
        let out = ToneEnhancer::default().enhance(&grey(4, 4, 128));
        assert!(out.pixels().all(|p| p == [148, 148, 148, 255]));
    }

    #[test]
    fn tone_curve_clamps_both_ends() {
        let enhancer = ToneEnhancer::default();
        let out = enhancer.adjust_tone(&Raster::from_fn(3, 1, |x, _| match x {
            0 => [0, 10, 20, 255],
            1 => [240, 250, 255, 255],
            _ => [100, 128, 150, 255],
        }));
        assert_eq!(out.get_pixel(0, 0), Some([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(1, 0), Some([255, 255, 255, 255]));
        // 100 -> 108.8, 150 -> 178.8
        assert_eq!(out.get_pixel(2, 0), Some([109, 148, 179, 255]));
    }

    #[test]
    fn unsharp_amplifies_centre_and_keeps_border() {
        let mut input = grey(3, 3, 10);
        input.put_pixel(1, 1, [100, 100, 100, 255]);
        let out = ToneEnhancer::default().unsharp_mask(&input);
        // Blur at the centre is 180 / 9 = 20; 100 + 0.8 * 80 = 164.
        assert_eq!(out.get_pixel(1, 1), Some([164, 164, 164, 255]));
        assert_eq!(out.get_pixel(0, 0), Some([10, 10, 10, 255]));
        assert_eq!(out.get_pixel(2, 1), Some([10, 10, 10, 255]));
    }

    #[test]
    fn unsharp_clamps_negative_overshoot() {
        let mut input = grey(3, 3, 90);
        input.put_pixel(1, 1, [0, 0, 0, 255]);
        let out = ToneEnhancer::default().unsharp_mask(&input);
        assert_eq!(out.get_pixel(1, 1), Some([0, 0, 0, 255]));
    }

    #[test]
    fn unsharp_saturates_positive_overshoot() {
        let mut input = grey(3, 3, 10);
        input.put_pixel(1, 1, [250, 250, 250, 255]);
        let out = ToneEnhancer::default().unsharp_mask(&input);
        // Blur 330 / 9 stores as 37; 250 + 0.8 * 213 = 420.4 saturates.
        assert_eq!(out.get_pixel(1, 1), Some([255, 255, 255, 255]));
        assert_eq!(out.get_pixel(0, 1), Some([10, 10, 10, 255]));
    }

    #[test]
    fn cleanup_saturates_each_channel_independently() {
        let enhancer = ToneEnhancer::default();
        // Luminance 223.3: every channel gains 12.67, so 255 stays 255.
        let light = enhancer.clean_background(&Raster::filled(1, 1, [255, 255, 160, 255]));
        assert_eq!(light.get_pixel(0, 0), Some([255, 255, 173, 255]));
        // Luminance 20: every channel loses 1, so 0 stays 0.
        let dark = enhancer.clean_background(&Raster::filled(1, 1, [0, 0, 60, 255]));
        assert_eq!(dark.get_pixel(0, 0), Some([0, 0, 59, 255]));
    }

    #[test]
    fn background_band_pushes_to_white() {
        // Luminance 200: boost (255 - 200) * 0.4 = 22.
        let out = ToneEnhancer::default().clean_background(&grey(2, 2, 200));
        assert!(out.pixels().all(|p| p == [222, 222, 222, 255]));
    }

    #[test]
    fn foreground_band_pulls_to_black() {
        // Luminance 100: reduction 100 * 0.05 = 5.
        let out = ToneEnhancer::default().clean_background(&grey(2, 2, 100));
        assert!(out.pixels().all(|p| p == [95, 95, 95, 255]));
    }

    #[test]
    fn middle_band_is_untouched() {
        let enhancer = ToneEnhancer::default();
        for v in [120u8, 150, 190] {
            let input = grey(2, 2, v);
            assert_eq!(enhancer.clean_background(&input), input, "luminance {v}");
        }
    }

    #[test]
    fn alpha_is_preserved() {
        let input = Raster::from_fn(5, 5, |x, y| [(x * 50) as u8, (y * 50) as u8, 90, (x * 10 + y) as u8]);
        let out = ToneEnhancer::default().enhance(&input);
        for (a, b) in input.pixels().zip(out.pixels()) {
            assert_eq!(a[3], b[3]);
        }
    }

    #[test]
    fn custom_parameters_are_honoured() {
        let params = EnhancementParameters {
            contrast: 1.0,
            brightness: 0.0,
            ..EnhancementParameters::default()
        };
        let input = grey(3, 3, 150);
        assert_eq!(ToneEnhancer::new(params).adjust_tone(&input), input);
    }
}
