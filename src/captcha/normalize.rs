//! Verification-image clean-up ahead of OCR.
//!
//! decode → grayscale → binary threshold → 3×3 median → morphological close
//! → contrast stretch around the mean.

use image::{GrayImage, Luma};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::filter::median_filter;
use imageproc::morphology::close;
use thiserror::Error;
use tracing::warn;

pub const THRESHOLD: u8 = 150;
pub const CONTRAST_FACTOR: f32 = 2.0;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

/// Clean `bytes` for recognition. Never fails.
///
/// Undecodable input yields a 1×1 white placeholder; a failure after decode
/// yields the plain grayscale image.
pub fn normalize(bytes: &[u8]) -> GrayImage {
    let gray = match decode_gray(bytes) {
        Ok(g) => g,
        Err(e) => {
            warn!("verification image unusable, using blank placeholder: {}", e);
            return blank();
        }
    };
    match clean(&gray) {
        Ok(cleaned) => cleaned,
        Err(e) => {
            warn!("image clean-up failed, using grayscale: {}", e);
            gray
        }
    }
}

pub fn decode_gray(bytes: &[u8]) -> Result<GrayImage, NormalizeError> {
    Ok(image::load_from_memory(bytes)?.to_luma8())
}

fn blank() -> GrayImage {
    GrayImage::from_pixel(1, 1, Luma([255]))
}

fn clean(gray: &GrayImage) -> Result<GrayImage, NormalizeError> {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Err(NormalizeError::Empty { width, height });
    }
    let binary = threshold(gray, THRESHOLD, ThresholdType::Binary);
    let denoised = median_filter(&binary, 1, 1);
    let closed = close(&denoised, Norm::LInf, 1);
    Ok(enhance_contrast(&closed, CONTRAST_FACTOR))
}

/// Push every pixel away from the mean intensity by `factor`.
pub fn enhance_contrast(img: &GrayImage, factor: f32) -> GrayImage {
    let count = u64::from(img.width()) * u64::from(img.height());
    if count == 0 {
        return img.clone();
    }
    let sum: u64 = img.pixels().map(|p| u64::from(p.0[0])).sum();
    let mean = (sum as f32 / count as f32).round();

    let mut out = img.clone();
    for p in out.pixels_mut() {
        let v = mean + factor * (f32::from(p.0[0]) - mean);
        p.0[0] = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use std::io::Cursor;

    fn png(img: &GrayImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn corrupt_bytes_give_white_placeholder() {
        for input in [&b""[..], b"not an image", b"\x89PNG\r\n\x1a\n truncated"] {
            let out = normalize(input);
            assert_eq!(out.dimensions(), (1, 1));
            assert_eq!(out.get_pixel(0, 0), &Luma([255]));
        }
    }

    #[test]
    fn output_is_binary_and_keeps_size() {
        let img = GrayImage::from_fn(40, 12, |x, y| Luma([((x * 7 + y * 13) % 256) as u8]));
        let out = normalize(&png(&img));
        assert_eq!(out.dimensions(), (40, 12));
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn thin_speckle_is_removed() {
        let mut img = GrayImage::from_pixel(9, 9, Luma([255]));
        img.put_pixel(4, 4, Luma([0]));
        let out = normalize(&png(&img));
        assert_eq!(out.get_pixel(4, 4), &Luma([255]));
    }

    #[test]
    fn contrast_stretches_around_mean() {
        let img = GrayImage::from_raw(2, 1, vec![100, 140]).unwrap();
        let out = enhance_contrast(&img, 2.0);
        assert_eq!(out.as_raw(), &vec![80, 160]);
    }
}
