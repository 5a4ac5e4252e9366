//! # Image Rendering
//!
//! Fits a pre-encoded image onto the paper: decode, scale to the target
//! width with nearest-neighbor sampling (binarized pixels do not survive
//! interpolation), binarize by luminance, and center on a white canvas.
//!
//! Photos fill the printable width; QR codes get a wider side margin so
//! the quiet zone survives thermal bleed.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};

use crate::error::RenderError;
use crate::printer::config::PaperConfig;

/// White rows above and below the placed image.
const VERTICAL_PADDING: u32 = 10;

/// Side margin for QR codes, each side.
const QR_MARGIN: u32 = 20;

const WHITE: Luma<u8> = Luma([255]);
const BLACK: Luma<u8> = Luma([0]);

/// Render an encoded image (PNG, JPEG, ...) to a paper-width bitmap.
///
/// The image is scaled to the printable width preserving aspect ratio.
pub fn render_image(bytes: &[u8], config: &PaperConfig) -> Result<GrayImage, RenderError> {
    let source = decode(bytes)?;

    let target_w = config.printable_width();
    let target_h = (source.height() as u64 * target_w as u64 / source.width() as u64).max(1) as u32;

    Ok(compose(&source, target_w, target_h, config))
}

/// Render an encoded QR code to a paper-width bitmap.
///
/// QR codes are forced square and capped at the width minus the quiet
/// margin on each side. A code already smaller than that keeps its
/// native resolution; upscaling would put modules at fractional scale.
pub fn render_qr(bytes: &[u8], config: &PaperConfig) -> Result<GrayImage, RenderError> {
    let source = decode(bytes)?;

    let side = (config.width_dots - QR_MARGIN * 2).min(source.width());
    Ok(compose(&source, side, side, config))
}

fn decode(bytes: &[u8]) -> Result<RgbImage, RenderError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| RenderError::Undecodable(e.to_string()))?;
    // Alpha is dropped; transparent regions composite as their RGB value.
    Ok(decoded.to_rgb8())
}

/// Scale, binarize and center onto the paper-width canvas.
fn compose(source: &RgbImage, target_w: u32, target_h: u32, config: &PaperConfig) -> GrayImage {
    let scaled = imageops::resize(source, target_w, target_h, FilterType::Nearest);

    let height = target_h + VERTICAL_PADDING * 2;
    let mut canvas = GrayImage::from_pixel(config.width_dots, height, WHITE);

    let x0 = (config.width_dots - target_w) / 2;
    for (x, y, pixel) in scaled.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let luma = 0.3 * r as f32 + 0.59 * g as f32 + 0.11 * b as f32;
        if luma < config.binarize_threshold as f32 {
            canvas.put_pixel(x0 + x, y + VERTICAL_PADDING, BLACK);
        }
    }

    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn config() -> PaperConfig {
        PaperConfig::MM58
    }

    fn png_bytes(image: &RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_undecodable_input() {
        let err = render_image(b"not an image", &config()).unwrap_err();
        assert!(matches!(err, RenderError::Undecodable(_)));
    }

    #[test]
    fn test_image_fills_printable_width() {
        let config = config();
        let source = RgbImage::from_pixel(100, 50, Rgb([0, 0, 0]));
        let bitmap = render_image(&png_bytes(&source), &config).unwrap();

        assert_eq!(bitmap.width(), config.width_dots);
        // 100x50 scaled to 344 wide keeps the 2:1 aspect.
        assert_eq!(bitmap.height(), 172 + VERTICAL_PADDING * 2);
    }

    #[test]
    fn test_image_centered_with_padding() {
        let config = config();
        let source = RgbImage::from_pixel(344, 10, Rgb([0, 0, 0]));
        let bitmap = render_image(&png_bytes(&source), &config).unwrap();

        // Top padding rows stay white.
        assert!((0..VERTICAL_PADDING).all(|y| bitmap.get_pixel(192, y).0[0] == 255));
        // Side margins stay white, content is black.
        let y = VERTICAL_PADDING + 5;
        assert_eq!(bitmap.get_pixel(0, y).0[0], 255);
        assert_eq!(bitmap.get_pixel(config.width_dots - 1, y).0[0], 255);
        assert_eq!(bitmap.get_pixel(192, y).0[0], 0);
    }

    #[test]
    fn test_binarize_threshold() {
        let config = config();
        // Mid gray: 0.3+0.59+0.11 sums to 1.0, so luma == channel value.
        let dark = RgbImage::from_pixel(10, 10, Rgb([199, 199, 199]));
        let light = RgbImage::from_pixel(10, 10, Rgb([200, 200, 200]));

        let rendered_dark = render_image(&png_bytes(&dark), &config).unwrap();
        let rendered_light = render_image(&png_bytes(&light), &config).unwrap();

        let y = VERTICAL_PADDING + 1;
        assert_eq!(rendered_dark.get_pixel(192, y).0[0], 0);
        assert_eq!(rendered_light.get_pixel(192, y).0[0], 255);
    }

    #[test]
    fn test_large_qr_downsized_to_margin_width() {
        let config = config();
        let source = RgbImage::from_pixel(400, 400, Rgb([0, 0, 0]));
        let bitmap = render_qr(&png_bytes(&source), &config).unwrap();

        let side = config.width_dots - QR_MARGIN * 2;
        assert_eq!(bitmap.width(), config.width_dots);
        assert_eq!(bitmap.height(), side + VERTICAL_PADDING * 2);

        let y = VERTICAL_PADDING + side / 2;
        assert_eq!(bitmap.get_pixel(QR_MARGIN - 1, y).0[0], 255);
        assert_eq!(bitmap.get_pixel(QR_MARGIN, y).0[0], 0);
    }

    #[test]
    fn test_small_qr_kept_at_native_size() {
        let config = config();
        // A code narrower than the margin width is not upscaled.
        let source = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let bitmap = render_qr(&png_bytes(&source), &config).unwrap();

        assert_eq!(bitmap.height(), 100 + VERTICAL_PADDING * 2);

        let x0 = (config.width_dots - 100) / 2;
        let y = VERTICAL_PADDING + 50;
        assert_eq!(bitmap.get_pixel(x0 - 1, y).0[0], 255);
        assert_eq!(bitmap.get_pixel(x0, y).0[0], 0);
        assert_eq!(bitmap.get_pixel(x0 + 99, y).0[0], 0);
        assert_eq!(bitmap.get_pixel(x0 + 100, y).0[0], 255);
    }

    #[test]
    fn test_non_square_qr_forced_square() {
        let config = config();
        let source = RgbImage::from_pixel(40, 20, Rgb([0, 0, 0]));
        let bitmap = render_qr(&png_bytes(&source), &config).unwrap();

        // Width caps the square side; height follows it.
        assert_eq!(bitmap.height(), 40 + VERTICAL_PADDING * 2);
    }
}
