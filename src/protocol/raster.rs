//! # Raster Graphics (GS v 0)
//!
//! Packs a grayscale bitmap into 1-bit rows and frames it with the
//! ESC/POS raster command.
//!
//! ## Bit Packing
//!
//! Each byte covers 8 horizontally-consecutive dots, MSB-first:
//!
//! ```text
//! Byte value 0xF0 = 11110000 = ████░░░░
//! Byte value 0x0F = 00001111 = ░░░░████
//! ```
//!
//! 1 = black (print), 0 = white. A pixel is black when its luminance
//! (0.3R + 0.59G + 0.11B) falls below the binarization threshold; for the
//! grayscale bitmaps produced by the render pipeline the pixel value *is*
//! the luminance. Row stride = `ceil(width / 8)` bytes.
//!
//! ## Frame Layout
//!
//! ```text
//! 1D 76 30 m  xL xH  yL yH  d1..dk
//!          │  └─┬──┘ └─┬──┘
//!          │    │      └── height in dots, little-endian
//!          │    └── width in BYTES, little-endian
//!          └── mode: 0x00 (normal density, most compatible)
//! ```

use image::GrayImage;

use super::commands::{GS, init, u16_le};

/// Raster mode byte. 0x00 is normal density; some firmwares accept other
/// values for double density but 0x00 is the most compatible.
const MODE_NORMAL: u8 = 0x00;

/// Pack a grayscale bitmap into monochrome rows, 8 pixels per byte,
/// MSB-first, 1 = black (pixel value below `threshold`).
///
/// Output length is `ceil(width / 8) * height`. Trailing bits of a row
/// beyond the image width stay 0 (white).
pub fn pack_rows(bitmap: &GrayImage, threshold: u8) -> Vec<u8> {
    let width = bitmap.width() as usize;
    let height = bitmap.height() as usize;
    let width_bytes = width.div_ceil(8);

    let mut packed = Vec::with_capacity(width_bytes * height);

    for y in 0..height {
        for byte_x in 0..width_bytes {
            let mut b = 0u8;
            for bit in 0..8 {
                let x = byte_x * 8 + bit;
                if x < width {
                    let luma = bitmap.get_pixel(x as u32, y as u32).0[0];
                    if luma < threshold {
                        b |= 1 << (7 - bit);
                    }
                }
            }
            packed.push(b);
        }
    }

    packed
}

/// # Print Raster Graphics (GS v 0)
///
/// Frames pre-packed monochrome rows with the 8-byte raster header.
///
/// `width_dots` is the bitmap width in dots; the header carries
/// `ceil(width_dots / 8)` as the row byte count.
pub fn raster(width_dots: u16, height_dots: u16, data: &[u8]) -> Vec<u8> {
    let width_bytes = width_dots.div_ceil(8);

    debug_assert!(
        data.len() == width_bytes as usize * height_dots as usize,
        "raster data length mismatch: expected {} ({} bytes x {} rows), got {}",
        width_bytes as usize * height_dots as usize,
        width_bytes,
        height_dots,
        data.len()
    );

    let [xl, xh] = u16_le(width_bytes);
    let [yl, yh] = u16_le(height_dots);

    let mut cmd = Vec::with_capacity(8 + data.len());
    cmd.push(GS);
    cmd.push(b'v');
    cmd.push(b'0');
    cmd.push(MODE_NORMAL);
    cmd.push(xl);
    cmd.push(xh);
    cmd.push(yl);
    cmd.push(yh);
    cmd.extend_from_slice(data);
    cmd
}

/// Pack and frame a bitmap in one step.
pub fn raster_image(bitmap: &GrayImage, threshold: u8) -> Vec<u8> {
    let packed = pack_rows(bitmap, threshold);
    raster(bitmap.width() as u16, bitmap.height() as u16, &packed)
}

/// Build a complete print frame: printer reset followed by the raster
/// command. This is the exact byte stream the transport transmits.
pub fn frame(bitmap: &GrayImage, threshold: u8) -> Vec<u8> {
    let mut data = init();
    data.extend(raster_image(bitmap, threshold));
    data
}
