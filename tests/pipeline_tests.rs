//! # Pipeline Tests
//!
//! End-to-end checks over the public API: content goes in one side,
//! ESC/POS bytes come out the other, and the frame structure stays
//! bit-exact.
//!
//! ## Test Coverage
//!
//! - **Frame structure**: reset preamble, raster header fields, payload
//!   length for text, image and QR renders.
//! - **Geometry**: every renderer emits exactly the paper width, so the
//!   packed row stride is constant across content types.
//! - **Determinism**: identical input renders to identical bytes.

use etiqueta::PaperConfig;
use etiqueta::protocol::raster;
use etiqueta::render::{self, TextAlign};
use image::{Rgb, RgbImage};
use std::io::Cursor;

const CONFIG: PaperConfig = PaperConfig::MM58;

fn frame(bitmap: &image::GrayImage) -> Vec<u8> {
    raster::frame(bitmap, CONFIG.binarize_threshold)
}

/// Split a frame into (reset, header, rows) and sanity-check the header.
fn parse_frame(data: &[u8]) -> (u16, u16, &[u8]) {
    assert_eq!(&data[0..2], &[0x1B, 0x40], "missing reset preamble");
    assert_eq!(&data[2..6], &[0x1D, 0x76, 0x30, 0x00], "bad raster header");
    let width_bytes = u16::from_le_bytes([data[6], data[7]]);
    let height = u16::from_le_bytes([data[8], data[9]]);
    (width_bytes, height, &data[10..])
}

fn png_bytes(image: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

#[test]
fn text_frame_structure() {
    let bitmap = render::render_text("<C><B>HELLO\nworld", TextAlign::Left, &CONFIG);
    let data = frame(&bitmap);

    let (width_bytes, height, rows) = parse_frame(&data);
    assert_eq!(width_bytes, 48); // 384 dots
    assert_eq!(height as u32, bitmap.height());
    assert_eq!(rows.len(), 48 * height as usize);
    // Glyphs produce at least one black bit somewhere.
    assert!(rows.iter().any(|&b| b != 0));
}

#[test]
fn image_frame_structure() {
    let source = RgbImage::from_pixel(120, 60, Rgb([0, 0, 0]));
    let bitmap = render::render_image(&png_bytes(&source), &CONFIG).unwrap();
    let data = frame(&bitmap);

    let (width_bytes, height, rows) = parse_frame(&data);
    assert_eq!(width_bytes, 48);
    assert_eq!(rows.len(), 48 * height as usize);
}

#[test]
fn qr_frame_structure() {
    let source = RgbImage::from_pixel(29, 29, Rgb([0, 0, 0]));
    let bitmap = render::render_qr(&png_bytes(&source), &CONFIG).unwrap();
    let data = frame(&bitmap);

    let (width_bytes, height, rows) = parse_frame(&data);
    assert_eq!(width_bytes, 48);
    // Square QR plus vertical padding.
    assert_eq!(height as u32, bitmap.height());
    assert_eq!(rows.len(), 48 * height as usize);
}

#[test]
fn all_content_types_share_paper_width() {
    let text = render::render_text("x", TextAlign::Left, &CONFIG);
    let source = RgbImage::from_pixel(10, 10, Rgb([128, 128, 128]));
    let photo = render::render_image(&png_bytes(&source), &CONFIG).unwrap();
    let qr = render::render_qr(&png_bytes(&source), &CONFIG).unwrap();

    assert_eq!(text.width(), CONFIG.width_dots);
    assert_eq!(photo.width(), CONFIG.width_dots);
    assert_eq!(qr.width(), CONFIG.width_dots);
}

#[test]
fn rendering_is_deterministic() {
    let a = render::render_text("<R>Repeat <I>me", TextAlign::Center, &CONFIG);
    let b = render::render_text("<R>Repeat <I>me", TextAlign::Center, &CONFIG);
    assert_eq!(frame(&a), frame(&b));
}

#[test]
fn blank_text_frame_is_all_white() {
    let bitmap = render::render_text("", TextAlign::Left, &CONFIG);
    let data = frame(&bitmap);
    let (_, _, rows) = parse_frame(&data);
    assert!(rows.iter().all(|&b| b == 0x00));
}
