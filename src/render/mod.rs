//! # Render Pipeline
//!
//! Turns print content into a monochrome bitmap of exactly the paper
//! width. Two independent producers feed the same downstream encoder:
//!
//! - [`text`]: styled text with inline markup, word-wrapped and
//!   rasterized with bitmap font glyphs
//! - [`image`]: pre-encoded images (photos, QR codes), binarized and
//!   centered on the paper
//!
//! Both produce a grayscale bitmap (`GrayImage`) with a white background;
//! height is computed from content.

pub mod image;
pub mod text;

pub use text::{TextAlign, render_text};

pub use self::image::{render_image, render_qr};
