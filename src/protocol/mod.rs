//! # ESC/POS Protocol Implementation
//!
//! Command builders for the ESC/POS raster protocol spoken by 58mm BLE
//! thermal printers.
//!
//! ## Module Structure
//!
//! - [`commands`]: control commands (initialize/reset)
//! - [`raster`]: monochrome bit-packing and `GS v 0` raster framing
//!
//! ## Usage Example
//!
//! ```
//! use etiqueta::protocol::{commands, raster};
//! use image::GrayImage;
//!
//! let bitmap = GrayImage::from_pixel(384, 8, image::Luma([255u8]));
//!
//! let mut data = Vec::new();
//! data.extend(commands::init());
//! data.extend(raster::raster_image(&bitmap, 200));
//! // Send `data` to the printer via the transport...
//! ```

pub mod commands;
pub mod raster;
