//! # Paper and Link Configuration
//!
//! Hardware constants for the supported printer class: 58mm thermal label
//! printers exposing a vendor GATT service over BLE.
//!
//! ## Geometry
//!
//! ```text
//! ├─ 20px ─┼────── 344px printable ──────┼─ 20px ─┤
//! │ padding │                            │ padding │
//! └──────────────── 384 dots ────────────────────┘
//! ```
//!
//! Every bitmap handed to the encoder must be exactly
//! [`PaperConfig::width_dots`] wide; the render pipeline and the encoder
//! share this invariant.

use std::time::Duration;

/// Hardware and link characteristics of a thermal label printer.
#[derive(Debug, Clone, Copy)]
pub struct PaperConfig {
    /// Paper width in dots (pixels).
    pub width_dots: u32,

    /// Left/right padding inside the paper width, in dots.
    pub padding: u32,

    /// Nominal font pixel height for text rendering.
    pub font_size: u32,

    /// Vertical gap between text lines, in dots.
    pub line_spacing: u32,

    /// Luminance threshold for binarization (0-255). Pixels below it
    /// print black. Higher values favor black, reducing gray speckling
    /// on thermal paper.
    pub binarize_threshold: u8,
}

impl PaperConfig {
    /// 58mm label paper: 384 dots printable width.
    pub const MM58: Self = Self {
        width_dots: 384,
        padding: 20,
        font_size: 20,
        line_spacing: 8,
        binarize_threshold: 200,
    };

    /// Printable width after side padding.
    #[inline]
    pub fn printable_width(&self) -> u32 {
        self.width_dots - self.padding * 2
    }

    /// Row stride of the packed monochrome raster, in bytes.
    #[inline]
    pub fn width_bytes(&self) -> u32 {
        self.width_dots.div_ceil(8)
    }
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self::MM58
    }
}

/// BLE write chunk size in bytes. Matches the 20-byte payload common to
/// default-MTU BLE links.
pub const CHUNK_SIZE: usize = 20;

/// Per-chunk write timeout. A write that exceeds this aborts the job.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long the manager scans for a lost device before giving up on
/// automatic reconnection.
pub const RECONNECT_SCAN_WINDOW: Duration = Duration::from_secs(5);

/// Vendor GATT service UUID prefix identifying supported printers
/// (case-insensitive match against the textual UUID).
pub const PRINTER_SERVICE_PREFIX: &str = "0000ff";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mm58_geometry() {
        let config = PaperConfig::MM58;
        assert_eq!(config.width_dots, 384);
        assert_eq!(config.width_bytes(), 48);
        assert_eq!(config.printable_width(), 344);
    }

    #[test]
    fn test_width_bytes_rounds_up() {
        let mut config = PaperConfig::MM58;
        config.width_dots = 385;
        assert_eq!(config.width_bytes(), 49);
    }
}
