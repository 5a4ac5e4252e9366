//! # High-Level Printing
//!
//! [`Printer`] ties the pipeline together: render content to a
//! paper-width bitmap, encode it as an ESC/POS frame, deliver it over the
//! connected peripheral. One call per print job; failures abort the job
//! and surface as [`EtiquetaError`], retry is the caller's decision.

pub mod config;

pub use config::PaperConfig;

use image::GrayImage;
use tracing::info;

use crate::ble::Peripheral;
use crate::error::EtiquetaError;
use crate::protocol::raster;
use crate::render;
use crate::render::TextAlign;
use crate::transport;

/// A connected printer ready to accept jobs.
pub struct Printer<'a, P: Peripheral> {
    peripheral: &'a P,
    config: PaperConfig,
}

impl<'a, P: Peripheral> Printer<'a, P> {
    pub fn new(peripheral: &'a P) -> Self {
        Self::with_config(peripheral, PaperConfig::MM58)
    }

    pub fn with_config(peripheral: &'a P, config: PaperConfig) -> Self {
        Self { peripheral, config }
    }

    pub fn config(&self) -> &PaperConfig {
        &self.config
    }

    /// Print styled text. Inline tags select alignment and style; see
    /// [`render::text`].
    pub async fn print_text(
        &self,
        text: &str,
        default_align: TextAlign,
    ) -> Result<(), EtiquetaError> {
        let bitmap = render::render_text(text, default_align, &self.config);
        self.print_bitmap(&bitmap).await
    }

    /// Print an encoded image, scaled to the printable width.
    pub async fn print_image(&self, bytes: &[u8]) -> Result<(), EtiquetaError> {
        let bitmap = render::render_image(bytes, &self.config)?;
        self.print_bitmap(&bitmap).await
    }

    /// Print an encoded QR code, forced square with a quiet margin.
    pub async fn print_qr(&self, bytes: &[u8]) -> Result<(), EtiquetaError> {
        let bitmap = render::render_qr(bytes, &self.config)?;
        self.print_bitmap(&bitmap).await
    }

    /// Encode and transmit an already-rendered bitmap. The bitmap must be
    /// exactly the paper width.
    pub async fn print_bitmap(&self, bitmap: &GrayImage) -> Result<(), EtiquetaError> {
        debug_assert_eq!(bitmap.width(), self.config.width_dots);

        let frame = raster::frame(bitmap, self.config.binarize_threshold);
        info!(
            height = bitmap.height(),
            bytes = frame.len(),
            address = %self.peripheral.address(),
            "printing"
        );
        transport::send(self.peripheral, &frame).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPeripheral;
    use crate::printer::config::CHUNK_SIZE;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_print_text_transmits_frame() {
        let peripheral = MockPeripheral::printer("AA:BB");
        let printer = Printer::new(&peripheral);

        printer.print_text("hola", TextAlign::Left).await.unwrap();

        let sent: Vec<u8> = peripheral.written_chunks().concat();
        // Reset, then raster header.
        assert_eq!(&sent[0..2], &[0x1B, 0x40]);
        assert_eq!(&sent[2..6], &[0x1D, 0x76, 0x30, 0x00]);
        assert_eq!(sent[6], 48); // row stride for 384 dots
    }

    #[tokio::test]
    async fn test_print_bitmap_chunking() {
        let peripheral = MockPeripheral::printer("AA:BB");
        let printer = Printer::new(&peripheral);

        let bitmap = GrayImage::from_pixel(384, 4, image::Luma([255]));
        printer.print_bitmap(&bitmap).await.unwrap();

        // reset(2) + header(8) + 48 bytes x 4 rows
        let expected = 2 + 8 + 48 * 4;
        let chunks = peripheral.written_chunks();
        assert_eq!(chunks.concat().len(), expected);
        assert_eq!(chunks.len(), expected.div_ceil(CHUNK_SIZE));
    }

    #[tokio::test]
    async fn test_print_image_rejects_garbage() {
        let peripheral = MockPeripheral::printer("AA:BB");
        let printer = Printer::new(&peripheral);

        let err = printer.print_image(b"garbage").await.unwrap_err();
        assert!(matches!(err, EtiquetaError::Render(_)));
        // Nothing transmitted for a failed render.
        assert!(peripheral.written_chunks().is_empty());
    }
}
