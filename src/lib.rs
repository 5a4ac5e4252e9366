//! # Etiqueta - BLE Thermal Label Printer Library
//!
//! Etiqueta drives 58mm thermal label printers over Bluetooth Low Energy.
//! It provides:
//!
//! - **Discovery**: scan sessions with deduplication and device icons
//! - **Connection management**: a guarded state machine with bounded
//!   auto-reconnect and a remembered-printer preference
//! - **Rendering**: styled text (inline markup, word wrap, bitmap fonts)
//!   and image/QR rasterization at paper width
//! - **Protocol**: ESC/POS raster graphics encoding
//! - **Transport**: chunked GATT writes with per-write timeouts
//!
//! ## Quick Start
//!
#![cfg_attr(feature = "ble", doc = "```no_run")]
#![cfg_attr(not(feature = "ble"), doc = "```ignore")]
//! use std::sync::Arc;
//! use etiqueta::{
//!     backend::BtleBackend,
//!     manager::{ConnectionManager, SilentNotifier},
//!     prefs::FilePreferenceStore,
//!     printer::Printer,
//!     render::TextAlign,
//! };
//!
//! # async fn demo() -> Result<(), etiqueta::EtiquetaError> {
//! // Open the platform Bluetooth stack
//! let backend = Arc::new(BtleBackend::new().await?);
//!
//! // Connect to a known printer
//! let manager = ConnectionManager::new(
//!     backend,
//!     Arc::new(FilePreferenceStore::new("printer.json")),
//!     Arc::new(SilentNotifier),
//! );
//! manager.connect("AA:BB:CC:DD:EE:FF").await?;
//!
//! // Print a label
//! let peripheral = manager.peripheral().await.expect("connected");
//! let printer = Printer::new(&*peripheral);
//! printer.print_text("<C><B>Hello", TextAlign::Left).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`discovery`] | Scan sessions over a BLE backend |
//! | [`manager`] | Connection state machine and auto-reconnect |
//! | [`render`] | Text and image rasterization |
//! | [`protocol`] | ESC/POS command and raster encoding |
//! | [`transport`] | Chunked characteristic writes |
//! | [`printer`] | High-level print operations and paper geometry |
//! | [`prefs`] | Remembered-printer persistence |
//! | [`backend`] | Platform BLE backends (btleplug) |
//! | [`error`] | Error types |
//!
//! ## Supported Printers
//!
//! Any BLE thermal printer exposing the common `0000ff`-prefixed vendor
//! GATT service with a writable characteristic. Tested against 58mm
//! (384 dot) label printers of the PP/MTP/POS families.

pub mod backend;
pub mod ble;
pub mod device;
pub mod discovery;
pub mod error;
pub mod manager;
pub mod prefs;
pub mod printer;
pub mod protocol;
pub mod render;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

// Re-exports for convenience
pub use device::{DeviceIcon, DiscoveredDevice};
pub use error::EtiquetaError;
pub use manager::{ConnectionManager, ConnectionState};
pub use printer::{PaperConfig, Printer};
