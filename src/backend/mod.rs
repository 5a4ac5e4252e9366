//! # Platform Backends
//!
//! Concrete [`BleBackend`](crate::ble::BleBackend) implementations. The
//! `ble` feature enables the btleplug-based backend, which covers Linux
//! (BlueZ), macOS (CoreBluetooth) and Windows (WinRT).

#[cfg(feature = "ble")]
pub mod btle;

#[cfg(feature = "ble")]
pub use btle::BtleBackend;
