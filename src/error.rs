//! # Error Types
//!
//! Failure taxonomy for the printer subsystem. Each stage of the pipeline
//! (discovery, connection, rendering, transport) has its own error enum so
//! callers can react per-stage; [`EtiquetaError`] wraps them for code that
//! spans the whole pipeline (the CLI, high-level print calls).

use thiserror::Error;

/// Errors raised while scanning for nearby devices.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The Bluetooth adapter is turned off or missing.
    #[error("Bluetooth adapter is disabled or unavailable")]
    AdapterDisabled,

    /// The platform denied scan permission.
    #[error("Bluetooth scan permission denied")]
    PermissionDenied,

    /// A scan session is already running. Only one is permitted at a time.
    #[error("a scan is already in progress")]
    AlreadyScanning,

    /// Platform scan machinery failed.
    #[error("scan failed: {0}")]
    Platform(String),
}

/// Errors raised while establishing a connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The platform did not complete the connection in time.
    #[error("connection timed out")]
    Timeout,

    /// The platform denied connect permission.
    #[error("Bluetooth connect permission denied")]
    PermissionDenied,

    /// No device with the requested address is known to the platform.
    #[error("device {0} not found")]
    NotFound(String),

    /// The platform accepted the request but refused the connection.
    #[error("connection rejected: {0}")]
    PlatformRejected(String),

    /// A connect or disconnect is already in flight.
    #[error("a connection attempt is already in progress")]
    Busy,
}

/// Errors raised while transmitting a print job over BLE.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No GATT service matching the printer vendor prefix was found.
    #[error("no printer service on this device")]
    NoPrinterService,

    /// The printer service exposes no write-capable characteristic.
    #[error("printer service has no writable characteristic")]
    NoWritableCharacteristic,

    /// A chunk write exceeded the per-write timeout.
    #[error("write timed out after {0} of {1} chunks")]
    WriteTimeout(usize, usize),

    /// The platform reported a write failure.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// No active connection to write to.
    #[error("not connected")]
    NotConnected,

    /// Platform GATT failure during service discovery.
    #[error("GATT error: {0}")]
    Gatt(String),
}

/// Errors raised while rendering content to a bitmap.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The input bytes could not be decoded as an image.
    #[error("undecodable image: {0}")]
    Undecodable(String),
}

/// Top-level error for operations that cross pipeline stages.
#[derive(Debug, Error)]
pub enum EtiquetaError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// I/O error wrapper (preference file, CLI input).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Application-level failure (bad CLI input, no remembered printer).
    #[error("{0}")]
    App(String),
}
