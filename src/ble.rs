//! # BLE Backend Traits
//!
//! The seam between the printer subsystem and the platform Bluetooth
//! stack. Each target platform provides one [`BleBackend`] implementation
//! (selected via cargo feature); everything above this module (discovery,
//! the connection manager, the transport) is platform-independent and
//! testable against an in-memory backend.

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{ConnectError, DiscoveryError, TransportError};

/// A raw advertisement forwarded by a scan backend. Deduplication and
/// icon classification happen above this layer.
#[derive(Debug, Clone)]
pub struct Advertisement {
    /// Advertised local name, if any. Nameless devices are dropped later.
    pub name: Option<String>,
    /// Opaque platform connection handle; unique per device.
    pub address: String,
    /// Bluetooth class-of-device major bits, when the platform reports them.
    pub class_major: Option<u32>,
}

/// A GATT characteristic and its write capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicInfo {
    pub uuid: Uuid,
    pub write: bool,
    pub write_without_response: bool,
}

impl CharacteristicInfo {
    /// Whether the characteristic accepts writes in any form.
    #[inline]
    pub fn writable(&self) -> bool {
        self.write || self.write_without_response
    }
}

/// A GATT service and its characteristics.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub uuid: Uuid,
    pub characteristics: Vec<CharacteristicInfo>,
}

/// Connection-level events delivered by the platform stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// The link dropped, voluntarily or not; the manager decides which
    /// by consulting its user-initiated flag.
    Disconnected,
}

/// An established connection to a remote device.
#[async_trait]
pub trait Peripheral: Send + Sync + 'static {
    /// The platform handle this connection was opened with.
    fn address(&self) -> String;

    /// Enumerate GATT services. Implementations may serve a cached copy
    /// populated at connect time.
    async fn services(&self) -> Result<Vec<ServiceInfo>, TransportError>;

    /// Write one chunk to a characteristic. `with_response` requests a
    /// write-with-response GATT operation.
    async fn write(
        &self,
        service: Uuid,
        characteristic: Uuid,
        chunk: &[u8],
        with_response: bool,
    ) -> Result<(), TransportError>;

    /// Tear the link down. Idempotent.
    async fn disconnect(&self);

    /// Subscribe to link state events. Each call returns an independent
    /// receiver; events delivered after all receivers are dropped are
    /// discarded.
    fn link_events(&self) -> mpsc::Receiver<LinkEvent>;
}

/// Platform Bluetooth stack: scanning plus connection establishment.
#[async_trait]
pub trait BleBackend: Send + Sync + 'static {
    type Peripheral: Peripheral;

    /// Whether the adapter is present and powered.
    async fn adapter_enabled(&self) -> Result<bool, DiscoveryError>;

    /// Start scanning, forwarding advertisements into `events` until
    /// [`stop_scan`](Self::stop_scan) is called or the receiver is dropped.
    /// Only one scan subscription is permitted at a time; starting a
    /// second fails with [`DiscoveryError::AlreadyScanning`].
    async fn start_scan(&self, events: mpsc::Sender<Advertisement>) -> Result<(), DiscoveryError>;

    /// Stop an in-progress scan. No-op when idle.
    async fn stop_scan(&self);

    /// Open a connection to the device with the given address.
    async fn connect(&self, address: &str) -> Result<Self::Peripheral, ConnectError>;
}
