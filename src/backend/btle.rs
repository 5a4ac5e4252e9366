//! # btleplug Backend
//!
//! [`BleBackend`] implementation over the btleplug cross-platform BLE
//! stack. One central event pump runs for the lifetime of the backend and
//! fans events out:
//!
//! - device discovered/updated events become [`Advertisement`]s for the
//!   active scan, if any
//! - device disconnected events become [`LinkEvent`]s for subscribers of
//!   the matching peripheral
//!
//! Addresses are btleplug `PeripheralId`s in textual form; they are the
//! opaque handles the rest of the crate passes around.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, CharPropFlags, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral as PlatformPeripheral};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ble::{
    Advertisement, BleBackend, CharacteristicInfo, LinkEvent, Peripheral, ServiceInfo,
};
use crate::error::{ConnectError, DiscoveryError, TransportError};

/// How long to wait for the platform to complete a connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

type LinkSubscribers = Arc<Mutex<HashMap<String, Vec<mpsc::Sender<LinkEvent>>>>>;

/// Cross-platform BLE backend.
pub struct BtleBackend {
    adapter: Adapter,
    scan_tx: Arc<Mutex<Option<mpsc::Sender<Advertisement>>>>,
    link_subscribers: LinkSubscribers,
}

impl BtleBackend {
    /// Open the first available adapter and start the event pump.
    pub async fn new() -> Result<Self, DiscoveryError> {
        let manager = Manager::new()
            .await
            .map_err(|e| DiscoveryError::Platform(e.to_string()))?;
        let adapter = manager
            .adapters()
            .await
            .map_err(|e| DiscoveryError::Platform(e.to_string()))?
            .into_iter()
            .next()
            .ok_or(DiscoveryError::AdapterDisabled)?;

        let backend = Self {
            adapter,
            scan_tx: Arc::new(Mutex::new(None)),
            link_subscribers: Arc::new(Mutex::new(HashMap::new())),
        };
        backend.spawn_event_pump().await?;
        Ok(backend)
    }

    async fn spawn_event_pump(&self) -> Result<(), DiscoveryError> {
        let mut events = self
            .adapter
            .events()
            .await
            .map_err(|e| DiscoveryError::Platform(e.to_string()))?;

        let adapter = self.adapter.clone();
        let scan_tx = self.scan_tx.clone();
        let link_subscribers = self.link_subscribers.clone();

        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                        let tx = scan_tx.lock().unwrap().clone();
                        let Some(tx) = tx else { continue };
                        let Ok(peripheral) = adapter.peripheral(&id).await else {
                            continue;
                        };
                        let properties = match peripheral.properties().await {
                            Ok(Some(p)) => p,
                            _ => continue,
                        };
                        let adv = Advertisement {
                            name: properties.local_name,
                            address: id.to_string(),
                            class_major: properties.class.map(|c| c & 0x1F00),
                        };
                        // Full buffer means the consumer is behind; the
                        // device will advertise again.
                        let _ = tx.try_send(adv);
                    }
                    CentralEvent::DeviceDisconnected(id) => {
                        let address = id.to_string();
                        debug!(%address, "platform reported disconnect");
                        let mut subscribers = link_subscribers.lock().unwrap();
                        if let Some(subs) = subscribers.get_mut(&address) {
                            subs.retain(|tx| tx.try_send(LinkEvent::Disconnected).is_ok());
                        }
                    }
                    _ => {}
                }
            }
            warn!("adapter event stream ended");
        });
        Ok(())
    }
}

#[async_trait]
impl BleBackend for BtleBackend {
    type Peripheral = BtlePeripheral;

    async fn adapter_enabled(&self) -> Result<bool, DiscoveryError> {
        // btleplug has no portable powered-state query; a responsive
        // adapter is treated as enabled.
        Ok(self.adapter.adapter_info().await.is_ok())
    }

    async fn start_scan(&self, events: mpsc::Sender<Advertisement>) -> Result<(), DiscoveryError> {
        {
            let mut scan_tx = self.scan_tx.lock().unwrap();
            // One scan subscription at a time; a second start must not
            // hijack the live advertisement stream.
            if scan_tx.is_some() {
                return Err(DiscoveryError::AlreadyScanning);
            }
            *scan_tx = Some(events);
        }
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| {
                *self.scan_tx.lock().unwrap() = None;
                DiscoveryError::Platform(e.to_string())
            })
    }

    async fn stop_scan(&self) {
        self.scan_tx.lock().unwrap().take();
        if let Err(e) = self.adapter.stop_scan().await {
            warn!(error = %e, "stop scan failed");
        }
    }

    async fn connect(&self, address: &str) -> Result<Self::Peripheral, ConnectError> {
        let peripherals = self
            .adapter
            .peripherals()
            .await
            .map_err(|e| ConnectError::PlatformRejected(e.to_string()))?;
        let peripheral = peripherals
            .into_iter()
            .find(|p| p.id().to_string() == address)
            .ok_or_else(|| ConnectError::NotFound(address.to_string()))?;

        match tokio::time::timeout(CONNECT_TIMEOUT, peripheral.connect()).await {
            Ok(Ok(())) => {}
            Ok(Err(btleplug::Error::PermissionDenied)) => {
                return Err(ConnectError::PermissionDenied);
            }
            Ok(Err(btleplug::Error::DeviceNotFound)) => {
                return Err(ConnectError::NotFound(address.to_string()));
            }
            Ok(Err(e)) => return Err(ConnectError::PlatformRejected(e.to_string())),
            Err(_) => return Err(ConnectError::Timeout),
        }

        peripheral
            .discover_services()
            .await
            .map_err(|e| ConnectError::PlatformRejected(e.to_string()))?;

        debug!(%address, "connected");
        Ok(BtlePeripheral {
            inner: peripheral,
            address: address.to_string(),
            link_subscribers: self.link_subscribers.clone(),
        })
    }
}

/// A connected btleplug peripheral.
pub struct BtlePeripheral {
    inner: PlatformPeripheral,
    address: String,
    link_subscribers: LinkSubscribers,
}

#[async_trait]
impl Peripheral for BtlePeripheral {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn services(&self) -> Result<Vec<ServiceInfo>, TransportError> {
        // Populated at connect time by discover_services.
        Ok(self
            .inner
            .services()
            .into_iter()
            .map(|service| ServiceInfo {
                uuid: service.uuid,
                characteristics: service
                    .characteristics
                    .into_iter()
                    .map(|c| CharacteristicInfo {
                        uuid: c.uuid,
                        write: c.properties.contains(CharPropFlags::WRITE),
                        write_without_response: c
                            .properties
                            .contains(CharPropFlags::WRITE_WITHOUT_RESPONSE),
                    })
                    .collect(),
            })
            .collect())
    }

    async fn write(
        &self,
        _service: Uuid,
        characteristic: Uuid,
        chunk: &[u8],
        with_response: bool,
    ) -> Result<(), TransportError> {
        let target = self
            .inner
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == characteristic)
            .ok_or_else(|| TransportError::Gatt(format!("characteristic {characteristic} lost")))?;

        let write_type = if with_response {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };

        self.inner
            .write(&target, chunk, write_type)
            .await
            .map_err(|e| TransportError::WriteFailed(e.to_string()))
    }

    async fn disconnect(&self) {
        if let Err(e) = self.inner.disconnect().await {
            warn!(address = %self.address, error = %e, "disconnect failed");
        }
    }

    fn link_events(&self) -> mpsc::Receiver<LinkEvent> {
        let (tx, rx) = mpsc::channel(4);
        self.link_subscribers
            .lock()
            .unwrap()
            .entry(self.address.clone())
            .or_default()
            .push(tx);
        rx
    }
}
