//! In-memory backend and peripheral for exercising discovery, transport
//! and the connection manager without a Bluetooth stack.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::ble::{
    Advertisement, BleBackend, CharacteristicInfo, LinkEvent, Peripheral, ServiceInfo,
};
use crate::error::{ConnectError, DiscoveryError, TransportError};

const PRINTER_SERVICE: &str = "0000ff00-0000-1000-8000-00805f9b34fb";
const PRINTER_WRITE_CHAR: &str = "0000ff02-0000-1000-8000-00805f9b34fb";
const OTHER_SERVICE: &str = "0000180a-0000-1000-8000-00805f9b34fb";

fn uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).unwrap()
}

/// Shared-state peripheral. Clones refer to the same device, so a test
/// can keep a handle after the manager takes ownership.
#[derive(Clone)]
pub(crate) struct MockPeripheral {
    inner: Arc<PeripheralInner>,
}

struct PeripheralInner {
    address: String,
    services: Vec<ServiceInfo>,
    written: Mutex<Vec<Vec<u8>>>,
    fail_after: Mutex<Option<usize>>,
    subscribers: Mutex<Vec<mpsc::Sender<LinkEvent>>>,
    disconnected: AtomicBool,
}

impl MockPeripheral {
    fn with_services(address: &str, services: Vec<ServiceInfo>) -> Self {
        Self {
            inner: Arc::new(PeripheralInner {
                address: address.to_string(),
                services,
                written: Mutex::new(Vec::new()),
                fail_after: Mutex::new(None),
                subscribers: Mutex::new(Vec::new()),
                disconnected: AtomicBool::new(false),
            }),
        }
    }

    /// A printer exposing the vendor service with one writable
    /// characteristic (write-with-response capable).
    pub(crate) fn printer(address: &str) -> Self {
        Self::with_services(
            address,
            vec![
                ServiceInfo {
                    uuid: uuid(OTHER_SERVICE),
                    characteristics: vec![],
                },
                ServiceInfo {
                    uuid: uuid(PRINTER_SERVICE),
                    characteristics: vec![CharacteristicInfo {
                        uuid: uuid(PRINTER_WRITE_CHAR),
                        write: true,
                        write_without_response: true,
                    }],
                },
            ],
        )
    }

    /// A device without the printer vendor service.
    pub(crate) fn without_printer_service(address: &str) -> Self {
        Self::with_services(
            address,
            vec![ServiceInfo {
                uuid: uuid(OTHER_SERVICE),
                characteristics: vec![],
            }],
        )
    }

    /// A printer whose characteristic accepts no writes.
    pub(crate) fn printer_read_only(address: &str) -> Self {
        Self::with_services(
            address,
            vec![ServiceInfo {
                uuid: uuid(PRINTER_SERVICE),
                characteristics: vec![CharacteristicInfo {
                    uuid: uuid(PRINTER_WRITE_CHAR),
                    write: false,
                    write_without_response: false,
                }],
            }],
        )
    }

    /// Make writes fail after `n` successful chunks.
    pub(crate) fn fail_writes_after(&self, n: usize) {
        *self.inner.fail_after.lock().unwrap() = Some(n);
    }

    pub(crate) fn written_chunks(&self) -> Vec<Vec<u8>> {
        self.inner.written.lock().unwrap().clone()
    }

    pub(crate) fn is_disconnected(&self) -> bool {
        self.inner.disconnected.load(Ordering::SeqCst)
    }

    /// Simulate the platform reporting a dropped link.
    pub(crate) fn emit_disconnect(&self) {
        self.inner.disconnected.store(true, Ordering::SeqCst);
        let subscribers = self.inner.subscribers.lock().unwrap();
        for tx in subscribers.iter() {
            let _ = tx.try_send(LinkEvent::Disconnected);
        }
    }
}

#[async_trait]
impl Peripheral for MockPeripheral {
    fn address(&self) -> String {
        self.inner.address.clone()
    }

    async fn services(&self) -> Result<Vec<ServiceInfo>, TransportError> {
        Ok(self.inner.services.clone())
    }

    async fn write(
        &self,
        _service: Uuid,
        _characteristic: Uuid,
        chunk: &[u8],
        _with_response: bool,
    ) -> Result<(), TransportError> {
        let mut written = self.inner.written.lock().unwrap();
        if let Some(limit) = *self.inner.fail_after.lock().unwrap() {
            if written.len() >= limit {
                return Err(TransportError::WriteFailed("simulated failure".into()));
            }
        }
        written.push(chunk.to_vec());
        Ok(())
    }

    async fn disconnect(&self) {
        self.emit_disconnect();
    }

    fn link_events(&self) -> mpsc::Receiver<LinkEvent> {
        let (tx, rx) = mpsc::channel(4);
        self.inner.subscribers.lock().unwrap().push(tx);
        rx
    }
}

/// Scriptable backend: queue advertisements, register connectable
/// peripherals, toggle the adapter.
pub(crate) struct MockBackend {
    adapter_enabled: AtomicBool,
    advertisements: Mutex<Vec<Advertisement>>,
    peripherals: Mutex<HashMap<String, MockPeripheral>>,
    connects: AtomicUsize,
    scan_starts: AtomicUsize,
    scan_active: AtomicBool,
    connect_gate: Mutex<Option<Arc<tokio::sync::Notify>>>,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self {
            adapter_enabled: AtomicBool::new(true),
            advertisements: Mutex::new(Vec::new()),
            peripherals: Mutex::new(HashMap::new()),
            connects: AtomicUsize::new(0),
            scan_starts: AtomicUsize::new(0),
            scan_active: AtomicBool::new(false),
            connect_gate: Mutex::new(None),
        }
    }

    /// Make every `connect` wait for one `notify_one` on the returned
    /// handle, so a test can observe the Connecting state.
    pub(crate) fn gate_connects(&self) -> Arc<tokio::sync::Notify> {
        let gate = Arc::new(tokio::sync::Notify::new());
        *self.connect_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub(crate) fn set_adapter_enabled(&self, enabled: bool) {
        self.adapter_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Queue an advertisement; every scan replays the current queue.
    pub(crate) fn advertise(&self, name: &str, address: &str, class_major: Option<u32>) {
        self.advertisements.lock().unwrap().push(Advertisement {
            name: Some(name.to_string()),
            address: address.to_string(),
            class_major,
        });
    }

    /// Make `connect` succeed for this peripheral's address.
    pub(crate) fn register_peripheral(&self, peripheral: MockPeripheral) {
        self.peripherals
            .lock()
            .unwrap()
            .insert(peripheral.address(), peripheral);
    }

    /// Make `connect` fail for this address again.
    pub(crate) fn unregister_peripheral(&self, address: &str) {
        self.peripherals.lock().unwrap().remove(address);
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn scan_count(&self) -> usize {
        self.scan_starts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BleBackend for MockBackend {
    type Peripheral = MockPeripheral;

    async fn adapter_enabled(&self) -> Result<bool, DiscoveryError> {
        Ok(self.adapter_enabled.load(Ordering::SeqCst))
    }

    async fn start_scan(&self, events: mpsc::Sender<Advertisement>) -> Result<(), DiscoveryError> {
        if self.scan_active.swap(true, Ordering::SeqCst) {
            return Err(DiscoveryError::AlreadyScanning);
        }
        self.scan_starts.fetch_add(1, Ordering::SeqCst);
        let queued = self.advertisements.lock().unwrap().clone();
        tokio::spawn(async move {
            for adv in queued {
                if events.send(adv).await.is_err() {
                    break;
                }
            }
            // Sender drops here; a finite mock scan simply ends.
        });
        Ok(())
    }

    async fn stop_scan(&self) {
        self.scan_active.store(false, Ordering::SeqCst);
    }

    async fn connect(&self, address: &str) -> Result<Self::Peripheral, ConnectError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let gate = self.connect_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let peripheral = self
            .peripherals
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or_else(|| ConnectError::NotFound(address.to_string()))?;
        peripheral.inner.disconnected.store(false, Ordering::SeqCst);
        Ok(peripheral)
    }
}
