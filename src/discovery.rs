//! # Device Discovery
//!
//! Wraps a platform scan backend in a session abstraction:
//!
//! - one session at a time; starting a second is rejected, not queued
//! - nameless devices are skipped
//! - duplicate addresses within a session are suppressed
//! - dropping the session stops the scan and guarantees no further events
//!
//! The session owns the receiving half of the event channel, so "no events
//! after drop" holds by construction: there is no delegate to forget to
//! unsubscribe.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::debug;

use crate::ble::BleBackend;
use crate::device::DiscoveredDevice;
use crate::error::DiscoveryError;

/// Buffer for in-flight device events. Scans trickle results, so a small
/// buffer is enough.
const EVENT_BUFFER: usize = 32;

/// Discovery front-end over a scan backend.
pub struct Discovery<B: BleBackend> {
    backend: Arc<B>,
    scanning: Arc<AtomicBool>,
}

impl<B: BleBackend> Discovery<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            scanning: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a session is currently active.
    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    /// Start a scan session.
    ///
    /// Fails with [`DiscoveryError::AlreadyScanning`] if a session is
    /// active, and with `AdapterDisabled`/`PermissionDenied` before any
    /// platform scan is attempted.
    pub async fn start(&self) -> Result<ScanSession<B>, DiscoveryError> {
        if self.scanning.swap(true, Ordering::SeqCst) {
            return Err(DiscoveryError::AlreadyScanning);
        }

        let result = self.start_inner().await;
        if result.is_err() {
            self.scanning.store(false, Ordering::SeqCst);
        }
        result
    }

    async fn start_inner(&self) -> Result<ScanSession<B>, DiscoveryError> {
        if !self.backend.adapter_enabled().await? {
            return Err(DiscoveryError::AdapterDisabled);
        }

        let (raw_tx, mut raw_rx) = mpsc::channel(EVENT_BUFFER);
        self.backend.start_scan(raw_tx).await?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(async move {
            let mut seen: HashSet<String> = HashSet::new();
            while let Some(adv) = raw_rx.recv().await {
                let Some(name) = adv.name.filter(|n| !n.trim().is_empty()) else {
                    continue;
                };
                if !seen.insert(adv.address.clone()) {
                    continue;
                }
                let device = DiscoveredDevice::new(name, adv.address, adv.class_major);
                debug!(name = %device.name, address = %device.address, icon = %device.icon, "device found");
                if tx.send(device).await.is_err() {
                    // Session dropped; stop forwarding.
                    break;
                }
            }
        });

        debug!("scan session started");
        Ok(ScanSession {
            rx,
            scanning: self.scanning.clone(),
            backend: self.backend.clone(),
        })
    }
}

/// Handle to an active scan. Receive devices with [`recv`](Self::recv);
/// drop the session (or let it fall out of scope) to stop scanning.
pub struct ScanSession<B: BleBackend> {
    rx: mpsc::Receiver<DiscoveredDevice>,
    scanning: Arc<AtomicBool>,
    backend: Arc<B>,
}

impl<B: BleBackend> ScanSession<B> {
    /// Next newly-seen device, or `None` when the backend ends the scan.
    pub async fn recv(&mut self) -> Option<DiscoveredDevice> {
        self.rx.recv().await
    }
}

impl<B: BleBackend> Drop for ScanSession<B> {
    fn drop(&mut self) {
        self.rx.close();
        self.scanning.store(false, Ordering::SeqCst);
        let backend = self.backend.clone();
        tokio::spawn(async move {
            backend.stop_scan().await;
            debug!("scan session stopped");
        });
    }
}
