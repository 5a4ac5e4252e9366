//! # Connection Manager
//!
//! Owns the single printer connection and its lifecycle:
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──ok──▶ Connected
//!      ▲                          │                  │
//!      │◀───────── Failed ◀──err──┘                  │ disconnect() /
//!      │                                             │ link lost
//!      └──────────────── Disconnecting ◀─────────────┘
//! ```
//!
//! The `Connecting` and `Disconnecting` states double as re-entrancy
//! guards: a call arriving while either is active fails with
//! [`ConnectError::Busy`] instead of queueing.
//!
//! ## Involuntary disconnects
//!
//! A status listener task watches the peripheral's link events. When the
//! link drops without [`disconnect`](ConnectionManager::disconnect) having
//! been called, the manager scans for the lost address for a bounded
//! window and reconnects if the device reappears. One attempt, no retry
//! loop; if the device stays out of range the user is notified and the
//! state settles at `Disconnected`.
//!
//! ## Preference
//!
//! After the first successful connect of a session with no stored
//! preference, the user is asked once (per device) whether to reconnect
//! automatically at startup. Opting in persists the address; a manual
//! disconnect clears it.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::ble::{BleBackend, LinkEvent, Peripheral};
use crate::error::ConnectError;
use crate::prefs::{PreferenceStore, PrinterPreference};
use crate::printer::config::RECONNECT_SCAN_WINDOW;

/// Lifecycle state of the managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    /// Transient: a connect attempt failed. Settles at `Disconnected`.
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Disconnecting => "Disconnecting",
            Self::Failed => "Connection failed",
        };
        f.write_str(text)
    }
}

/// Outbound user-facing notifications. The shell (CLI, UI) decides how to
/// present them; the manager only decides when they happen.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Fire-and-forget transient message.
    async fn toast(&self, message: &str);

    /// Yes/no question. Returning `false` declines.
    async fn confirm(&self, question: &str) -> bool;
}

/// Notifier that swallows everything.
pub struct SilentNotifier;

#[async_trait]
impl Notifier for SilentNotifier {
    async fn toast(&self, _message: &str) {}

    async fn confirm(&self, _question: &str) -> bool {
        false
    }
}

struct ActiveConnection<P> {
    peripheral: Arc<P>,
    /// Set before teardown so the listener can tell a manual disconnect
    /// from a lost link.
    user_initiated: Arc<AtomicBool>,
    listener: JoinHandle<()>,
}

struct ManagerCore<B: BleBackend> {
    backend: Arc<B>,
    prefs: Arc<dyn PreferenceStore>,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<ConnectionState>,
    active: tokio::sync::Mutex<Option<ActiveConnection<B::Peripheral>>>,
    /// Devices already offered the auto-reconnect prompt this session.
    prompted: Mutex<HashSet<String>>,
}

impl<B: BleBackend> ManagerCore<B> {
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            info!(from = %previous, to = %state, "connection state");
        }
    }
}

/// Handle to the connection state machine. Cheap to clone; clones share
/// the same managed connection.
pub struct ConnectionManager<B: BleBackend> {
    core: Arc<ManagerCore<B>>,
}

impl<B: BleBackend> Clone for ConnectionManager<B> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<B: BleBackend> ConnectionManager<B> {
    pub fn new(
        backend: Arc<B>,
        prefs: Arc<dyn PreferenceStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            core: Arc::new(ManagerCore {
                backend,
                prefs,
                notifier,
                state,
                active: tokio::sync::Mutex::new(None),
                prompted: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.core.state.borrow()
    }

    /// Watch state transitions. UI-facing; the receiver always holds the
    /// latest state.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.core.state.subscribe()
    }

    /// The connected peripheral, if any.
    pub async fn peripheral(&self) -> Option<Arc<B::Peripheral>> {
        self.core
            .active
            .lock()
            .await
            .as_ref()
            .map(|active| active.peripheral.clone())
    }

    /// Connect to the device with the given address.
    ///
    /// An existing connection to another device is torn down first. Fails
    /// with [`ConnectError::Busy`] while a connect or disconnect is in
    /// flight.
    pub async fn connect(&self, address: &str) -> Result<(), ConnectError> {
        let mut active = self
            .core
            .active
            .try_lock()
            .map_err(|_| ConnectError::Busy)?;

        if let Some(previous) = active.take() {
            self.core.set_state(ConnectionState::Disconnecting);
            previous.user_initiated.store(true, Ordering::SeqCst);
            previous.peripheral.disconnect().await;
            previous.listener.abort();
            self.core.set_state(ConnectionState::Disconnected);
        }

        self.core.set_state(ConnectionState::Connecting);
        let peripheral = match self.core.backend.connect(address).await {
            Ok(p) => Arc::new(p),
            Err(e) => {
                warn!(address, error = %e, "connection failed");
                self.core.set_state(ConnectionState::Failed);
                self.core.set_state(ConnectionState::Disconnected);
                self.core.notifier.toast("Could not connect to printer").await;
                return Err(e);
            }
        };

        let user_initiated = Arc::new(AtomicBool::new(false));
        let listener = spawn_status_listener(
            self.core.clone(),
            peripheral.clone(),
            user_initiated.clone(),
        );
        *active = Some(ActiveConnection {
            peripheral,
            user_initiated,
            listener,
        });
        drop(active);

        self.core.set_state(ConnectionState::Connected);
        self.core
            .notifier
            .toast(&format!("Connected to {address}"))
            .await;
        self.offer_auto_reconnect(address).await;
        Ok(())
    }

    /// Tear down the current connection and forget the stored preference.
    /// No-op when already disconnected.
    pub async fn disconnect(&self) -> Result<(), ConnectError> {
        let mut active = self
            .core
            .active
            .try_lock()
            .map_err(|_| ConnectError::Busy)?;

        let Some(current) = active.take() else {
            return Ok(());
        };

        // Flag first: the platform disconnect event must read it as manual.
        current.user_initiated.store(true, Ordering::SeqCst);
        self.core.set_state(ConnectionState::Disconnecting);
        current.peripheral.disconnect().await;
        current.listener.abort();
        self.core.set_state(ConnectionState::Disconnected);
        drop(active);

        if let Err(e) = self.core.prefs.clear().await {
            warn!(error = %e, "failed to clear printer preference");
        }
        self.core.notifier.toast("Printer disconnected").await;
        Ok(())
    }

    /// Silently reconnect to the remembered printer, if the user opted in.
    /// Returns whether an attempt was made.
    pub async fn reconnect_on_startup(&self) -> Result<bool, ConnectError> {
        let Some(pref) = self.core.prefs.load().await else {
            return Ok(false);
        };
        if !pref.auto_reconnect {
            return Ok(false);
        }
        info!(address = %pref.device_address, "reconnecting to remembered printer");
        self.connect(&pref.device_address).await?;
        Ok(true)
    }

    /// Ask once per device per session whether to remember this printer.
    async fn offer_auto_reconnect(&self, address: &str) {
        if self.core.prefs.load().await.is_some() {
            return;
        }
        {
            let mut prompted = self.core.prompted.lock().unwrap();
            if !prompted.insert(address.to_string()) {
                return;
            }
        }
        if self
            .core
            .notifier
            .confirm("Reconnect to this printer automatically on startup?")
            .await
        {
            let pref = PrinterPreference {
                device_address: address.to_string(),
                auto_reconnect: true,
            };
            if let Err(e) = self.core.prefs.save(&pref).await {
                warn!(error = %e, "failed to persist printer preference");
            }
        }
    }
}

/// One task per active connection, consuming link events until the
/// connection ends.
fn spawn_status_listener<B: BleBackend>(
    core: Arc<ManagerCore<B>>,
    peripheral: Arc<B::Peripheral>,
    user_initiated: Arc<AtomicBool>,
) -> JoinHandle<()> {
    let mut events = peripheral.link_events();
    tokio::spawn(async move {
        while let Some(LinkEvent::Disconnected) = events.recv().await {
            if user_initiated.load(Ordering::SeqCst) {
                // Manual teardown owns the state transitions.
                return;
            }
            let address = peripheral.address();
            warn!(%address, "link lost");
            // The dead connection must not outlive the link; reconnect
            // re-installs a fresh one only on success.
            core.active.lock().await.take();
            core.set_state(ConnectionState::Disconnected);
            core.notifier.toast("Printer connection lost").await;
            attempt_reconnect(core, address).await;
            return;
        }
    })
}

/// One bounded reconnect: scan for the lost address, reconnect on sight.
async fn attempt_reconnect<B: BleBackend>(core: Arc<ManagerCore<B>>, address: String) {
    info!(%address, window = ?RECONNECT_SCAN_WINDOW, "searching for lost printer");

    if !scan_for(&*core.backend, &address, RECONNECT_SCAN_WINDOW).await {
        info!(%address, "printer not seen, giving up");
        core.notifier.toast("Printer out of range").await;
        core.set_state(ConnectionState::Disconnected);
        return;
    }

    core.set_state(ConnectionState::Connecting);
    match core.backend.connect(&address).await {
        Ok(p) => {
            let peripheral = Arc::new(p);
            let user_initiated = Arc::new(AtomicBool::new(false));
            let listener =
                spawn_status_listener(core.clone(), peripheral.clone(), user_initiated.clone());
            *core.active.lock().await = Some(ActiveConnection {
                peripheral,
                user_initiated,
                listener,
            });
            core.set_state(ConnectionState::Connected);
            core.notifier.toast("Printer reconnected").await;
        }
        Err(e) => {
            warn!(%address, error = %e, "reconnect failed");
            core.set_state(ConnectionState::Failed);
            core.set_state(ConnectionState::Disconnected);
        }
    }
}

/// Whether `address` advertises within `window`. The scan ending early
/// counts as not seen.
async fn scan_for<B: BleBackend>(backend: &B, address: &str, window: Duration) -> bool {
    let (tx, mut rx) = mpsc::channel(32);
    if backend.start_scan(tx).await.is_err() {
        return false;
    }

    let found = tokio::time::timeout(window, async {
        while let Some(adv) = rx.recv().await {
            if adv.address == address {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false);

    backend.stop_scan().await;
    found
}
