//! # Persisted Printer Preference
//!
//! Durable record of the last connected printer and whether the user
//! opted into silent reconnection. Read once at startup, written after a
//! successful connect when the user opts in, cleared on manual disconnect.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// The persisted key/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterPreference {
    /// Platform address of the last connected printer.
    pub device_address: String,
    /// Whether to reconnect silently at startup.
    pub auto_reconnect: bool,
}

/// Storage seam for the preference. The file-backed implementation is the
/// production path; tests use [`MemoryPreferenceStore`].
#[async_trait]
pub trait PreferenceStore: Send + Sync + 'static {
    /// Load the stored preference, if any. Unreadable or corrupt data
    /// reads as absent.
    async fn load(&self) -> Option<PrinterPreference>;

    async fn save(&self, pref: &PrinterPreference) -> io::Result<()>;

    async fn clear(&self) -> io::Result<()>;
}

/// JSON file store.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PreferenceStore for FilePreferenceStore {
    async fn load(&self) -> Option<PrinterPreference> {
        let bytes = tokio::fs::read(&self.path).await.ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    async fn save(&self, pref: &PrinterPreference) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(pref)?;
        tokio::fs::write(&self.path, json).await
    }

    async fn clear(&self) -> io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    inner: Mutex<Option<PrinterPreference>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a stored preference.
    pub fn with(pref: PrinterPreference) -> Self {
        Self {
            inner: Mutex::new(Some(pref)),
        }
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn load(&self) -> Option<PrinterPreference> {
        self.inner.lock().await.clone()
    }

    async fn save(&self, pref: &PrinterPreference) -> io::Result<()> {
        *self.inner.lock().await = Some(pref.clone());
        Ok(())
    }

    async fn clear(&self) -> io::Result<()> {
        *self.inner.lock().await = None;
        Ok(())
    }
}
