//! Session delegates
//!
//! When a response carries a session fragment (`s`), the store forwards it
//! to its delegate. The store never reads the session back.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::sync::watch;
use tracing::warn;

/// Receives session fragments from the server
pub trait SessionDelegate: Send + Sync {
    fn set(&self, value: Value);
}

/// In-memory session holder
///
/// Consumers can read the latest fragment or await changes.
#[derive(Debug)]
pub struct SessionSlot {
    tx: watch::Sender<Option<Value>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// The latest fragment, if any was forwarded
    pub fn get(&self) -> Option<Value> {
        self.tx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Option<Value>> {
        self.tx.subscribe()
    }
}

impl Default for SessionSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionDelegate for SessionSlot {
    fn set(&self, value: Value) {
        self.tx.send_replace(Some(value));
    }
}

/// Session persisted as a JSON file
#[derive(Debug, Clone)]
pub struct FileSession {
    path: PathBuf,
}

impl FileSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored fragment; `None` if nothing was saved yet
    pub fn load(&self) -> Result<Option<Value>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file: {:?}", self.path))?;
        let value = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse session file: {:?}", self.path))?;
        Ok(Some(value))
    }

    /// Write a fragment to disk
    pub fn save(&self, value: &Value) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&self.path, json).context("Failed to save session")?;
        Ok(())
    }

    /// Remove the stored fragment
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove session file: {:?}", self.path))?;
        }
        Ok(())
    }
}

impl SessionDelegate for FileSession {
    fn set(&self, value: Value) {
        if let Err(e) = self.save(&value) {
            warn!("Failed to persist session: {:#}", e);
        }
    }
}
