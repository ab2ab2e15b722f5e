//! Last-used request parameters
//!
//! Settings are a plain key-value record. Whatever was saved is merged over
//! the defaults field by field, so older or partial records still load.

use crate::{QrRenderRequest, Result};
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Key the request record is stored under
pub const SETTINGS_KEY: &str = "studio.workingon.qrcode.settings";

/// Defaults applied under any saved values
pub fn default_settings() -> QrRenderRequest {
    QrRenderRequest {
        url: "https://wo.studio".to_string(),
        color: "#000000".to_string(),
        size: 150,
        margin: 0,
    }
}

/// A saved record where every field may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PartialSettings {
    pub url: Option<String>,
    pub color: Option<String>,
    pub size: Option<u32>,
    pub margin: Option<u32>,
}

impl PartialSettings {
    /// Fill gaps from `base`
    pub fn merge_over(self, base: QrRenderRequest) -> QrRenderRequest {
        QrRenderRequest {
            url: self.url.unwrap_or(base.url),
            color: self.color.unwrap_or(base.color),
            size: self.size.unwrap_or(base.size),
            margin: self.margin.unwrap_or(base.margin),
        }
    }
}

/// Key-value persistence for JSON values
pub trait SettingsStore: Send + Sync {
    fn load_value(&self, key: &str) -> Result<Option<Value>>;
    fn save_value(&self, key: &str, value: Value) -> Result<()>;
}

/// In-process store, used in tests and as a throwaway default
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn load_value(&self, key: &str) -> Result<Option<Value>> {
        let values = self
            .values
            .lock()
            .map_err(|e| crate::Error::Settings(format!("store lock poisoned: {}", e)))?;
        Ok(values.get(key).cloned())
    }

    fn save_value(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| crate::Error::Settings(format!("store lock poisoned: {}", e)))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Store backed by a single JSON object file, one entry per key
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<serde_json::Map<String, Value>> {
        if !self.path.exists() {
            return Ok(serde_json::Map::new());
        }
        let text = std::fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(serde_json::Map::new());
        }
        match serde_json::from_str(&text)? {
            Value::Object(map) => Ok(map),
            _ => Err(crate::Error::Settings(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
        }
    }
}

impl SettingsStore for JsonFileStore {
    fn load_value(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all()?.remove(key))
    }

    fn save_value(&self, key: &str, value: Value) -> Result<()> {
        let mut all = self.read_all()?;
        all.insert(key.to_string(), value);
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&Value::Object(all))?)?;
        Ok(())
    }
}

/// Load saved settings merged over [`default_settings`]
pub fn load_settings(store: &dyn SettingsStore) -> Result<QrRenderRequest> {
    let saved = store.load_value(SETTINGS_KEY)?;
    debug!("loading settings: {:?}", saved);
    match saved {
        Some(value) => {
            let partial: PartialSettings = serde_json::from_value(value)?;
            Ok(partial.merge_over(default_settings()))
        }
        None => Ok(default_settings()),
    }
}

pub fn save_settings(store: &dyn SettingsStore, settings: &QrRenderRequest) -> Result<()> {
    debug!("saving settings: {:?}", settings);
    store.save_value(SETTINGS_KEY, serde_json::to_value(settings)?)
}
