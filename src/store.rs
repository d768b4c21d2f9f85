use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::StoreError;
use crate::palette::{DEFAULT_THEME, ThemeEntry};

pub const THEME_KEY: &str = "colorValue";
pub const DISABLED_SITES_KEY: &str = "disabledSites";

/// Persistent key/value storage that survives page reloads.
pub trait ConfigStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// Reads `key`, falling back to `default` when it is missing or holds a
/// value of the wrong shape.
pub fn get_or<T: DeserializeOwned, S: ConfigStore + ?Sized>(store: &S, key: &str, default: T) -> T {
    match store.get(key) {
        Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "ignoring malformed store value");
            default
        }),
        None => default,
    }
}

pub fn set_typed<T: Serialize, S: ConfigStore + ?Sized>(store: &mut S, key: &str, value: &T) -> Result<(), StoreError> {
    let value = serde_json::to_value(value).map_err(|e| StoreError::Encode(key.to_string(), e))?;
    store.set(key, value)
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// A JSON object on disk. The file is created on first write.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, Value>,
}

impl FileStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let values = match std::fs::read_to_string(path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
                path: path.to_path_buf(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Ok(FileStore {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(write_err)?;
        }
        let body = serde_json::to_string_pretty(&self.values)
            .map_err(|e| StoreError::Encode(self.path.display().to_string(), e))?;
        std::fs::write(&self.path, body).map_err(write_err)
    }
}

impl ConfigStore for FileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        self.flush()
    }
}

/// Hostnames on which the engine stays inert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteScope {
    disabled: Vec<String>,
}

impl SiteScope {
    pub fn new(disabled: Vec<String>) -> Self {
        SiteScope { disabled }
    }

    pub fn is_disabled(&self, hostname: &str) -> bool {
        self.disabled.iter().any(|h| h == hostname)
    }

    pub fn disable(&mut self, hostname: &str) {
        self.disabled.push(hostname.to_string());
    }

    /// Removes every entry for `hostname`, duplicates included.
    pub fn enable(&mut self, hostname: &str) {
        self.disabled.retain(|h| h != hostname);
    }

    pub fn hostnames(&self) -> &[String] {
        &self.disabled
    }
}

/// User choices, resolved once per page load.
#[derive(Debug, Clone)]
pub struct Preferences {
    pub theme: &'static ThemeEntry,
    pub site_scope: SiteScope,
}

impl Preferences {
    pub fn load<S: ConfigStore + ?Sized>(store: &S) -> Self {
        let key: String = get_or(store, THEME_KEY, DEFAULT_THEME.to_string());
        let disabled: Vec<String> = get_or(store, DISABLED_SITES_KEY, Vec::new());
        Preferences {
            theme: ThemeEntry::resolve(&key),
            site_scope: SiteScope::new(disabled),
        }
    }
}
