//! Device-local cart persistence.
//!
//! The anonymous cart is one JSON-serialized array of cart lines under a
//! fixed key in a synchronous key-value store. A record that is missing or
//! fails to parse loads as an empty cart - corrupt data is treated as empty,
//! not fatal.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use trolley_core::{Cart, CartLine};

use crate::error::{CartError, Result};

use super::CartBackend;

/// Fixed device-store key holding the anonymous cart record.
pub const CART_KEY: &str = "trolley.cart";

/// Synchronous local key-value storage.
///
/// Models platform storage such as browser local storage or an app's
/// preferences file: string keys, string values, best-effort durability.
pub trait DeviceStore: Send + Sync {
    /// Read the value for `key`, if present.
    fn get(&self, key: &str) -> Option<String>;

    /// Write the value for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if the value cannot be written.
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Delete the value for `key`, if present.
    fn delete(&self, key: &str);
}

/// In-memory device store. The default for tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| CartError::Storage("device store lock poisoned".to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.remove(key);
        }
    }
}

/// File-backed device store: one JSON file per key inside a directory.
///
/// Durability is best-effort; a read that fails for any reason behaves like
/// a missing key.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| CartError::Storage(format!("create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl DeviceStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        std::fs::write(&path, value)
            .map_err(|e| CartError::Storage(format!("write {}: {e}", path.display())))
    }

    fn delete(&self, key: &str) {
        let _ = std::fs::remove_file(self.path_for(key));
    }
}

/// Cart backend over a [`DeviceStore`].
///
/// The record is written whole from the store's published snapshot after
/// every local mutation, never derived from its own previous contents, so
/// it cannot drift from what subscribers saw.
pub struct DeviceBackend {
    store: Arc<dyn DeviceStore>,
}

impl DeviceBackend {
    #[must_use]
    pub fn new(store: Arc<dyn DeviceStore>) -> Self {
        Self { store }
    }

    /// Read and parse the cart record. Missing or corrupt records load as
    /// an empty cart.
    fn read(&self) -> Cart {
        let Some(raw) = self.store.get(CART_KEY) else {
            return Cart::default();
        };
        match serde_json::from_str::<Vec<CartLine>>(&raw) {
            Ok(lines) => Cart::from_lines(lines),
            Err(e) => {
                tracing::warn!(error = %e, "corrupt device cart record, treating as empty");
                Cart::default()
            }
        }
    }

    fn write(&self, cart: &Cart) -> Result<()> {
        let raw = serde_json::to_string(cart.lines())
            .map_err(|e| CartError::Storage(format!("serialize cart record: {e}")))?;
        self.store.put(CART_KEY, &raw)
    }
}

#[async_trait]
impl CartBackend for DeviceBackend {
    async fn load(&self) -> Result<Cart> {
        Ok(self.read())
    }

    async fn persist(&self, cart: &Cart) -> Result<()> {
        self.write(cart)
    }
}
