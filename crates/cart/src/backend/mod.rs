//! Interchangeable cart persistence backends.
//!
//! Both variants sit behind the [`CartBackend`] trait, but their write paths
//! differ: the remote cart confirms individual line dispatches (`add_line`,
//! `update_line`, `remove_line`) against the server, while the device cart is
//! a single record written whole from the store's published snapshot
//! (`persist`). Each backend implements the half that is its real write path;
//! the other half defaults to a no-op, so the cart store drives every
//! mutation through the same dispatch-then-persist sequence.
//!
//! - [`DeviceBackend`] keeps an anonymous cart in a synchronous local
//!   key-value store.
//! - [`RemoteBackend`] talks to the remote inventory-aware cart service for
//!   an authenticated account.
//!
//! The [`BackendProvider`] selects a backend per identity; the cart store
//! never constructs backends itself, which is also the seam tests use to
//! script backend behavior.

pub mod device;
pub mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use trolley_core::{Cart, CartLine, ProductId};

use crate::error::Result;
use crate::identity::Identity;

pub use device::{DeviceBackend, DeviceStore, FileStore, MemoryStore};
pub use remote::{RemoteBackend, RemoteCartClient};

/// The persistence capability set shared by the device and remote backends.
///
/// Every method returns a uniform result with explicit error variants for
/// the expected failure modes (auth-missing, network-down) rather than
/// panicking through the caller.
#[async_trait]
pub trait CartBackend: Send + Sync {
    /// Cheap pre-flight check that a mutation can be attempted at all.
    ///
    /// The remote backend fails with
    /// [`CartError::AuthRequired`](crate::error::CartError::AuthRequired)
    /// when no bearer credential is set, so the store can reject the
    /// operation before publishing any optimistic snapshot change.
    fn ready(&self) -> Result<()> {
        Ok(())
    }

    /// Fetch the full authoritative cart.
    async fn load(&self) -> Result<Cart>;

    /// Dispatch a newly added (or folded) line.
    async fn add_line(&self, _line: &CartLine) -> Result<()> {
        Ok(())
    }

    /// Dispatch a quantity change for an existing line.
    async fn update_line(&self, _product_id: ProductId, _quantity: u32) -> Result<()> {
        Ok(())
    }

    /// Dispatch a line removal.
    async fn remove_line(&self, _product_id: ProductId) -> Result<()> {
        Ok(())
    }

    /// Write the full post-mutation snapshot.
    ///
    /// The device cart is a single record, so this is its whole write path
    /// and keeps the record equal to what subscribers saw published. The
    /// remote cart is authoritative server-side and leaves this a no-op.
    async fn persist(&self, _cart: &Cart) -> Result<()> {
        Ok(())
    }
}

/// Selects the persistence backend matching an identity.
pub trait BackendProvider: Send + Sync {
    fn backend_for(&self, identity: &Identity) -> Arc<dyn CartBackend>;
}

/// Production provider: device store for anonymous sessions, cart service
/// for authenticated accounts.
pub struct StorefrontBackends {
    device: Arc<DeviceBackend>,
    remote: RemoteCartClient,
}

impl StorefrontBackends {
    #[must_use]
    pub fn new(device: DeviceBackend, remote: RemoteCartClient) -> Self {
        Self {
            device: Arc::new(device),
            remote,
        }
    }
}

impl BackendProvider for StorefrontBackends {
    fn backend_for(&self, identity: &Identity) -> Arc<dyn CartBackend> {
        match identity {
            Identity::Anonymous => Arc::clone(&self.device) as Arc<dyn CartBackend>,
            Identity::Authenticated(user_id) => {
                Arc::new(RemoteBackend::new(self.remote.clone(), *user_id))
            }
        }
    }
}
