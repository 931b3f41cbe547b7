//! Trolley Cart - cart state and synchronization engine.
//!
//! Presents a single cart abstraction that transparently switches between a
//! device-local (anonymous) cart and an account-bound (server) cart, keeps
//! both in sync with a remote inventory-aware cart service, and survives
//! partial failures without corrupting totals.
//!
//! # Architecture
//!
//! - [`backend`] - interchangeable persistence adapters (device key-value
//!   store / remote cart service) behind one capability set
//! - [`reconcile`] - normalizes raw server payloads into canonical
//!   snapshots, deduplicating by product identity
//! - [`store`] - the mutable, observable state container exposing the
//!   operation contract consumed by UI collaborators
//! - [`identity`] - watches the owning account identity and reloads the
//!   cart through the matching backend on every switch
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trolley_cart::{
//!     CartServiceConfig, CartStore, CredentialStore, DeviceBackend, Identity,
//!     IdentityObserver, MemoryStore, RemoteCartClient, StorefrontBackends,
//! };
//!
//! let credentials = CredentialStore::new();
//! let remote = RemoteCartClient::new(&CartServiceConfig::from_env()?, credentials.clone())?;
//! let device = DeviceBackend::new(Arc::new(MemoryStore::new()));
//!
//! let store = CartStore::new(Arc::new(StorefrontBackends::new(device, remote)));
//! let cart = store.load().await;
//!
//! // Identity changes from the auth collaborator drive full reloads.
//! let (identity_tx, identity_rx) = tokio::sync::watch::channel(Identity::Anonymous);
//! IdentityObserver::new(identity_rx, store.clone()).spawn();
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod identity;
pub mod reconcile;
pub mod store;

pub use backend::{
    BackendProvider, CartBackend, DeviceBackend, DeviceStore, FileStore, MemoryStore,
    RemoteBackend, RemoteCartClient, StorefrontBackends,
};
pub use config::{CartServiceConfig, ConfigError};
pub use error::{CartError, Result};
pub use identity::{CredentialStore, Identity, IdentityObserver};
pub use reconcile::{RemoteCartPayload, reconcile};
pub use store::{CartEvent, CartStore};
