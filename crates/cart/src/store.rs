//! The observable cart state container.
//!
//! `CartStore` owns the single in-memory snapshot and is the only writer to
//! it. UI collaborators read through [`CartStore::subscribe`] (badge counts,
//! cart page listing, checkout summary) and mutate through the operation
//! contract below; every mutation publishes the new snapshot atomically, so
//! subscribers never observe a partially-applied cart.
//!
//! # Concurrency
//!
//! Mutations run on one logical task and suspend only at remote-call await
//! points. Optimistic updates apply to the shared snapshot immediately, so
//! interleaved calls on different products never conflict. Two rapid calls
//! on the SAME product race: the last response to complete wins. No request
//! sequencing is enforced - an accepted risk for this domain - and an
//! in-flight call cannot be aborted; a later `load()` fully supersedes any
//! earlier in-flight result once it resolves.

use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;
use tokio::sync::{broadcast, watch};
use tracing::instrument;
use trolley_core::{Cart, CartLine, Product, ProductId};

use crate::backend::{BackendProvider, CartBackend};
use crate::error::{CartError, Result};
use crate::identity::Identity;

/// Non-fatal store notifications for UI collaborators.
#[derive(Debug, Clone)]
pub enum CartEvent {
    /// A `load()` failed and the store degraded to an empty cart.
    LoadFailed { message: String },
}

/// The mutable, observable cart state container.
///
/// Cheaply cloneable; all clones share the same snapshot and backend
/// selection. There is no ambient singleton - construct one per storefront
/// session and hand clones to collaborators.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    snapshot: watch::Sender<Cart>,
    events: broadcast::Sender<CartEvent>,
    provider: Arc<dyn BackendProvider>,
    /// Never held across an await point.
    active: RwLock<ActiveBackend>,
}

struct ActiveBackend {
    identity: Identity,
    backend: Arc<dyn CartBackend>,
}

impl CartStore {
    /// Create a store for an anonymous session.
    ///
    /// The snapshot starts empty; call [`load`](Self::load) to hydrate it
    /// from the device record.
    #[must_use]
    pub fn new(provider: Arc<dyn BackendProvider>) -> Self {
        let identity = Identity::Anonymous;
        let backend = provider.backend_for(&identity);
        let (snapshot, _) = watch::channel(Cart::default());
        let (events, _) = broadcast::channel(16);

        Self {
            inner: Arc::new(CartStoreInner {
                snapshot,
                events,
                provider,
                active: RwLock::new(ActiveBackend { identity, backend }),
            }),
        }
    }

    /// Read-only subscription to the current snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.inner.snapshot.subscribe()
    }

    /// Subscription to non-fatal store events.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<CartEvent> {
        self.inner.events.subscribe()
    }

    /// A clone of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.inner.snapshot.borrow().clone()
    }

    /// The identity currently owning the cart.
    #[must_use]
    pub fn identity(&self) -> Identity {
        self.active().0
    }

    /// `Σ(unit_price × quantity)`, recomputed fresh from the snapshot.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.inner.snapshot.borrow().total()
    }

    /// `Σ(quantity)`, recomputed fresh from the snapshot.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.inner.snapshot.borrow().item_count()
    }

    /// Fetch and replace the snapshot from the active backend.
    ///
    /// Never fails to the caller: on any backend error the store degrades
    /// to an empty cart and surfaces a [`CartEvent::LoadFailed`].
    #[instrument(skip(self))]
    pub async fn load(&self) -> Cart {
        let (_, backend) = self.active();
        match backend.load().await {
            Ok(cart) => {
                self.publish(cart.clone());
                cart
            }
            Err(e) => {
                tracing::warn!(error = %e, "cart load failed, degrading to empty cart");
                let _ = self.inner.events.send(CartEvent::LoadFailed {
                    message: e.to_string(),
                });
                self.publish(Cart::default());
                Cart::default()
            }
        }
    }

    /// Add `quantity` units of `product` to the cart.
    ///
    /// If a line for the product already exists its quantity increases by
    /// the added amount; otherwise a new line is appended.
    ///
    /// # Errors
    ///
    /// - [`CartError::Validation`] if `quantity < 1`, rejected before any
    ///   side effect.
    /// - [`CartError::AuthRequired`] if the remote path has no credential,
    ///   rejected by the backend pre-flight before the optimistic change is
    ///   published; subscribers never observe it.
    /// - [`CartError::Network`] / [`CartError::Server`] after the optimistic
    ///   change has been rolled back.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_line(&self, product: &Product, quantity: u32) -> Result<Cart> {
        if quantity < 1 {
            return Err(CartError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }

        let (identity, backend) = self.active();
        backend.ready()?;
        let line = CartLine::from_product(product, quantity);

        let previous = self.snapshot();
        self.inner
            .snapshot
            .send_modify(|cart| cart.fold_line(line.clone()));

        let confirmed = async {
            backend.add_line(&line).await?;
            backend.persist(&self.snapshot()).await
        }
        .await;

        match confirmed {
            Ok(()) => Ok(self.snapshot()),
            Err(err) => {
                self.rollback(&err, identity, previous).await;
                Err(err)
            }
        }
    }

    /// Set the quantity of an existing line.
    ///
    /// `quantity < 1` is silently ignored by policy (NOT an error); the
    /// current snapshot is returned unchanged. A product with no line in
    /// the cart is likewise a no-op.
    ///
    /// # Errors
    ///
    /// As for [`add_line`](Self::add_line), minus validation.
    #[instrument(skip(self))]
    pub async fn update_quantity(&self, product_id: ProductId, quantity: u32) -> Result<Cart> {
        if quantity < 1 {
            return Ok(self.snapshot());
        }

        let (identity, backend) = self.active();
        backend.ready()?;

        let previous = self.snapshot();
        let changed = self
            .inner
            .snapshot
            .send_if_modified(|cart| cart.set_quantity(product_id, quantity));
        if !changed {
            return Ok(previous);
        }

        let confirmed = async {
            backend.update_line(product_id, quantity).await?;
            backend.persist(&self.snapshot()).await
        }
        .await;

        match confirmed {
            Ok(()) => Ok(self.snapshot()),
            Err(err) => {
                self.rollback(&err, identity, previous).await;
                Err(err)
            }
        }
    }

    /// Remove the line for `product_id`.
    ///
    /// Anonymous carts remove optimistically and persist to the device
    /// store. Authenticated carts remove pessimistically: the line leaves
    /// the snapshot only after remote confirmation, via a full reload, since
    /// a partial confirmation could otherwise desync the UI.
    ///
    /// # Errors
    ///
    /// As for [`add_line`](Self::add_line), minus validation.
    #[instrument(skip(self))]
    pub async fn remove_line(&self, product_id: ProductId) -> Result<Cart> {
        let (identity, backend) = self.active();

        if identity.is_authenticated() {
            backend.remove_line(product_id).await?;
            return Ok(self.load().await);
        }

        let previous = self.snapshot();
        let removed = self
            .inner
            .snapshot
            .send_if_modified(|cart| cart.remove(product_id));
        if !removed {
            return Ok(previous);
        }

        let confirmed = async {
            backend.remove_line(product_id).await?;
            backend.persist(&self.snapshot()).await
        }
        .await;

        match confirmed {
            Ok(()) => Ok(self.snapshot()),
            Err(err) => {
                self.publish(previous);
                Err(err)
            }
        }
    }

    /// Empty the in-memory snapshot.
    ///
    /// Does not propagate to the device or remote store - the checkout flow
    /// owns any server-side clearing after an order is placed.
    pub fn clear(&self) {
        self.publish(Cart::default());
    }

    /// Switch the owning identity.
    ///
    /// On any actual change: the in-memory snapshot is discarded, the
    /// backend matching the new identity is selected, and a full `load()`
    /// runs. Anonymous cart contents are NOT merged into a newly
    /// authenticated cart.
    #[instrument(skip(self))]
    pub async fn set_identity(&self, identity: Identity) {
        let changed = match self.inner.active.write() {
            Ok(mut active) => {
                if active.identity == identity {
                    false
                } else {
                    active.identity = identity;
                    active.backend = self.inner.provider.backend_for(&identity);
                    true
                }
            }
            Err(poisoned) => {
                let mut active = poisoned.into_inner();
                active.identity = identity;
                active.backend = self.inner.provider.backend_for(&identity);
                true
            }
        };

        if !changed {
            return;
        }

        // Discard before reloading so the old identity's cart is never
        // visible under the new identity, even transiently.
        self.publish(Cart::default());
        self.load().await;
    }

    fn publish(&self, cart: Cart) {
        let _ = self.inner.snapshot.send_replace(cart);
    }

    /// Undo an optimistic change after a failed backend call.
    ///
    /// `AuthRequired` here means the credential was revoked between the
    /// pre-flight and the dispatch; no round-trip was made, so the captured
    /// pre-mutation snapshot is restored exactly. Any other remote failure
    /// self-heals through a fresh authoritative `load()`; anonymous (device)
    /// failures restore the previous snapshot since the record was left
    /// unchanged.
    async fn rollback(&self, err: &CartError, identity: Identity, previous: Cart) {
        match err {
            CartError::AuthRequired => self.publish(previous),
            _ if identity.is_authenticated() => {
                self.load().await;
            }
            _ => self.publish(previous),
        }
    }

    fn active(&self) -> (Identity, Arc<dyn CartBackend>) {
        match self.inner.active.read() {
            Ok(active) => (active.identity, Arc::clone(&active.backend)),
            Err(poisoned) => {
                let active = poisoned.into_inner();
                (active.identity, Arc::clone(&active.backend))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use trolley_core::UserId;

    use crate::backend::{
        DeviceBackend, DeviceStore, MemoryStore, RemoteCartClient, StorefrontBackends,
    };
    use crate::config::CartServiceConfig;
    use crate::identity::CredentialStore;

    use super::*;

    fn product(id: i64, price_cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("product-{id}"),
            unit_price: Decimal::new(price_cents, 2),
            stock: Some(10),
            image_ref: None,
        }
    }

    /// Device-backed store for anonymous-path tests. The remote client
    /// points at an unroutable address and is never reached.
    fn anonymous_store() -> (CartStore, Arc<MemoryStore>) {
        let device = Arc::new(MemoryStore::new());
        let remote = RemoteCartClient::new(
            &CartServiceConfig::new("http://127.0.0.1:9".parse().unwrap()),
            CredentialStore::new(),
        )
        .unwrap();
        let provider = StorefrontBackends::new(
            DeviceBackend::new(Arc::clone(&device) as Arc<dyn DeviceStore>),
            remote,
        );
        (CartStore::new(Arc::new(provider)), device)
    }

    #[tokio::test]
    async fn test_add_rejects_zero_quantity_before_side_effects() {
        let (store, _) = anonymous_store();
        let err = store.add_line(&product(1, 100), 0).await.unwrap_err();
        assert!(matches!(err, CartError::Validation(_)));
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_merge_on_add() {
        let (store, _) = anonymous_store();
        store.add_line(&product(1, 100), 3).await.unwrap();
        let cart = store.add_line(&product(1, 100), 2).await.unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.line(ProductId::new(1)).unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_totals_and_count() {
        let (store, _) = anonymous_store();
        store.add_line(&product(1, 250), 2).await.unwrap(); // 2 x 2.50
        store.add_line(&product(2, 1000), 1).await.unwrap(); // 1 x 10.00

        assert_eq!(store.total(), Decimal::new(1500, 2));
        assert_eq!(store.item_count(), 3);
    }

    #[tokio::test]
    async fn test_quantity_floor_is_silent_noop() {
        let (store, _) = anonymous_store();
        store.add_line(&product(1, 100), 2).await.unwrap();

        let cart = store.update_quantity(ProductId::new(1), 0).await.unwrap();
        assert_eq!(cart.line(ProductId::new(1)).unwrap().quantity, 2);
        assert_eq!(store.item_count(), 2);
    }

    #[tokio::test]
    async fn test_update_unknown_product_is_noop() {
        let (store, _) = anonymous_store();
        store.add_line(&product(1, 100), 2).await.unwrap();

        let cart = store.update_quantity(ProductId::new(99), 5).await.unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.item_count(), 2);
    }

    #[tokio::test]
    async fn test_anonymous_mutations_persist_to_device() {
        let (store, device) = anonymous_store();
        store.add_line(&product(1, 100), 2).await.unwrap();
        store.update_quantity(ProductId::new(1), 4).await.unwrap();

        // A fresh store over the same device record sees the persisted cart.
        let remote = RemoteCartClient::new(
            &CartServiceConfig::new("http://127.0.0.1:9".parse().unwrap()),
            CredentialStore::new(),
        )
        .unwrap();
        let provider = StorefrontBackends::new(
            DeviceBackend::new(device as Arc<dyn DeviceStore>),
            remote,
        );
        let reopened = CartStore::new(Arc::new(provider));
        let cart = reopened.load().await;
        assert_eq!(cart.line(ProductId::new(1)).unwrap().quantity, 4);
    }

    #[tokio::test]
    async fn test_device_record_tracks_published_snapshot() {
        let (store, _) = anonymous_store();
        store.add_line(&product(1, 100), 1).await.unwrap();
        store.clear();
        store.add_line(&product(2, 100), 1).await.unwrap();

        // The record is written from the published snapshot, so the cleared
        // line must not resurface on reload.
        let cart = store.load().await;
        assert_eq!(cart.len(), 1);
        assert!(cart.line(ProductId::new(1)).is_none());
        assert_eq!(cart.line(ProductId::new(2)).unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn test_remove_line_anonymous() {
        let (store, _) = anonymous_store();
        store.add_line(&product(1, 100), 2).await.unwrap();
        store.add_line(&product(2, 100), 1).await.unwrap();

        let cart = store.remove_line(ProductId::new(1)).await.unwrap();
        assert!(cart.line(ProductId::new(1)).is_none());
        assert_eq!(cart.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_is_in_memory_only() {
        let (store, _) = anonymous_store();
        store.add_line(&product(1, 100), 2).await.unwrap();

        store.clear();
        assert!(store.snapshot().is_empty());

        // The device record was deliberately untouched: a reload hydrates
        // the cart again. Checkout owns real clearing.
        let cart = store.load().await;
        assert_eq!(cart.item_count(), 2);
    }

    #[tokio::test]
    async fn test_subscribers_see_every_mutation() {
        let (store, _) = anonymous_store();
        let mut rx = store.subscribe();

        store.add_line(&product(1, 100), 2).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().item_count(), 2);

        store.update_quantity(ProductId::new(1), 6).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().item_count(), 6);
    }

    #[tokio::test]
    async fn test_uniqueness_after_add_sequence() {
        let (store, _) = anonymous_store();
        for _ in 0..4 {
            store.add_line(&product(1, 100), 1).await.unwrap();
            store.add_line(&product(2, 100), 1).await.unwrap();
        }

        let cart = store.snapshot();
        assert_eq!(cart.len(), 2);
        let mut ids: Vec<i64> = cart.lines().iter().map(|l| l.product_id.as_i64()).collect();
        ids.dedup();
        assert_eq!(ids.len(), 2);
    }

    #[tokio::test]
    async fn test_authenticated_without_credential_degrades_on_load() {
        let (store, _) = anonymous_store();
        let mut events = store.events();

        // Switching to an authenticated identity with no bearer token:
        // the reload fails and the store degrades to an empty cart.
        store
            .set_identity(Identity::Authenticated(UserId::new(42)))
            .await;

        assert!(store.snapshot().is_empty());
        let event = events.try_recv().unwrap();
        assert!(matches!(event, CartEvent::LoadFailed { .. }));
    }
}
