//! Remote cart service client and backend.
//!
//! Every call requires a bearer credential from the ambient
//! [`CredentialStore`]; when none is set the operation fails immediately
//! with [`CartError::AuthRequired`] - no network round-trip is made.
//!
//! Service contract (JSON over HTTP):
//! - `GET    {base}/cart/{userId}`
//! - `POST   {base}/cart/add-line`     body `{userId, productId, quantity}`
//! - `PUT    {base}/cart/update-line`  body `{userId, productId, quantity}`
//! - `DELETE {base}/cart/remove-line`  body `{userId, productId}`
//!
//! Non-success responses may carry `{"message": "..."}`; the message is
//! surfaced verbatim when parseable.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use trolley_core::{Cart, CartLine, ProductId, UserId};

use crate::config::CartServiceConfig;
use crate::error::{CartError, Result};
use crate::identity::CredentialStore;
use crate::reconcile::{RemoteCartPayload, reconcile};

use super::CartBackend;

// =============================================================================
// RemoteCartClient
// =============================================================================

/// HTTP client for the remote cart service.
///
/// Cheaply cloneable; all clones share one connection pool and read the
/// bearer credential from the same [`CredentialStore`] on every call.
#[derive(Clone)]
pub struct RemoteCartClient {
    inner: Arc<RemoteCartClientInner>,
}

struct RemoteCartClientInner {
    client: reqwest::Client,
    base_url: String,
    credentials: CredentialStore,
}

/// Mutation body shared by the add/update/remove endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LineMutation {
    user_id: UserId,
    product_id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    quantity: Option<u32>,
}

/// Error body shape returned by the cart service on failure.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl RemoteCartClient {
    /// Create a new cart service client.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Network`] if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(config: &CartServiceConfig, credentials: CredentialStore) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(RemoteCartClientInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                credentials,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.inner.base_url)
    }

    /// The current bearer token, or [`CartError::AuthRequired`] before any
    /// request is issued.
    fn bearer(&self) -> Result<secrecy::SecretString> {
        self.inner.credentials.bearer().ok_or(CartError::AuthRequired)
    }

    /// Map a non-success response into [`CartError::Server`], surfacing the
    /// service's `{message}` body verbatim when available.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| CartError::GENERIC_SERVER_MESSAGE.to_string());

        Err(CartError::Server {
            status: status.as_u16(),
            message,
        })
    }

    /// Fetch the raw server cart for `user_id`.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&self, user_id: UserId) -> Result<RemoteCartPayload> {
        let token = self.bearer()?;
        let response = self
            .inner
            .client
            .get(self.endpoint(&format!("cart/{user_id}")))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        let payload = Self::check(response).await?.json::<RemoteCartPayload>().await?;
        debug!(lines = payload.cart_lines.len(), "fetched remote cart");
        Ok(payload)
    }

    /// Add `quantity` units of a product to the server cart.
    #[instrument(skip(self))]
    pub async fn add_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<()> {
        let token = self.bearer()?;
        let response = self
            .inner
            .client
            .post(self.endpoint("cart/add-line"))
            .bearer_auth(token.expose_secret())
            .json(&LineMutation {
                user_id,
                product_id,
                quantity: Some(quantity),
            })
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    /// Set the quantity of an existing server cart line.
    #[instrument(skip(self))]
    pub async fn update_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<()> {
        let token = self.bearer()?;
        let response = self
            .inner
            .client
            .put(self.endpoint("cart/update-line"))
            .bearer_auth(token.expose_secret())
            .json(&LineMutation {
                user_id,
                product_id,
                quantity: Some(quantity),
            })
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    /// Remove a line from the server cart.
    #[instrument(skip(self))]
    pub async fn remove_line(&self, user_id: UserId, product_id: ProductId) -> Result<()> {
        let token = self.bearer()?;
        let response = self
            .inner
            .client
            .delete(self.endpoint("cart/remove-line"))
            .bearer_auth(token.expose_secret())
            .json(&LineMutation {
                user_id,
                product_id,
                quantity: None,
            })
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }
}

// =============================================================================
// RemoteBackend
// =============================================================================

/// Cart backend bound to one authenticated account on the cart service.
pub struct RemoteBackend {
    client: RemoteCartClient,
    user_id: UserId,
}

impl RemoteBackend {
    #[must_use]
    pub const fn new(client: RemoteCartClient, user_id: UserId) -> Self {
        Self { client, user_id }
    }
}

#[async_trait]
impl CartBackend for RemoteBackend {
    fn ready(&self) -> Result<()> {
        self.client.bearer().map(|_| ())
    }

    async fn load(&self) -> Result<Cart> {
        let payload = self.client.fetch_cart(self.user_id).await?;
        Ok(reconcile(&payload))
    }

    async fn add_line(&self, line: &CartLine) -> Result<()> {
        self.client
            .add_line(self.user_id, line.product_id, line.quantity)
            .await
    }

    async fn update_line(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        self.client
            .update_line(self.user_id, product_id, quantity)
            .await
    }

    async fn remove_line(&self, product_id: ProductId) -> Result<()> {
        self.client.remove_line(self.user_id, product_id).await
    }
}
