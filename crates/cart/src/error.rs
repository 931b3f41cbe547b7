//! Cart engine error taxonomy.
//!
//! All errors are caught at the [`CartStore`](crate::store::CartStore)
//! boundary: every mutating call resolves with either a success snapshot or
//! one of these typed errors, and none propagate as unhandled failures to UI
//! collaborators.

use thiserror::Error;

/// Errors surfaced by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Invalid input (e.g. quantity < 1 on add). Rejected before any side
    /// effect.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A remote operation was attempted without a bearer credential.
    /// Surfaced to the UI collaborator with no state change and no network
    /// round-trip.
    #[error("Authentication required")]
    AuthRequired,

    /// Transport failure. Transient and retryable; the store rolls the
    /// snapshot back via a fresh load.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success response from the cart service. The message is the
    /// server's verbatim error body when one was parseable.
    #[error("Cart service error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Device-store read/write or serialization failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CartError {
    /// Fallback message used when a non-success response carries no
    /// parseable `{message}` body.
    pub(crate) const GENERIC_SERVER_MESSAGE: &'static str = "cart service request failed";

    /// Whether a retry of the same operation could plausibly succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Result type alias for cart operations.
pub type Result<T> = std::result::Result<T, CartError>;
