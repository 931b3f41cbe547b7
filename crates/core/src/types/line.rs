//! Cart line items and the catalog product shape they are created from.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// One product's presence in a cart.
///
/// At most one `CartLine` exists per [`ProductId`] within a cart; quantity is
/// always a positive integer and `unit_price` is never negative. The
/// camelCase serde names are the on-device persistence format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Stable product identifier, unique within a cart.
    pub product_id: ProductId,
    /// Display name captured at the time the line was created.
    pub name: String,
    /// Price per unit, non-negative.
    pub unit_price: Decimal,
    /// Number of units, always >= 1.
    pub quantity: u32,
    /// Last known available stock. Advisory only - never re-validated
    /// atomically against the inventory system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_snapshot: Option<i64>,
    /// Opaque display reference (e.g. an image URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

impl CartLine {
    /// Create a line for `quantity` units of `product`.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.unit_price,
            quantity,
            stock_snapshot: product.stock,
            image_ref: product.image_ref.clone(),
        }
    }

    /// Line subtotal: `unit_price * quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Catalog product data needed to create a cart line.
///
/// Produced by the catalog collaborator; the cart engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    /// Available stock at display time, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}
