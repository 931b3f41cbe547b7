//! The cart snapshot and its arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::line::CartLine;

/// An ordered collection of [`CartLine`]s owned by exactly one identity
/// (an anonymous device session or an authenticated account).
///
/// Totals are recomputed fresh on every call rather than cached, so the
/// snapshot can never report a total that disagrees with its lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create a cart from already-deduplicated lines.
    ///
    /// Callers are responsible for the one-line-per-product invariant;
    /// the reconciliation layer enforces it for external payloads.
    #[must_use]
    pub const fn from_lines(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    /// The lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// The line for `product_id`, if present.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// `Σ(unit_price × quantity)` over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// `Σ(quantity)` over all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Fold `line` into the cart: if a line for the same product already
    /// exists its quantity increases by the added amount (price, name and
    /// stock snapshot keep the existing values); otherwise the line is
    /// appended.
    pub fn fold_line(&mut self, line: CartLine) {
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id)
        {
            existing.quantity += line.quantity;
        } else {
            self.lines.push(line);
        }
    }

    /// Set the quantity of an existing line. Returns `false` (and changes
    /// nothing) if no line exists for `product_id`.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> bool {
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove the line for `product_id`. Returns `false` if absent.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != before
    }

    /// Drop all lines.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i64, price: Decimal, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            name: format!("product-{id}"),
            unit_price: price,
            quantity,
            stock_snapshot: None,
            image_ref: None,
        }
    }

    #[test]
    fn test_totals_recomputed_fresh() {
        let mut cart = Cart::default();
        cart.fold_line(line(1, Decimal::new(250, 2), 2)); // 2 x 2.50
        cart.fold_line(line(2, Decimal::new(1000, 2), 3)); // 3 x 10.00
        assert_eq!(cart.total(), Decimal::new(3500, 2));
        assert_eq!(cart.item_count(), 5);

        assert!(cart.set_quantity(ProductId::new(2), 1));
        assert_eq!(cart.total(), Decimal::new(1500, 2));
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_empty_cart_totals() {
        let cart = Cart::default();
        assert_eq!(cart.total(), Decimal::ZERO);
        assert_eq!(cart.item_count(), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_fold_merges_quantity_keeps_first_price() {
        let mut cart = Cart::default();
        cart.fold_line(line(7, Decimal::new(500, 2), 3));
        // Same product arriving again with a different price snapshot.
        cart.fold_line(line(7, Decimal::new(600, 2), 2));

        assert_eq!(cart.len(), 1);
        let folded = cart.line(ProductId::new(7)).unwrap();
        assert_eq!(folded.quantity, 5);
        assert_eq!(folded.unit_price, Decimal::new(500, 2));
    }

    #[test]
    fn test_fold_preserves_insertion_order() {
        let mut cart = Cart::default();
        cart.fold_line(line(3, Decimal::ONE, 1));
        cart.fold_line(line(1, Decimal::ONE, 1));
        cart.fold_line(line(3, Decimal::ONE, 4));

        let ids: Vec<i64> = cart.lines().iter().map(|l| l.product_id.as_i64()).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_set_quantity_missing_line() {
        let mut cart = Cart::default();
        assert!(!cart.set_quantity(ProductId::new(9), 4));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut cart = Cart::default();
        cart.fold_line(line(1, Decimal::ONE, 1));
        cart.fold_line(line(2, Decimal::ONE, 1));
        assert!(cart.remove(ProductId::new(1)));
        assert!(!cart.remove(ProductId::new(1)));
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_serde_transparent_array() {
        let mut cart = Cart::default();
        cart.fold_line(line(1, Decimal::new(100, 2), 2));
        let json = serde_json::to_value(&cart).unwrap();
        assert!(json.is_array());
        let back: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }
}
