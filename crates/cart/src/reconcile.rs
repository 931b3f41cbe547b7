//! Reconciliation of raw cart-service payloads into canonical snapshots.
//!
//! The cart service's line shape is not wire-format-frozen: product ids and
//! prices arrive as numbers or strings depending on the serializer on the
//! other side, and nested product data may be missing entirely. Parsing here
//! fails closed - a malformed entry is dropped (and logged) rather than
//! propagated into the snapshot.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use trolley_core::{Cart, CartLine, ProductId};

/// Raw server cart representation, as returned by `GET /cart/{userId}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCartPayload {
    #[serde(default)]
    pub cart_lines: Vec<Value>,
}

/// Normalize a raw server payload into one atomic [`Cart`] snapshot.
///
/// - Entries are deduplicated by product identity; the FIRST occurrence in
///   server order wins and later duplicates are discarded, not merged.
/// - Malformed entries (missing or invalid id, name or price, non-positive
///   quantity) are treated as absent.
/// - `image_ref` derives from the first element of the product's image list
///   when present.
#[must_use]
pub fn reconcile(payload: &RemoteCartPayload) -> Cart {
    let mut seen: HashSet<ProductId> = HashSet::new();
    let mut lines = Vec::with_capacity(payload.cart_lines.len());

    for (index, raw) in payload.cart_lines.iter().enumerate() {
        match parse_entry(raw) {
            Some(line) => {
                if seen.insert(line.product_id) {
                    lines.push(line);
                } else {
                    tracing::debug!(
                        product_id = %line.product_id,
                        "discarding duplicate cart line from server payload"
                    );
                }
            }
            None => {
                tracing::warn!(index, "dropping malformed cart line from server payload");
            }
        }
    }

    Cart::from_lines(lines)
}

/// Parse one server-side cart entry into the canonical line shape.
///
/// Returns `None` for anything that does not validate as a well-formed line.
fn parse_entry(raw: &Value) -> Option<CartLine> {
    let entry = raw.as_object()?;

    let product_id = parse_product_id(entry.get("productId")?)?;
    let name = entry.get("productName")?.as_str()?.to_string();

    let unit_price = parse_decimal(entry.get("price")?)?;
    if unit_price < Decimal::ZERO {
        return None;
    }

    let quantity = entry.get("quantity")?.as_i64()?;
    let quantity = u32::try_from(quantity).ok().filter(|q| *q >= 1)?;

    let stock_snapshot = entry.get("stockQuantity").and_then(Value::as_i64);
    let image_ref = entry
        .get("product")
        .and_then(|product| product.get("images"))
        .and_then(Value::as_array)
        .and_then(|images| images.first())
        .and_then(image_url);

    Some(CartLine {
        product_id,
        name,
        unit_price,
        quantity,
        stock_snapshot,
        image_ref,
    })
}

/// Accept product ids as JSON integers or numeric strings.
fn parse_product_id(value: &Value) -> Option<ProductId> {
    match value {
        Value::Number(n) => n.as_i64().map(ProductId::new),
        Value::String(s) => s.trim().parse::<i64>().ok().map(ProductId::new),
        _ => None,
    }
}

/// Accept prices as JSON numbers or decimal strings.
fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.to_string().parse::<Decimal>().ok(),
        Value::String(s) => s.trim().parse::<Decimal>().ok(),
        _ => None,
    }
}

/// An image list element is either a bare URL string or an object with a
/// `url` field.
fn image_url(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("url").and_then(Value::as_str).map(String::from),
        _ => None,
    }
}
