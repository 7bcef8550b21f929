//! Order and cart domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use greenbasket_core::{OrderId, Price, UserId};

/// One entry in a cart: a resolved product snapshot supplied by the caller.
///
/// The checkout orchestrator does not re-fetch products; each entry counts as
/// one unit and contributes its `product.price` to the charge amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLineItem {
    /// The resolved product snapshot.
    pub product: CartProduct,
}

/// The product snapshot inside a cart line item.
///
/// Only the price is interpreted; any other fields the client sent (name,
/// id, image URL) are carried through to the persisted order untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartProduct {
    /// Unit price at the time the cart was assembled.
    pub price: Price,
    /// Remaining snapshot fields, preserved verbatim.
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

/// Input for persisting an order as the terminal step of a checkout.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// The cart as submitted by the buyer.
    pub cart: Vec<CartLineItem>,
    /// The gateway's full transaction result, stored opaquely.
    pub payment: serde_json::Value,
    /// The authenticated buyer.
    pub buyer: UserId,
}

/// A persisted order. Write-once; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// The cart as submitted by the buyer.
    pub cart: Vec<CartLineItem>,
    /// The gateway's full transaction result.
    pub payment: serde_json::Value,
    /// The buyer.
    pub buyer: UserId,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
}

/// Sum the unit prices across all line items.
///
/// Quantity is not multiplied in; one unit is assumed per entry.
#[must_use]
pub fn cart_total(cart: &[CartLineItem]) -> Price {
    cart.iter()
        .fold(Price::ZERO, |acc, item| acc.saturating_add(item.product.price))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn line(price: i64) -> CartLineItem {
        CartLineItem {
            product: CartProduct {
                price: Price::new(Decimal::new(price, 0)).expect("price"),
                rest: serde_json::Map::new(),
            },
        }
    }

    #[test]
    fn test_cart_total_sums_unit_prices() {
        let cart = vec![line(10), line(25), line(3)];
        assert_eq!(cart_total(&cart).amount(), Decimal::new(38, 0));
    }

    #[test]
    fn test_cart_total_empty() {
        assert_eq!(cart_total(&[]).amount(), Decimal::ZERO);
    }

    #[test]
    fn test_line_item_preserves_extra_fields() {
        let item: CartLineItem = serde_json::from_str(
            r#"{"product": {"price": 12, "name": "Mug", "_id": 7}}"#,
        )
        .expect("deserialize");
        assert_eq!(item.product.rest.get("name"), Some(&serde_json::json!("Mug")));

        let back = serde_json::to_value(&item).expect("serialize");
        assert_eq!(back["product"]["name"], "Mug");
        assert_eq!(back["product"]["_id"], 7);
    }
}
