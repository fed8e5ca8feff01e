//! Cart lines as submitted by the caller.
//!
//! A cart is transient request data: the server holds no session cart state,
//! the client submits its cart wholesale with each order. Lines are kept in
//! submission order, duplicates included — validation and the stored
//! line-item snapshot both preserve the caller's shape.

use crate::errors::CheckoutError;
use crate::types::{ProductId, Quantity};
use serde::{Deserialize, Serialize};

/// One submitted cart entry: a product reference and a requested quantity.
///
/// The product identifier is a reference, not a guarantee — it may name a
/// product that does not exist, which surfaces as a line-level error during
/// checkout rather than a parse failure here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// The referenced product identifier.
    #[serde(rename = "id")]
    pub product_id: ProductId,
    /// The requested quantity, at least 1.
    pub quantity: Quantity,
}

impl CartLine {
    /// Build a cart line.
    pub const fn new(product_id: ProductId, quantity: Quantity) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// A non-empty list of cart lines in submission order.
///
/// Emptiness is the one input constraint checked up front: an order with no
/// lines is rejected before any transaction is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart(Vec<CartLine>);

impl Cart {
    /// Parse a list of lines into a cart, rejecting an empty list.
    pub fn try_new(lines: Vec<CartLine>) -> Result<Self, CheckoutError> {
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        Ok(Self(lines))
    }

    /// The lines in submission order.
    pub fn lines(&self) -> &[CartLine] {
        &self.0
    }

    /// The number of lines.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; carts are non-empty by construction.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The distinct product identifiers referenced by this cart, in first-use
    /// order. Duplicate lines contribute a single entry — rows are locked
    /// once per product, then every line is checked against that snapshot.
    pub fn distinct_product_ids(&self) -> Vec<ProductId> {
        let mut seen = std::collections::HashSet::new();
        self.0
            .iter()
            .map(|line| line.product_id)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// The JSON snapshot of the lines as submitted, stored verbatim on the
    /// order row.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(&self.0).expect("cart lines serialize infallibly")
    }
}
