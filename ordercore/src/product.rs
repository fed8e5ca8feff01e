//! Catalog product records.

use crate::types::{ImageUrl, Money, ProductId, ProductTitle, SalesCount, StockQuantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product to be added to the catalog.
///
/// The sales count is not part of the input; every product starts at zero
/// sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    /// Product title.
    pub title: ProductTitle,
    /// Unit price.
    pub price: Money,
    /// Optional image URL.
    pub image_url: Option<ImageUrl>,
    /// Initial stock on hand (zero is allowed).
    pub initial_stock: StockQuantity,
}

/// A persisted catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Store-assigned product identifier.
    pub id: ProductId,
    /// Product title.
    pub title: ProductTitle,
    /// Unit price.
    pub price: Money,
    /// Optional image URL.
    pub image_url: Option<ImageUrl>,
    /// Current stock on hand.
    pub stock_quantity: StockQuantity,
    /// Cumulative units sold.
    pub sales_count: SalesCount,
}

impl ProductRecord {
    /// The value of the stock on hand: `price * stock_quantity`.
    ///
    /// A derived reporting metric, not a payable amount, so it is returned as
    /// a plain decimal rather than [`Money`].
    pub fn inventory_value(&self) -> Decimal {
        let stock: u32 = self.stock_quantity.into();
        self.price.amount() * Decimal::from(stock)
    }
}
