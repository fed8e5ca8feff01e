//! The persistence abstraction checkout and catalog operations run against.
//!
//! Two adapters implement this contract: `ordercore-postgres` (real row
//! locks via `SELECT ... FOR UPDATE`) and `ordercore-memory` (a coarse
//! store-wide lock with the same observable semantics, for tests and
//! development). Checkout code is written against the traits only.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::StoreResult;
use crate::order::{OrderDraft, OrderRecord};
use crate::product::{NewProduct, ProductRecord};
use crate::types::{OrderId, ProductId, Quantity};

/// An open atomic transaction for one order placement.
///
/// Write effects staged through a transaction become observable only at
/// [`commit`](Self::commit). Dropping an uncommitted transaction MUST roll it
/// back — that is what keeps a caller disconnect from leaving partial writes
/// behind.
#[async_trait]
pub trait CheckoutTransaction: Send {
    /// Fetch the current rows for the given product identifiers, acquiring a
    /// write lock on each fetched row.
    ///
    /// The locks are held until the transaction ends and are the sole
    /// concurrency-control primitive of checkout: two transactions touching
    /// an overlapping id set serialize here. Identifiers with no matching
    /// row are simply absent from the result — reporting them is the
    /// caller's concern.
    async fn lock_products(
        &mut self,
        product_ids: &[ProductId],
    ) -> StoreResult<HashMap<ProductId, ProductRecord>>;

    /// Insert one order row and return its store-assigned identifier.
    async fn insert_order(&mut self, draft: OrderDraft) -> StoreResult<OrderId>;

    /// Record fulfillment of one cart line on a locked product row:
    /// decrement `stock_quantity` and increment `sales_count` by the line
    /// quantity.
    ///
    /// Adapters MUST refuse an adjustment that would drive stock negative
    /// (a constraint violation), independent of the validation the caller
    /// already performed.
    async fn fulfill_line(&mut self, product_id: ProductId, quantity: Quantity)
        -> StoreResult<()>;

    /// Commit the transaction, making all staged writes observable at once.
    async fn commit(self) -> StoreResult<()>;

    /// Roll back the transaction explicitly, discarding all staged writes.
    async fn rollback(self) -> StoreResult<()>;
}

/// A storefront persistence backend.
///
/// Catalog reads and the product insert are single-statement operations and
/// live directly on the store; order placement goes through
/// [`begin`](Self::begin) and the transaction contract. Implementations must
/// not cache stock or price across transactions — every checkout re-reads
/// under lock.
#[async_trait]
pub trait StorefrontStore: Send + Sync {
    /// The transaction type this store produces.
    type Transaction: CheckoutTransaction;

    /// Begin an atomic transaction for one order placement.
    async fn begin(&self) -> StoreResult<Self::Transaction>;

    /// Insert a product row with a zero sales count and return its
    /// store-assigned identifier.
    async fn insert_product(&self, product: NewProduct) -> StoreResult<ProductId>;

    /// Fetch one product by identifier. Absent products are `Ok(None)`.
    async fn fetch_product(&self, product_id: ProductId) -> StoreResult<Option<ProductRecord>>;

    /// List all products, ordered by title ascending.
    async fn list_products(&self) -> StoreResult<Vec<ProductRecord>>;

    /// Fetch one order by identifier. Absent orders are `Ok(None)`.
    async fn fetch_order(&self, order_id: OrderId) -> StoreResult<Option<OrderRecord>>;
}
