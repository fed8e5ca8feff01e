//! In-memory adapter for the `OrderCore` storefront.
//!
//! This crate provides an in-memory implementation of the
//! [`StorefrontStore`] trait, useful for tests and development scenarios
//! where persistence is not required.
//!
//! Transactional semantics match the contract exactly, with one documented
//! coarsening: instead of per-row locks, a transaction takes the store-wide
//! lock at [`lock_products`](CheckoutTransaction::lock_products) and holds it
//! until commit, rollback, or drop. That serializes *all* concurrent
//! checkouts rather than only overlapping ones — strictly more conservative
//! than the contract requires, and indistinguishable from real row locking
//! in every observable outcome. Writes are staged and applied only at
//! commit, so a dropped transaction rolls back by doing nothing.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use ordercore::errors::{StoreError, StoreResult};
use ordercore::order::{OrderDraft, OrderRecord};
use ordercore::product::{NewProduct, ProductRecord};
use ordercore::store::{CheckoutTransaction, StorefrontStore};
use ordercore::types::{OrderId, ProductId, Quantity, SalesCount, Timestamp};

#[derive(Debug, Default)]
struct StoreState {
    products: BTreeMap<ProductId, ProductRecord>,
    orders: BTreeMap<OrderId, OrderRecord>,
    next_product_id: i64,
    next_order_id: i64,
}

/// Thread-safe in-memory storefront store.
///
/// Cloning is cheap and clones share storage, so a store can be handed to
/// concurrently running checkouts in tests.
#[derive(Clone, Default)]
pub struct InMemoryStorefrontStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStorefrontStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// An open transaction against an [`InMemoryStorefrontStore`].
///
/// Holds the store-wide lock from the first `lock_products` call until the
/// transaction ends. All writes are staged; nothing becomes observable
/// before [`commit`](CheckoutTransaction::commit).
pub struct InMemoryCheckoutTransaction {
    state: Arc<Mutex<StoreState>>,
    guard: Option<OwnedMutexGuard<StoreState>>,
    staged_order: Option<(OrderId, OrderDraft)>,
    staged_fulfillments: Vec<(ProductId, u32)>,
}

impl InMemoryCheckoutTransaction {
    fn guard(&mut self) -> StoreResult<&mut OwnedMutexGuard<StoreState>> {
        self.guard
            .as_mut()
            .ok_or_else(|| StoreError::Internal("write before any rows were locked".to_owned()))
    }

    fn staged_decrement(&self, product_id: ProductId) -> u32 {
        self.staged_fulfillments
            .iter()
            .filter(|(id, _)| *id == product_id)
            .map(|(_, quantity)| quantity)
            .sum()
    }
}

#[async_trait]
impl CheckoutTransaction for InMemoryCheckoutTransaction {
    async fn lock_products(
        &mut self,
        product_ids: &[ProductId],
    ) -> StoreResult<HashMap<ProductId, ProductRecord>> {
        if self.guard.is_none() {
            self.guard = Some(Arc::clone(&self.state).lock_owned().await);
        }
        let guard = self.guard()?;

        Ok(product_ids
            .iter()
            .filter_map(|id| guard.products.get(id).map(|product| (*id, product.clone())))
            .collect())
    }

    async fn insert_order(&mut self, draft: OrderDraft) -> StoreResult<OrderId> {
        if self.staged_order.is_some() {
            return Err(StoreError::Internal(
                "transaction already carries an order".to_owned(),
            ));
        }
        let guard = self.guard()?;

        // Identifiers are consumed even if the transaction later rolls back,
        // like a database sequence.
        guard.next_order_id += 1;
        let order_id = OrderId::new(guard.next_order_id);
        self.staged_order = Some((order_id, draft));
        Ok(order_id)
    }

    async fn fulfill_line(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> StoreResult<()> {
        let already_claimed = self.staged_decrement(product_id);
        let guard = self.guard()?;

        let stock: u32 = guard
            .products
            .get(&product_id)
            .ok_or_else(|| {
                StoreError::Internal(format!("fulfillment for unknown product {product_id}"))
            })?
            .stock_quantity
            .into();

        let quantity: u32 = quantity.into();
        let available = stock.saturating_sub(already_claimed);
        if available < quantity {
            return Err(StoreError::ConstraintViolation(format!(
                "stock underflow on product {product_id}: {available} available"
            )));
        }

        self.staged_fulfillments.push((product_id, quantity));
        Ok(())
    }

    async fn commit(mut self) -> StoreResult<()> {
        let Some(mut guard) = self.guard.take() else {
            return Ok(());
        };

        if let Some((order_id, draft)) = self.staged_order.take() {
            let record = OrderRecord {
                id: order_id,
                customer_name: draft.customer_name,
                customer_email: draft.customer_email,
                shipping_address: draft.shipping_address,
                payment_method: draft.payment_method,
                total_amount: draft.total_amount,
                line_items: draft.line_items,
                placed_by: draft.placed_by,
                created_at: Timestamp::now(),
            };
            guard.orders.insert(order_id, record);
        }

        for (product_id, quantity) in self.staged_fulfillments.drain(..) {
            let product = guard.products.get_mut(&product_id).ok_or_else(|| {
                StoreError::Internal(format!("fulfillment for unknown product {product_id}"))
            })?;

            let stock: u32 = product.stock_quantity.into();
            let new_stock = stock.checked_sub(quantity).ok_or_else(|| {
                StoreError::ConstraintViolation(format!(
                    "stock underflow on product {product_id}: {stock} available"
                ))
            })?;
            let sold: u64 = product.sales_count.into();

            product.stock_quantity = new_stock.into();
            product.sales_count = SalesCount::new(sold + u64::from(quantity));
        }

        debug!("in-memory transaction committed");
        Ok(())
    }

    async fn rollback(mut self) -> StoreResult<()> {
        self.staged_order = None;
        self.staged_fulfillments.clear();
        self.guard = None;
        Ok(())
    }
}

#[async_trait]
impl StorefrontStore for InMemoryStorefrontStore {
    type Transaction = InMemoryCheckoutTransaction;

    async fn begin(&self) -> StoreResult<Self::Transaction> {
        Ok(InMemoryCheckoutTransaction {
            state: Arc::clone(&self.state),
            guard: None,
            staged_order: None,
            staged_fulfillments: Vec::new(),
        })
    }

    async fn insert_product(&self, product: NewProduct) -> StoreResult<ProductId> {
        let mut state = self.state.lock().await;

        state.next_product_id += 1;
        let product_id = ProductId::new(state.next_product_id);
        let record = ProductRecord {
            id: product_id,
            title: product.title,
            price: product.price,
            image_url: product.image_url,
            stock_quantity: product.initial_stock,
            sales_count: SalesCount::zero(),
        };
        state.products.insert(product_id, record);

        debug!(product_id = %product_id, "product inserted");
        Ok(product_id)
    }

    async fn fetch_product(&self, product_id: ProductId) -> StoreResult<Option<ProductRecord>> {
        let state = self.state.lock().await;
        Ok(state.products.get(&product_id).cloned())
    }

    async fn list_products(&self) -> StoreResult<Vec<ProductRecord>> {
        let state = self.state.lock().await;
        let mut products: Vec<ProductRecord> = state.products.values().cloned().collect();
        products.sort_by(|a, b| a.title.as_ref().cmp(b.title.as_ref()));
        Ok(products)
    }

    async fn fetch_order(&self, order_id: OrderId) -> StoreResult<Option<OrderRecord>> {
        let state = self.state.lock().await;
        Ok(state.orders.get(&order_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordercore::types::{Money, ProductTitle, StockQuantity};
    use rust_decimal_macros::dec;

    fn new_product(title: &str, price: rust_decimal::Decimal, stock: u32) -> NewProduct {
        NewProduct {
            title: ProductTitle::try_new(title).unwrap(),
            price: Money::new(price).unwrap(),
            image_url: None,
            initial_stock: StockQuantity::new(stock),
        }
    }

    fn draft(total: rust_decimal::Decimal) -> OrderDraft {
        OrderDraft {
            customer_name: ordercore::types::CustomerName::guest(),
            customer_email: None,
            shipping_address: String::new(),
            payment_method: None,
            total_amount: Money::new(total).unwrap(),
            line_items: serde_json::json!([]),
            placed_by: None,
        }
    }

    #[tokio::test]
    async fn clone_shares_storage() {
        let store = InMemoryStorefrontStore::new();
        let clone = store.clone();
        assert!(Arc::ptr_eq(&store.state, &clone.state));
    }

    #[tokio::test]
    async fn insert_and_fetch_product() {
        let store = InMemoryStorefrontStore::new();
        let id = store
            .insert_product(new_product("Dune Lamp", dec!(249.50), 4))
            .await
            .unwrap();

        let fetched = store.fetch_product(id).await.unwrap().unwrap();
        assert_eq!(fetched.title.as_ref(), "Dune Lamp");
        assert_eq!(fetched.stock_quantity, StockQuantity::new(4));
        assert_eq!(fetched.sales_count, SalesCount::zero());

        assert!(store
            .fetch_product(ProductId::new(999))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn listing_orders_by_title() {
        let store = InMemoryStorefrontStore::new();
        store
            .insert_product(new_product("Zafu Cushion", dec!(30.00), 1))
            .await
            .unwrap();
        store
            .insert_product(new_product("Atlas Shelf", dec!(120.00), 2))
            .await
            .unwrap();

        let titles: Vec<String> = store
            .list_products()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title.as_ref().to_string())
            .collect();
        assert_eq!(titles, vec!["Atlas Shelf", "Zafu Cushion"]);
    }

    #[tokio::test]
    async fn staged_writes_apply_only_on_commit() {
        let store = InMemoryStorefrontStore::new();
        let id = store
            .insert_product(new_product("Dune Lamp", dec!(10.00), 5))
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.lock_products(&[id]).await.unwrap();
        let order_id = tx.insert_order(draft(dec!(20.00))).await.unwrap();
        tx.fulfill_line(id, Quantity::try_new(2).unwrap())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let product = store.fetch_product(id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, StockQuantity::new(3));
        assert_eq!(product.sales_count, SalesCount::new(2));
        assert!(store.fetch_order(order_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rollback_discards_staged_writes() {
        let store = InMemoryStorefrontStore::new();
        let id = store
            .insert_product(new_product("Dune Lamp", dec!(10.00), 5))
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.lock_products(&[id]).await.unwrap();
        let order_id = tx.insert_order(draft(dec!(10.00))).await.unwrap();
        tx.fulfill_line(id, Quantity::try_new(1).unwrap())
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        let product = store.fetch_product(id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, StockQuantity::new(5));
        assert!(store.fetch_order(order_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dropping_a_transaction_rolls_back() {
        let store = InMemoryStorefrontStore::new();
        let id = store
            .insert_product(new_product("Dune Lamp", dec!(10.00), 5))
            .await
            .unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.lock_products(&[id]).await.unwrap();
            tx.fulfill_line(id, Quantity::try_new(5).unwrap())
                .await
                .unwrap();
            // dropped without commit
        }

        let product = store.fetch_product(id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, StockQuantity::new(5));
    }

    #[tokio::test]
    async fn fulfillment_beyond_stock_is_a_constraint_violation() {
        let store = InMemoryStorefrontStore::new();
        let id = store
            .insert_product(new_product("Dune Lamp", dec!(10.00), 3))
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.lock_products(&[id]).await.unwrap();
        tx.fulfill_line(id, Quantity::try_new(2).unwrap())
            .await
            .unwrap();

        // 2 already claimed out of 3; another 2 must underflow.
        let err = tx
            .fulfill_line(id, Quantity::try_new(2).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn writes_without_locks_are_rejected() {
        let store = InMemoryStorefrontStore::new();
        let mut tx = store.begin().await.unwrap();
        let err = tx.insert_order(draft(dec!(1.00))).await.unwrap_err();
        assert!(matches!(err, StoreError::Internal(_)));
    }

    #[tokio::test]
    async fn lock_is_released_after_commit() {
        let store = InMemoryStorefrontStore::new();
        let id = store
            .insert_product(new_product("Dune Lamp", dec!(10.00), 5))
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.lock_products(&[id]).await.unwrap();
        tx.commit().await.unwrap();

        // A second transaction can lock immediately; a held lock would hang
        // this test.
        let mut tx = store.begin().await.unwrap();
        let locked = tx.lock_products(&[id]).await.unwrap();
        assert_eq!(locked.len(), 1);
        tx.rollback().await.unwrap();
    }
}
