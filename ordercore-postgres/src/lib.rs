//! PostgreSQL adapter for the `OrderCore` storefront.
//!
//! Implements [`StorefrontStore`] over a `sqlx` connection pool. Checkout
//! transactions map directly onto database transactions: `lock_products`
//! issues `SELECT ... FOR UPDATE` on the referenced rows, the stock
//! decrement is guarded by both a `WHERE stock_quantity >= $n` predicate and
//! the schema's CHECK constraint, and a dropped [`sqlx::Transaction`] rolls
//! back — which is what makes a caller disconnect safe.
//!
//! Database failures are mapped onto [`StoreError`] by SQLSTATE class so the
//! core's transient/permanent classification works unchanged: lock waits
//! (`55P03`), serialization failures (`40001`), and deadlocks (`40P01`) come
//! back as retryable; constraint violations (`23xxx`) do not.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod retry;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nutype::nutype;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Pool, Postgres, Row};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use ordercore::errors::{StoreError, StoreResult};
use ordercore::order::{OrderDraft, OrderRecord};
use ordercore::product::{NewProduct, ProductRecord};
use ordercore::store::{CheckoutTransaction, StorefrontStore};
use ordercore::types::{
    CustomerEmail, CustomerName, ImageUrl, Money, OrderId, PaymentMethod, ProductId, ProductTitle,
    Quantity, SalesCount, StockQuantity, Timestamp,
};

/// Errors raised while setting up the adapter itself.
#[derive(Debug, Error)]
pub enum PostgresStoreError {
    /// The connection pool could not be created.
    #[error("failed to create postgres connection pool")]
    ConnectionFailed(#[source] sqlx::Error),

    /// The schema migrations could not be applied.
    #[error("failed to run storefront migrations")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),
}

/// Maximum number of database connections in the pool.
///
/// Must be at least 1, enforced by using `NonZeroU32` as the underlying
/// type.
#[nutype(derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRef, Into))]
pub struct MaxConnections(std::num::NonZeroU32);

/// Configuration for the adapter's connection pool.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Maximum number of connections in the pool (default: 10).
    pub max_connections: MaxConnections,
    /// Timeout for acquiring a connection from the pool (default: 30 seconds).
    pub acquire_timeout: Duration,
    /// Idle timeout for connections in the pool (default: 10 minutes).
    pub idle_timeout: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        const DEFAULT_MAX_CONNECTIONS: std::num::NonZeroU32 = match std::num::NonZeroU32::new(10) {
            Some(v) => v,
            None => unreachable!(),
        };

        Self {
            max_connections: MaxConnections::new(DEFAULT_MAX_CONNECTIONS),
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

/// PostgreSQL-backed storefront store.
#[derive(Debug, Clone)]
pub struct PostgresStorefrontStore {
    pool: Pool<Postgres>,
}

impl PostgresStorefrontStore {
    /// Create a store with default pool configuration.
    pub async fn new<S: Into<String>>(connection_string: S) -> Result<Self, PostgresStoreError> {
        Self::with_config(connection_string, PostgresConfig::default()).await
    }

    /// Create a store with custom pool configuration.
    pub async fn with_config<S: Into<String>>(
        connection_string: S,
        config: PostgresConfig,
    ) -> Result<Self, PostgresStoreError> {
        let connection_string = connection_string.into();
        let max_connections: std::num::NonZeroU32 = config.max_connections.into();
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.get())
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .connect(&connection_string)
            .await
            .map_err(PostgresStoreError::ConnectionFailed)?;
        Ok(Self { pool })
    }

    /// Create a store from an existing connection pool.
    ///
    /// Use this when pool configuration is owned elsewhere or the pool is
    /// shared across components.
    pub fn from_pool(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Check connectivity with a trivial round trip.
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|err| map_sqlx_error(err, "ping"))?;
        Ok(())
    }

    /// Apply the storefront schema migrations.
    pub async fn migrate(&self) -> Result<(), PostgresStoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(PostgresStoreError::MigrationFailed)
    }
}

/// An open database transaction for one order placement.
pub struct PostgresCheckoutTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl CheckoutTransaction for PostgresCheckoutTransaction {
    #[instrument(name = "postgres.lock_products", skip(self))]
    async fn lock_products(
        &mut self,
        product_ids: &[ProductId],
    ) -> StoreResult<HashMap<ProductId, ProductRecord>> {
        let ids: Vec<i64> = product_ids.iter().map(|id| (*id).into()).collect();

        let rows = sqlx::query(
            "SELECT id, title, price, image_url, stock_quantity, sales_count
             FROM products WHERE id = ANY($1) FOR UPDATE",
        )
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|err| map_sqlx_error(err, "lock_products"))?;

        info!(
            requested = ids.len(),
            locked = rows.len(),
            "[postgres.lock_products] product rows locked"
        );

        let mut locked = HashMap::with_capacity(rows.len());
        for row in rows {
            let product = product_from_row(&row)?;
            locked.insert(product.id, product);
        }
        Ok(locked)
    }

    #[instrument(name = "postgres.insert_order", skip_all)]
    async fn insert_order(&mut self, draft: OrderDraft) -> StoreResult<OrderId> {
        let placed_by: Option<i64> = draft.placed_by.map(Into::into);

        let row = sqlx::query(
            "INSERT INTO orders
                 (customer_name, customer_email, shipping_address, payment_method,
                  total_amount, line_items, placed_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id",
        )
        .bind(draft.customer_name.into_inner())
        .bind(draft.customer_email.map(CustomerEmail::into_inner))
        .bind(draft.shipping_address)
        .bind(draft.payment_method.map(PaymentMethod::into_inner))
        .bind(draft.total_amount.amount())
        .bind(draft.line_items)
        .bind(placed_by)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|err| map_sqlx_error(err, "insert_order"))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|err| map_sqlx_error(err, "insert_order"))?;
        Ok(OrderId::new(id))
    }

    #[instrument(name = "postgres.fulfill_line", skip(self))]
    async fn fulfill_line(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> StoreResult<()> {
        let quantity = i32::try_from(u32::from(quantity))
            .map_err(|_| StoreError::Internal("line quantity exceeds storage range".to_owned()))?;

        // The predicate keeps the decrement from underflowing even if the
        // caller's validation was bypassed; the CHECK constraint backs it up.
        let result = sqlx::query(
            "UPDATE products
             SET stock_quantity = stock_quantity - $2, sales_count = sales_count + $2
             WHERE id = $1 AND stock_quantity >= $2",
        )
        .bind(i64::from(product_id))
        .bind(quantity)
        .execute(&mut *self.tx)
        .await
        .map_err(|err| map_sqlx_error(err, "fulfill_line"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ConstraintViolation(format!(
                "stock underflow or missing row for product {product_id}"
            )));
        }
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|err| map_sqlx_error(err, "commit"))
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|err| map_sqlx_error(err, "rollback"))
    }
}

#[async_trait]
impl StorefrontStore for PostgresStorefrontStore {
    type Transaction = PostgresCheckoutTransaction;

    async fn begin(&self) -> StoreResult<Self::Transaction> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|err| map_sqlx_error(err, "begin"))?;
        Ok(PostgresCheckoutTransaction { tx })
    }

    #[instrument(name = "postgres.insert_product", skip_all, fields(title = %product.title))]
    async fn insert_product(&self, product: NewProduct) -> StoreResult<ProductId> {
        let stock = i32::try_from(u32::from(product.initial_stock))
            .map_err(|_| StoreError::Internal("initial stock exceeds storage range".to_owned()))?;

        let row = sqlx::query(
            "INSERT INTO products (title, price, image_url, stock_quantity, sales_count)
             VALUES ($1, $2, $3, $4, 0)
             RETURNING id",
        )
        .bind(product.title.into_inner())
        .bind(product.price.amount())
        .bind(product.image_url.map(ImageUrl::into_inner))
        .bind(stock)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_sqlx_error(err, "insert_product"))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|err| map_sqlx_error(err, "insert_product"))?;
        Ok(ProductId::new(id))
    }

    #[instrument(name = "postgres.fetch_product", skip(self))]
    async fn fetch_product(&self, product_id: ProductId) -> StoreResult<Option<ProductRecord>> {
        let row = sqlx::query(
            "SELECT id, title, price, image_url, stock_quantity, sales_count
             FROM products WHERE id = $1",
        )
        .bind(i64::from(product_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| map_sqlx_error(err, "fetch_product"))?;

        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(name = "postgres.list_products", skip(self))]
    async fn list_products(&self) -> StoreResult<Vec<ProductRecord>> {
        let rows = sqlx::query(
            "SELECT id, title, price, image_url, stock_quantity, sales_count
             FROM products ORDER BY title ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|err| map_sqlx_error(err, "list_products"))?;

        rows.iter().map(product_from_row).collect()
    }

    #[instrument(name = "postgres.fetch_order", skip(self))]
    async fn fetch_order(&self, order_id: OrderId) -> StoreResult<Option<OrderRecord>> {
        let row = sqlx::query(
            "SELECT id, customer_name, customer_email, shipping_address, payment_method,
                    total_amount, line_items, placed_by, created_at
             FROM orders WHERE id = $1",
        )
        .bind(i64::from(order_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| map_sqlx_error(err, "fetch_order"))?;

        row.as_ref().map(order_from_row).transpose()
    }
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|err| StoreError::DeserializationFailed(format!("column {name}: {err}")))
}

fn product_from_row(row: &PgRow) -> StoreResult<ProductRecord> {
    let id: i64 = column(row, "id")?;
    let title: String = column(row, "title")?;
    let price: Decimal = column(row, "price")?;
    let image_url: Option<String> = column(row, "image_url")?;
    let stock_quantity: i32 = column(row, "stock_quantity")?;
    let sales_count: i64 = column(row, "sales_count")?;

    Ok(ProductRecord {
        id: ProductId::new(id),
        title: ProductTitle::try_new(title)
            .map_err(|err| StoreError::DeserializationFailed(format!("product title: {err}")))?,
        price: Money::new(price)
            .map_err(|err| StoreError::DeserializationFailed(format!("product price: {err}")))?,
        image_url: image_url
            .map(ImageUrl::try_new)
            .transpose()
            .map_err(|err| StoreError::DeserializationFailed(format!("image url: {err}")))?,
        stock_quantity: StockQuantity::new(u32::try_from(stock_quantity).map_err(|_| {
            StoreError::DeserializationFailed(format!("negative stock {stock_quantity}"))
        })?),
        sales_count: SalesCount::new(u64::try_from(sales_count).map_err(|_| {
            StoreError::DeserializationFailed(format!("negative sales count {sales_count}"))
        })?),
    })
}

fn order_from_row(row: &PgRow) -> StoreResult<OrderRecord> {
    let id: i64 = column(row, "id")?;
    let customer_name: String = column(row, "customer_name")?;
    let customer_email: Option<String> = column(row, "customer_email")?;
    let shipping_address: String = column(row, "shipping_address")?;
    let payment_method: Option<String> = column(row, "payment_method")?;
    let total_amount: Decimal = column(row, "total_amount")?;
    let line_items: serde_json::Value = column(row, "line_items")?;
    let placed_by: Option<i64> = column(row, "placed_by")?;
    let created_at: DateTime<Utc> = column(row, "created_at")?;

    Ok(OrderRecord {
        id: OrderId::new(id),
        customer_name: CustomerName::try_new(customer_name)
            .map_err(|err| StoreError::DeserializationFailed(format!("customer name: {err}")))?,
        customer_email: customer_email
            .map(CustomerEmail::try_new)
            .transpose()
            .map_err(|err| StoreError::DeserializationFailed(format!("customer email: {err}")))?,
        shipping_address,
        payment_method: payment_method
            .map(PaymentMethod::try_new)
            .transpose()
            .map_err(|err| StoreError::DeserializationFailed(format!("payment method: {err}")))?,
        total_amount: Money::new(total_amount)
            .map_err(|err| StoreError::DeserializationFailed(format!("order total: {err}")))?,
        line_items,
        placed_by: placed_by.map(ordercore::types::UserId::new),
        created_at: Timestamp::new(created_at),
    })
}

fn map_sqlx_error(error: sqlx::Error, operation: &'static str) -> StoreError {
    if let sqlx::Error::Database(db_error) = &error {
        let code = db_error.code();
        match code.as_deref() {
            // lock_not_available: a NOWAIT/timeout on FOR UPDATE
            Some("55P03") => {
                warn!(
                    error = %db_error,
                    operation,
                    "[postgres.lock_contention] row lock not available"
                );
                return StoreError::LockContention(db_error.to_string());
            }
            // serialization_failure / deadlock_detected
            Some("40001" | "40P01") => {
                warn!(
                    error = %db_error,
                    operation,
                    "[postgres.serialization_conflict] transaction aborted by the engine"
                );
                return StoreError::SerializationConflict(db_error.to_string());
            }
            Some(code) if code.starts_with("23") => {
                return StoreError::ConstraintViolation(db_error.to_string());
            }
            // connection exceptions and too_many_connections
            Some(code) if code.starts_with("08") || code == "53300" => {
                return StoreError::ConnectionFailed(db_error.to_string());
            }
            // admin shutdown / crash shutdown / cannot connect now
            Some("57P01" | "57P02" | "57P03") => {
                return StoreError::Unavailable(db_error.to_string());
            }
            _ => {}
        }
    }

    match &error {
        sqlx::Error::PoolTimedOut => {
            StoreError::ConnectionFailed("connection pool timed out".to_owned())
        }
        sqlx::Error::PoolClosed => StoreError::ConnectionFailed("connection pool closed".to_owned()),
        sqlx::Error::Io(_) | sqlx::Error::Protocol(_) => {
            StoreError::ConnectionFailed(error.to_string())
        }
        _ => {
            error!(
                error = %error,
                operation,
                "[postgres.database_error] database operation failed"
            );
            StoreError::Internal(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let config = PostgresConfig::default();
        let max: std::num::NonZeroU32 = config.max_connections.into();
        assert_eq!(max.get(), 10);
        assert_eq!(config.acquire_timeout, Duration::from_secs(30));
        assert_eq!(config.idle_timeout, Duration::from_secs(600));
    }

    #[test]
    fn pool_errors_map_to_connection_failures() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut, "begin"),
            StoreError::ConnectionFailed(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed, "begin"),
            StoreError::ConnectionFailed(_)
        ));
    }

    #[test]
    fn unmapped_errors_fall_back_to_internal() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound, "fetch_order"),
            StoreError::Internal(_)
        ));
    }

    #[test]
    fn mapped_connection_failures_are_transient() {
        let err = map_sqlx_error(sqlx::Error::PoolTimedOut, "begin");
        assert!(err.is_transient());
    }
}
