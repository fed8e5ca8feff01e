//! Catalog maintenance and read operations.
//!
//! Product creation is an admin write, gated on the verified identity's role
//! flag. Reads are open: the storefront listing and the checkout flow both
//! consume them.

use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::auth::Identity;
use crate::errors::{CatalogError, CatalogResult};
use crate::product::{NewProduct, ProductRecord};
use crate::store::StorefrontStore;
use crate::types::ProductId;

/// A catalog row with its derived inventory value, as listed for admins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSummary {
    /// The product row.
    pub product: ProductRecord,
    /// `price * stock_quantity` at listing time.
    pub inventory_value: Decimal,
}

/// Add a product to the catalog.
///
/// Requires an identity with the admin flag; the sales count of the new row
/// starts at zero.
#[instrument(name = "catalog.create_product", skip_all, fields(title = %product.title))]
pub async fn create_product<S: StorefrontStore>(
    store: &S,
    identity: &Identity,
    product: NewProduct,
) -> CatalogResult<ProductId> {
    if !identity.is_admin {
        return Err(CatalogError::Unauthorized);
    }

    let product_id = store.insert_product(product).await?;
    info!(product_id = %product_id, "product created");
    Ok(product_id)
}

/// Fetch one product by identifier. Absent products are `Ok(None)`.
pub async fn fetch_product<S: StorefrontStore>(
    store: &S,
    product_id: ProductId,
) -> CatalogResult<Option<ProductRecord>> {
    Ok(store.fetch_product(product_id).await?)
}

/// List all products, ordered by title, each with its inventory value.
pub async fn list_products<S: StorefrontStore>(store: &S) -> CatalogResult<Vec<ProductSummary>> {
    let products = store.list_products().await?;
    Ok(products
        .into_iter()
        .map(|product| {
            let inventory_value = product.inventory_value();
            ProductSummary {
                product,
                inventory_value,
            }
        })
        .collect())
}
