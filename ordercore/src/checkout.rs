//! The order placement transaction.
//!
//! [`place_order`] is the one designed contract of this workspace: given a
//! non-empty cart and order metadata, create exactly one order row and adjust
//! stock for every line, as a single all-or-nothing unit. The row locks taken
//! by [`CheckoutTransaction::lock_products`] are the sole concurrency-control
//! primitive — two concurrent checkouts for overlapping products serialize
//! there, which is what prevents overselling.
//!
//! Validation is exhaustive: every failing line is reported, never just the
//! first. Duplicate product identifiers are not coalesced — each line keeps
//! its own error slot — but the stock check is cumulative in submission
//! order, so a set of duplicate lines can never jointly claim more than the
//! locked stock.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::auth::Identity;
use crate::cart::CartLine;
use crate::errors::{CheckoutError, CheckoutResult, LineError};
use crate::order::{OrderDraft, OrderRequest};
use crate::product::ProductRecord;
use crate::store::{CheckoutTransaction, StorefrontStore};
use crate::types::{Money, OrderId, ProductId};

/// The result of a successful order placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutOutcome {
    /// The store-assigned identifier of the new order.
    pub order_id: OrderId,
    /// The server-computed order total.
    pub total_amount: Money,
}

enum LineValidation {
    Valid { total: Decimal },
    Invalid(Vec<LineError>),
}

/// Check every line against the locked snapshot, collecting all failures.
///
/// Lines are processed in submission order. Each line claims its quantity
/// from the snapshot stock net of earlier claims for the same product, so
/// duplicate lines validate against what is genuinely left rather than each
/// seeing the full snapshot. The running total accumulates locked prices
/// only — nothing client-supplied.
fn validate_lines(
    lines: &[CartLine],
    locked: &HashMap<ProductId, ProductRecord>,
) -> LineValidation {
    let mut errors = Vec::new();
    let mut remaining: HashMap<ProductId, u32> = locked
        .iter()
        .map(|(id, product)| (*id, product.stock_quantity.into()))
        .collect();
    let mut total = Decimal::ZERO;

    for line in lines {
        let Some(product) = locked.get(&line.product_id) else {
            errors.push(LineError::not_found(line.product_id));
            continue;
        };
        let quantity: u32 = line.quantity.into();
        let available = remaining
            .get_mut(&line.product_id)
            .expect("every locked product has a remaining entry");
        if *available < quantity {
            errors.push(LineError::insufficient_stock(line.product_id));
            continue;
        }
        *available -= quantity;
        total += product.price.amount() * Decimal::from(quantity);
    }

    if errors.is_empty() {
        LineValidation::Valid { total }
    } else {
        LineValidation::Invalid(errors)
    }
}

/// Place an order as one atomic transaction.
///
/// The flow follows the contract exactly: begin, lock the distinct product
/// rows, validate every line against the locked snapshot, then either roll
/// back with the full error list or insert the order row, apply per-line
/// stock adjustments, and commit. Any store failure after `begin` unwinds
/// through `?`, dropping the transaction — which rolls it back, so no
/// partial order or stock mutation is ever observable. The same drop
/// semantics cover a caller that disconnects mid-flight.
///
/// `placed_by` is optional audit metadata from a verified identity; checkout
/// works for anonymous callers.
#[instrument(name = "checkout.place_order", skip_all, fields(lines = request.cart.len()))]
pub async fn place_order<S: StorefrontStore>(
    store: &S,
    request: OrderRequest,
    placed_by: Option<&Identity>,
) -> CheckoutResult<CheckoutOutcome> {
    let mut tx = store.begin().await?;
    let locked = tx
        .lock_products(&request.cart.distinct_product_ids())
        .await?;

    let total = match validate_lines(request.cart.lines(), &locked) {
        LineValidation::Invalid(errors) => {
            // A failed rollback must not mask the validation result.
            if let Err(rollback_error) = tx.rollback().await {
                warn!(error = %rollback_error, "rollback after validation failure failed");
            }
            return Err(CheckoutError::Validation(errors));
        }
        LineValidation::Valid { total } => Money::new(total).map_err(|error| {
            CheckoutError::Internal(format!("computed order total out of range: {error}"))
        })?,
    };

    let draft = OrderDraft {
        customer_name: request.customer.display_name(),
        customer_email: request.customer.email.clone(),
        shipping_address: request.shipping_address.formatted(),
        payment_method: request.payment_method.clone(),
        total_amount: total,
        line_items: request.cart.snapshot(),
        placed_by: placed_by.map(|identity| identity.user_id),
    };

    let order_id = tx.insert_order(draft).await?;
    for line in request.cart.lines() {
        tx.fulfill_line(line.product_id, line.quantity).await?;
    }
    tx.commit().await?;

    info!(order_id = %order_id, total = %total, "order placed");
    Ok(CheckoutOutcome {
        order_id,
        total_amount: total,
    })
}
