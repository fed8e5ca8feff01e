//! Wire-format payloads for the order placement contract.
//!
//! These are the camelCase JSON shapes of the external interface: the order
//! submission request, the success body, and the per-line validation failure
//! body. The transport that carries them (HTTP or otherwise) is an external
//! collaborator's concern; this module only parses payloads into domain
//! types and renders results back out.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::{Cart, CartLine};
use crate::checkout::CheckoutOutcome;
use crate::errors::LineError;
use crate::order::{CustomerDetails, OrderRequest, ShippingAddress};
use crate::types::{
    CustomerEmail, CustomerName, Money, OrderId, PaymentMethod, ProductId, Quantity,
};

/// An order submission as received from the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    /// Customer block, entirely optional.
    #[serde(default)]
    pub customer: Option<CustomerPayload>,
    /// Shipping address block, entirely optional.
    #[serde(default)]
    pub shipping_address: Option<ShippingAddressPayload>,
    /// Opaque payment method label.
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Cart lines; must be non-empty.
    #[serde(default)]
    pub items: Vec<ItemPayload>,
}

/// The customer block of an order submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPayload {
    /// Customer display name.
    #[serde(default)]
    pub full_name: Option<String>,
    /// Customer email address.
    #[serde(default)]
    pub email: Option<String>,
}

/// The shipping address block of an order submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressPayload {
    /// House/street component.
    #[serde(default)]
    pub street: Option<String>,
    /// Road name component.
    #[serde(default)]
    pub road_name: Option<String>,
    /// Nearby landmark component.
    #[serde(default)]
    pub landmark: Option<String>,
    /// Postal code component.
    #[serde(default)]
    pub pincode: Option<String>,
}

/// One cart entry of an order submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPayload {
    /// The referenced product identifier.
    pub id: i64,
    /// The requested quantity.
    pub quantity: u32,
}

/// Rejections produced while parsing an [`OrderPayload`] into domain types.
///
/// These are input errors: no transaction has been opened when one of these
/// surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// The items list was missing or empty.
    #[error("order must contain at least one item")]
    NoItems,
    /// An item carried a zero quantity.
    #[error("item for product {id} has invalid quantity {quantity}")]
    InvalidQuantity {
        /// The offending item's product identifier.
        id: i64,
        /// The quantity as submitted.
        quantity: u32,
    },
    /// The customer name was present but unusable (e.g. too long).
    #[error("invalid customer name")]
    InvalidName,
    /// The customer email was present but not a plausible address.
    #[error("invalid customer email")]
    InvalidEmail,
    /// The payment method label was present but unusable (e.g. too long).
    #[error("invalid payment method")]
    InvalidPaymentMethod,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

impl TryFrom<OrderPayload> for OrderRequest {
    type Error = PayloadError;

    fn try_from(payload: OrderPayload) -> Result<Self, Self::Error> {
        if payload.items.is_empty() {
            return Err(PayloadError::NoItems);
        }

        let mut lines = Vec::with_capacity(payload.items.len());
        for item in &payload.items {
            let quantity =
                Quantity::try_new(item.quantity).map_err(|_| PayloadError::InvalidQuantity {
                    id: item.id,
                    quantity: item.quantity,
                })?;
            lines.push(CartLine::new(ProductId::new(item.id), quantity));
        }
        let cart = Cart::try_new(lines).map_err(|_| PayloadError::NoItems)?;

        let customer_payload = payload.customer.unwrap_or_default();
        let customer = CustomerDetails {
            name: present(customer_payload.full_name)
                .map(CustomerName::try_new)
                .transpose()
                .map_err(|_| PayloadError::InvalidName)?,
            email: present(customer_payload.email)
                .map(CustomerEmail::try_new)
                .transpose()
                .map_err(|_| PayloadError::InvalidEmail)?,
        };

        let address_payload = payload.shipping_address.unwrap_or_default();
        let shipping_address = ShippingAddress {
            street: address_payload.street,
            road_name: address_payload.road_name,
            landmark: address_payload.landmark,
            pincode: address_payload.pincode,
        };

        let payment_method = present(payload.payment_method)
            .map(PaymentMethod::try_new)
            .transpose()
            .map_err(|_| PayloadError::InvalidPaymentMethod)?;

        Ok(Self::new(customer, shipping_address, payment_method, cart))
    }
}

/// The success response body: `{orderId, totalAmount}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlacedBody {
    /// The new order's identifier.
    pub order_id: OrderId,
    /// The server-computed total.
    pub total_amount: Money,
}

impl From<CheckoutOutcome> for OrderPlacedBody {
    fn from(outcome: CheckoutOutcome) -> Self {
        Self {
            order_id: outcome.order_id,
            total_amount: outcome.total_amount,
        }
    }
}

/// One entry of the validation failure body: `{id, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineErrorBody {
    /// The failing line's product identifier.
    pub id: i64,
    /// The user-facing message for this line.
    pub message: String,
}

impl From<&LineError> for LineErrorBody {
    fn from(error: &LineError) -> Self {
        Self {
            id: error.product_id.into(),
            message: error.issue.to_string(),
        }
    }
}

/// The validation failure response body, listing every failing line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailureBody {
    /// Fixed summary message.
    pub message: String,
    /// One entry per failing line, in submission order.
    pub errors: Vec<LineErrorBody>,
}

impl ValidationFailureBody {
    /// Render a set of line errors into the wire shape.
    pub fn from_line_errors(errors: &[LineError]) -> Self {
        Self {
            message: "Validation failed".to_owned(),
            errors: errors.iter().map(LineErrorBody::from).collect(),
        }
    }
}
