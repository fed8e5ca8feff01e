//! Order metadata: customer details, shipping address, and the order records
//! produced by checkout.

use crate::cart::Cart;
use crate::types::{
    CustomerEmail, CustomerName, Money, OrderId, PaymentMethod, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};

/// Customer details as supplied with an order.
///
/// Both fields are optional; an absent name falls back to the "Guest"
/// placeholder when the order row is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    /// The customer's display name, if supplied.
    pub name: Option<CustomerName>,
    /// The customer's email address, if supplied.
    pub email: Option<CustomerEmail>,
}

impl CustomerDetails {
    /// An anonymous customer.
    pub fn guest() -> Self {
        Self::default()
    }

    /// The name to store on the order row, defaulting to "Guest".
    pub fn display_name(&self) -> CustomerName {
        self.name.clone().unwrap_or_else(CustomerName::guest)
    }
}

/// A shipping address as separate optional components.
///
/// Components are free text; empty or whitespace-only components are treated
/// as absent when the address is formatted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    /// House/street component.
    pub street: Option<String>,
    /// Road name component.
    pub road_name: Option<String>,
    /// Nearby landmark component.
    pub landmark: Option<String>,
    /// Postal code component.
    pub pincode: Option<String>,
}

impl ShippingAddress {
    /// Combine the present components into one comma-separated address line.
    ///
    /// Absent and empty components are omitted entirely — the result never
    /// contains placeholder text for missing parts. The pincode is rendered
    /// as `Pincode: <value>`.
    pub fn formatted(&self) -> String {
        let pincode = self
            .pincode
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("Pincode: {s}"));

        [
            self.street.as_deref().map(str::trim).map(str::to_owned),
            self.road_name.as_deref().map(str::trim).map(str::to_owned),
            self.landmark.as_deref().map(str::trim).map(str::to_owned),
            pincode,
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// A fully parsed order submission, ready for the checkout transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    /// Customer details (both fields optional).
    pub customer: CustomerDetails,
    /// Shipping address components.
    pub shipping_address: ShippingAddress,
    /// Opaque payment method label, if supplied.
    pub payment_method: Option<PaymentMethod>,
    /// The non-empty cart.
    pub cart: Cart,
}

impl OrderRequest {
    /// Build an order request from its parts.
    pub const fn new(
        customer: CustomerDetails,
        shipping_address: ShippingAddress,
        payment_method: Option<PaymentMethod>,
        cart: Cart,
    ) -> Self {
        Self {
            customer,
            shipping_address,
            payment_method,
            cart,
        }
    }
}

/// The order row handed to the store for insertion.
///
/// Built by checkout after validation: the total is computed from locked
/// prices, never taken from the caller, and the line items are the submitted
/// cart serialized verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    /// Customer name, "Guest" if none was supplied.
    pub customer_name: CustomerName,
    /// Customer email, if supplied.
    pub customer_email: Option<CustomerEmail>,
    /// The formatted shipping address line.
    pub shipping_address: String,
    /// Opaque payment method label, if supplied.
    pub payment_method: Option<PaymentMethod>,
    /// Server-computed order total.
    pub total_amount: Money,
    /// JSON snapshot of the submitted cart lines.
    pub line_items: serde_json::Value,
    /// The verified identity that placed the order, if any.
    pub placed_by: Option<UserId>,
}

/// A persisted order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Store-assigned order identifier.
    pub id: OrderId,
    /// Customer name as stored.
    pub customer_name: CustomerName,
    /// Customer email, if any.
    pub customer_email: Option<CustomerEmail>,
    /// Formatted shipping address line.
    pub shipping_address: String,
    /// Payment method label, if any.
    pub payment_method: Option<PaymentMethod>,
    /// Server-computed order total.
    pub total_amount: Money,
    /// JSON snapshot of the submitted cart lines.
    pub line_items: serde_json::Value,
    /// The verified identity that placed the order, if any.
    pub placed_by: Option<UserId>,
    /// When the order row was created.
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_defaults_to_guest() {
        assert_eq!(CustomerDetails::guest().display_name().as_ref(), "Guest");

        let named = CustomerDetails {
            name: Some(CustomerName::try_new("Asha Rao").unwrap()),
            email: None,
        };
        assert_eq!(named.display_name().as_ref(), "Asha Rao");
    }

    #[test]
    fn formatted_address_joins_present_components() {
        let address = ShippingAddress {
            street: Some("12 Hill View".into()),
            road_name: Some("MG Road".into()),
            landmark: Some("Opp. Library".into()),
            pincode: Some("560001".into()),
        };
        assert_eq!(
            address.formatted(),
            "12 Hill View, MG Road, Opp. Library, Pincode: 560001"
        );
    }

    #[test]
    fn formatted_address_omits_absent_and_empty_components() {
        let address = ShippingAddress {
            street: Some("12 Hill View".into()),
            road_name: Some("".into()),
            landmark: None,
            pincode: Some("560001".into()),
        };
        let formatted = address.formatted();
        assert_eq!(formatted, "12 Hill View, Pincode: 560001");
        assert!(!formatted.contains("null"));
    }

    #[test]
    fn formatted_address_trims_whitespace_components() {
        let address = ShippingAddress {
            street: Some("  12 Hill View  ".into()),
            road_name: Some("   ".into()),
            landmark: None,
            pincode: None,
        };
        assert_eq!(address.formatted(), "12 Hill View");
    }

    #[test]
    fn fully_absent_address_formats_to_empty_string() {
        assert_eq!(ShippingAddress::default().formatted(), "");
    }
}
