//! Core domain types for `OrderCore`.
//!
//! All types use smart constructors to ensure validity at construction time,
//! following the "parse, don't validate" principle. Once a value exists it is
//! valid; checkout and catalog code never re-validates field contents.

use chrono::{DateTime, Utc};
use nutype::nutype;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A product identifier assigned by the store.
///
/// Cart lines reference products by this identifier. A `ProductId` carried in
/// a cart line is *not* guaranteed to name an existing product — unknown
/// identifiers are reported as line-level errors during checkout, not
/// rejected at parse time.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    Into,
    From,
    Serialize,
    Deserialize
))]
pub struct ProductId(i64);

/// An order identifier assigned by the store when the order row is created.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    Into,
    From,
    Serialize,
    Deserialize
))]
pub struct OrderId(i64);

/// A user identifier from a verified identity.
///
/// Only used to stamp audit metadata on orders and to gate admin catalog
/// writes; the checkout contract itself does not require one.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    Into,
    From,
    Serialize,
    Deserialize
))]
pub struct UserId(i64);

/// A requested quantity on a cart line.
///
/// Quantities are always at least 1; a line that requests nothing is not a
/// line. Stock levels use [`StockQuantity`], which may be zero.
#[nutype(
    validate(greater_or_equal = 1),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct Quantity(u32);

/// An on-hand stock level for a product. Zero is a valid (sold out) level.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    Into,
    From,
    Serialize,
    Deserialize
))]
pub struct StockQuantity(u32);

impl StockQuantity {
    /// A sold-out stock level.
    pub fn zero() -> Self {
        Self::new(0)
    }
}

/// A cumulative count of units sold for a product.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    Into,
    From,
    Serialize,
    Deserialize
))]
pub struct SalesCount(u64);

impl SalesCount {
    /// The sales count of a freshly created product.
    pub fn zero() -> Self {
        Self::new(0)
    }
}

/// A product title as shown in the catalog.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 200),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct ProductTitle(String);

/// A product image URL. Stored opaquely; fetching is someone else's problem.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 2048),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct ImageUrl(String);

/// A customer's display name on an order.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 100),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct CustomerName(String);

impl CustomerName {
    /// The placeholder name used when a caller supplies no customer name.
    pub fn guest() -> Self {
        Self::try_new("Guest").expect("placeholder name is non-empty")
    }
}

/// A customer email address with basic format validation.
#[nutype(
    sanitize(trim),
    validate(
        not_empty,
        len_char_max = 255,
        regex = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$"
    ),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct CustomerEmail(String);

/// A payment method label.
///
/// Accepted as an opaque caller-supplied value; checkout does not validate it
/// against a fixed set.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 50),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct PaymentMethod(String);

/// Errors from [`Money`] construction and arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// The amount was negative.
    #[error("money amount cannot be negative: {0}")]
    Negative(Decimal),
    /// The amount carried more than two fractional digits.
    #[error("money amount cannot have more than 2 decimal places: {0}")]
    TooPrecise(Decimal),
    /// The amount exceeded the representable maximum.
    #[error("money amount {0} exceeds maximum {max}", max = Money::MAX_AMOUNT)]
    TooLarge(Decimal),
}

/// A non-negative money amount with at most two fractional digits.
///
/// Backed by [`Decimal`] for exact arithmetic — unit prices and order totals
/// must never round through binary floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    /// Maximum representable amount (100 million).
    pub const MAX_AMOUNT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

    /// Parse a decimal amount into a money value.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() {
            return Err(MoneyError::Negative(amount));
        }
        if amount.scale() > 2 {
            return Err(MoneyError::TooPrecise(amount));
        }
        if amount > Self::MAX_AMOUNT {
            return Err(MoneyError::TooLarge(amount));
        }
        Ok(Self(amount))
    }

    /// Build a money value from a whole number of cents.
    pub fn from_cents(cents: u64) -> Result<Self, MoneyError> {
        let cents =
            i64::try_from(cents).map_err(|_| MoneyError::TooLarge(Decimal::from(cents)))?;
        Self::new(Decimal::new(cents, 2))
    }

    /// A zero amount.
    pub const fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// The underlying decimal amount.
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Add two amounts, rejecting results above [`Self::MAX_AMOUNT`].
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        Self::new(self.0 + other.0)
    }

    /// Multiply a unit price by a line quantity.
    pub fn multiply_by(self, quantity: Quantity) -> Result<Self, MoneyError> {
        let quantity: u32 = quantity.into();
        Self::new(self.0 * Decimal::from(quantity))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// The moment an order row was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Wrap a UTC `DateTime`.
    pub const fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// The current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// The underlying `DateTime`.
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Unwrap into the underlying `DateTime`.
    pub const fn into_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::new(datetime)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(timestamp: Timestamp) -> Self {
        timestamp.into_datetime()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
