use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::{OrderId, OrderItemId, ProductId, ShippingInfoId, UserId};
use crate::{OrderError, OrderResult, StoreError};

/// A string that does not name any variant of a stored enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl From<UnknownVariant> for StoreError {
    fn from(err: UnknownVariant) -> Self {
        StoreError::Decode(err.to_string())
    }
}

impl From<UnknownVariant> for OrderError {
    fn from(err: UnknownVariant) -> Self {
        OrderError::InvalidInput(err.to_string())
    }
}

/// Lifecycle state of an order.
///
/// Transitions are not constrained: any status may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownVariant {
                kind: "order status",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    #[serde(rename = "paypal")]
    PayPal,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::PayPal => "paypal",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "paypal" => Ok(PaymentMethod::PayPal),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            other => Err(UnknownVariant {
                kind: "payment method",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address fields of a shipping record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    pub phone_number: String,
}

impl ShippingDetails {
    /// A blank address means no shipping details were supplied.
    pub fn is_supplied(&self) -> bool {
        !self.address.trim().is_empty()
    }

    /// Every field is required once an address is given.
    pub fn validate(&self) -> OrderResult<()> {
        let fields = [
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("country", &self.country),
            ("postal_code", &self.postal_code),
            ("phone_number", &self.phone_number),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(OrderError::invalid(format!(
                    "shipping field {name} is required"
                )));
            }
        }
        Ok(())
    }
}

/// Persisted shipping record, at most one per order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub id: ShippingInfoId,
    pub order_id: OrderId,
    #[serde(flatten)]
    pub details: ShippingDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of an order. `price` is the unit price captured when the line
/// was written and never follows later product price changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderItem {
    /// `price * quantity`, or `None` if the product overflows.
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Largest amount a `NUMERIC(12, 2)` column holds.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// A price must be positive, have at most two decimal places and fit
/// [`MAX_AMOUNT`].
pub fn validate_price(price: Decimal) -> OrderResult<()> {
    if price <= Decimal::ZERO {
        return Err(OrderError::invalid("price must be positive"));
    }
    if price.normalize().scale() > 2 {
        return Err(OrderError::invalid(
            "price must have at most two decimal places",
        ));
    }
    if price > MAX_AMOUNT {
        return Err(OrderError::invalid(format!(
            "price must not exceed {MAX_AMOUNT}"
        )));
    }
    Ok(())
}

pub(crate) fn line_total(price: Decimal, quantity: i32) -> OrderResult<Decimal> {
    price
        .checked_mul(Decimal::from(quantity))
        .filter(|total| *total <= MAX_AMOUNT)
        .ok_or_else(|| {
            OrderError::invalid(format!("line total of {quantity} x {price} is too large"))
        })
}

/// Adds `amount` to a running order total, keeping it within [`MAX_AMOUNT`].
pub(crate) fn add_to_total(total: Decimal, amount: Decimal) -> OrderResult<Decimal> {
    total
        .checked_add(amount)
        .filter(|sum| *sum <= MAX_AMOUNT)
        .ok_or_else(|| OrderError::invalid("order total is too large"))
}

/// A fully populated order: header, items and shipping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub items: Vec<OrderItem>,
    pub shipping: Option<ShippingInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order header as returned by list queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A requested line item.
///
/// `unit_price` is what the client believes the price to be; the workflow
/// records the product's current price instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemRequest {
    pub product_id: ProductId,
    pub quantity: i32,
    #[serde(default)]
    pub unit_price: Decimal,
}

/// Input of the create-order workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub user_id: UserId,
    pub items: Vec<LineItemRequest>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub shipping: Option<ShippingDetails>,
}

/// Amendments to an existing order. Absent fields are left untouched;
/// supplied shipping replaces the existing record wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub shipping: Option<ShippingDetails>,
}

/// Order header row about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

/// Order item row about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Selects the orders a list query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderFilter {
    All,
    User(UserId),
    Status(OrderStatus),
}

impl OrderFilter {
    pub fn matches(&self, order: &OrderSummary) -> bool {
        match self {
            OrderFilter::All => true,
            OrderFilter::User(user_id) => order.user_id == *user_id,
            OrderFilter::Status(status) => order.status == *status,
        }
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: i64,
    pub per_page: i64,
}

impl Page {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self { page, per_page }
    }

    /// Resolves the page into `(limit, offset)`.
    pub fn limit_offset(&self, default_per_page: i64, max_per_page: i64) -> (i64, i64) {
        let limit = if self.per_page < 1 {
            default_per_page
        } else {
            self.per_page.min(max_per_page)
        };
        let offset = (self.page.max(1) - 1).saturating_mul(limit).max(0);
        (limit, offset)
    }
}
