// src/models/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Type as SqlxType;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Placed,
  Confirmed,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  fn rank(self) -> Option<u8> {
    match self {
      OrderStatus::Placed => Some(0),
      OrderStatus::Confirmed => Some(1),
      OrderStatus::Shipped => Some(2),
      OrderStatus::Delivered => Some(3),
      OrderStatus::Cancelled => None,
    }
  }

  /// Forward-only progression. `Cancelled` is reachable before shipping and
  /// neither `Cancelled` nor `Delivered` can be left.
  pub fn can_transition_to(self, next: OrderStatus) -> bool {
    match (self, next) {
      (OrderStatus::Cancelled, _) | (OrderStatus::Delivered, _) => false,
      (OrderStatus::Placed | OrderStatus::Confirmed, OrderStatus::Cancelled) => true,
      (_, OrderStatus::Cancelled) => false,
      (current, next) => matches!((current.rank(), next.rank()), (Some(a), Some(b)) if b > a),
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Placed => "placed",
      OrderStatus::Confirmed => "confirmed",
      OrderStatus::Shipped => "shipped",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Where the order came from. Only `Cod` orders may skip payment verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
  Card,
  Online,
  Cod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Paid,
  Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "remaining_payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RemainingPaymentStatus {
  Pending,
  Paid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
  pub product_id: String,
  pub name: String,
  pub image: Option<String>,
  pub unit_price: Decimal,
  pub quantity: u32,
  /// Supplier variant id, when the catalog already knows it.
  pub sku: Option<String>,
}

impl LineItem {
  /// `None` when the product does not fit in a `Decimal`.
  pub fn subtotal(&self) -> Option<Decimal> {
    self.unit_price.checked_mul(Decimal::from(self.quantity))
  }
}

/// Copy of the delivery address taken when the order is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingSnapshot {
  pub full_name: String,
  pub street: String,
  pub city: String,
  #[serde(default)]
  pub state: String,
  pub country: String,
  pub zip_code: String,
  pub phone: String,
}

/// Gateway callback fields proving a payment. Accepts the gateway's own
/// `razorpay_*` field names as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProof {
  #[serde(alias = "razorpay_order_id")]
  pub gateway_order_id: String,
  #[serde(alias = "razorpay_payment_id")]
  pub gateway_payment_id: String,
  #[serde(alias = "razorpay_signature")]
  pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub items: Vec<LineItem>,
  pub shipping: ShippingSnapshot,
  /// Sum of the line subtotals when the order was created. Never recomputed.
  pub total_amount: Decimal,
  pub currency: String,
  pub status: OrderStatus,
  pub payment_method: PaymentMethod,
  pub payment_status: PaymentStatus,
  pub gateway_order_id: Option<String>,
  pub gateway_payment_id: Option<String>,

  #[serde(rename = "cjOrderId")]
  pub supplier_order_id: Option<String>,
  pub supplier_response: Option<serde_json::Value>,

  pub is_partial_payment: bool,
  pub amount_paid: Option<Decimal>,
  pub remaining_amount: Option<Decimal>,
  pub remaining_payment_status: Option<RemainingPaymentStatus>,
  pub remaining_gateway_order_id: Option<String>,
  pub remaining_gateway_payment_id: Option<String>,

  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  /// Balance still owed on a partial-payment order. A missing or negative
  /// `remaining_amount` falls back to `total_amount - amount_paid`.
  pub fn outstanding_balance(&self) -> Decimal {
    match self.remaining_amount {
      Some(remaining) if remaining >= Decimal::ZERO => remaining,
      _ => self.total_amount - self.amount_paid.unwrap_or(Decimal::ZERO),
    }
  }

  pub fn remaining_settled(&self) -> bool {
    self.remaining_payment_status == Some(RemainingPaymentStatus::Paid)
  }
}
