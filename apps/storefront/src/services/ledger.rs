// src/services/ledger.rs

//! The order ledger: the only place orders are created or have their
//! status changed.

use crate::db::{OrderRepository, RemainingSettlement, SupplierLinkage};
use crate::errors::{AppError, Result};
use crate::models::{
  LineItem, Order, OrderStatus, PaymentMethod, PaymentProof, PaymentStatus, RemainingPaymentStatus, ShippingSnapshot,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Everything needed to write a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
  pub user_id: Uuid,
  pub items: Vec<LineItem>,
  pub shipping: ShippingSnapshot,
  pub currency: String,
  pub payment_method: PaymentMethod,
  /// Verified gateway payment. `None` only for cash-on-delivery orders.
  pub payment: Option<PaymentProof>,
  /// Deposit already paid when the order is settled in two charges.
  pub amount_paid: Option<Decimal>,
}

/// Sum of the line subtotals. Overflow is an input error.
pub fn order_total(items: &[LineItem]) -> Result<Decimal> {
  items.iter().try_fold(Decimal::ZERO, |total, item| {
    item
      .subtotal()
      .and_then(|subtotal| total.checked_add(subtotal))
      .ok_or_else(|| AppError::Validation(format!("Order total is out of range at product {}", item.product_id)))
  })
}

pub struct OrderLedger {
  orders: Arc<dyn OrderRepository>,
}

impl OrderLedger {
  pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
    Self { orders }
  }

  #[instrument(name = "OrderLedger::create", skip_all, fields(user_id = %new_order.user_id), err)]
  pub async fn create(&self, new_order: NewOrder) -> Result<Order> {
    if new_order.items.is_empty() {
      return Err(AppError::Validation("Cart is empty".to_string()));
    }
    let total_amount = order_total(&new_order.items)?;

    let (is_partial_payment, remaining_amount, remaining_payment_status) = match new_order.amount_paid {
      None => (false, None, None),
      Some(_) if new_order.payment.is_none() => {
        return Err(AppError::Validation(
          "A partial payment needs a verified deposit".to_string(),
        ))
      }
      Some(paid) if paid <= Decimal::ZERO || paid >= total_amount => {
        return Err(AppError::Validation(format!(
          "Deposit {} must be above zero and below the order total {}",
          paid, total_amount
        )))
      }
      Some(paid) => (true, Some(total_amount - paid), Some(RemainingPaymentStatus::Pending)),
    };

    let payment_status = if new_order.payment.is_some() {
      PaymentStatus::Paid
    } else {
      PaymentStatus::Pending
    };
    let (gateway_order_id, gateway_payment_id) = match new_order.payment {
      Some(proof) => (Some(proof.gateway_order_id), Some(proof.gateway_payment_id)),
      None => (None, None),
    };

    let now = Utc::now();
    let order = Order {
      id: Uuid::new_v4(),
      user_id: new_order.user_id,
      items: new_order.items,
      shipping: new_order.shipping,
      total_amount,
      currency: new_order.currency,
      status: OrderStatus::Placed,
      payment_method: new_order.payment_method,
      payment_status,
      gateway_order_id,
      gateway_payment_id,
      supplier_order_id: None,
      supplier_response: None,
      is_partial_payment,
      amount_paid: new_order.amount_paid,
      remaining_amount,
      remaining_payment_status,
      remaining_gateway_order_id: None,
      remaining_gateway_payment_id: None,
      created_at: now,
      updated_at: now,
    };

    self.orders.insert_order(&order).await?;
    info!(order_id = %order.id, total = %order.total_amount, "Order placed.");
    Ok(order)
  }

  pub async fn get(&self, order_id: Uuid) -> Result<Order> {
    self
      .orders
      .find_order(order_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))
  }

  /// Orders owned by someone else are reported as missing.
  pub async fn get_for_user(&self, order_id: Uuid, user_id: Uuid) -> Result<Order> {
    match self.orders.find_order(order_id).await? {
      Some(order) if order.user_id == user_id => Ok(order),
      _ => Err(AppError::NotFound(format!("Order {} not found", order_id))),
    }
  }

  pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
    self.orders.list_orders_for_user(user_id).await
  }

  pub async fn find_by_payment_id(&self, gateway_payment_id: &str) -> Result<Option<Order>> {
    self.orders.find_by_gateway_payment_id(gateway_payment_id).await
  }

  pub async fn record_supplier_linkage(&self, order_id: Uuid, linkage: SupplierLinkage) -> Result<()> {
    self.orders.record_supplier_linkage(order_id, &linkage).await
  }

  #[instrument(name = "OrderLedger::advance_status", skip(self), err)]
  pub async fn advance_status(&self, order_id: Uuid, next: OrderStatus) -> Result<Order> {
    let current = self.get(order_id).await?;
    if !current.status.can_transition_to(next) {
      return Err(AppError::Validation(format!(
        "Order cannot move from {} to {}",
        current.status, next
      )));
    }
    self.orders.update_status(order_id, next).await?;
    info!(from = %current.status, to = %next, "Order status changed.");
    self.get(order_id).await
  }

  /// Remembers the gateway intent the remaining balance must be paid against.
  pub async fn record_remaining_intent(&self, order_id: Uuid, gateway_order_id: &str) -> Result<()> {
    self.orders.record_remaining_intent(order_id, gateway_order_id).await
  }

  /// Returns `true` if this call settled the balance. A payment id already
  /// attached to any order fails with `AppError::DuplicatePayment`.
  pub async fn settle_remaining(&self, order_id: Uuid, proof: &PaymentProof) -> Result<bool> {
    let settlement = RemainingSettlement {
      gateway_order_id: proof.gateway_order_id.clone(),
      gateway_payment_id: proof.gateway_payment_id.clone(),
    };
    self.orders.settle_remaining(order_id, &settlement).await
  }
}
