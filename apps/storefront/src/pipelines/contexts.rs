// src/pipelines/contexts.rs

//! Context data for the pipelines. Handlers receive these wrapped in
//! `storefront_flow::ContextData`.

use crate::models::{CartLine, LineItem, Order, PaymentMethod, PaymentProof, ShippingSnapshot};
use crate::services::gateway::PaymentIntent;
use crate::services::partial_payment::{RemainingIntent, RemainingSettlementOutcome};
use crate::state::AppState;
use rust_decimal::Decimal;
use uuid::Uuid;

/// What a customer submits at checkout.
#[derive(Debug, Clone)]
pub struct CheckoutSubmission {
  pub cart: Vec<CartLine>,
  pub shipping: ShippingSnapshot,
  pub payment_method: PaymentMethod,
  /// Absent for cash-on-delivery orders.
  pub payment_proof: Option<PaymentProof>,
  /// Deposit paid now; the rest is settled later.
  pub amount_paid: Option<Decimal>,
}

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub submission: CheckoutSubmission,
  pub line_items: Vec<LineItem>,
  pub order: Option<Order>,
  /// The payment was already attached to one of the caller's orders.
  pub replayed: bool,
  pub supplier_order_id: Option<String>,
}

impl CheckoutCtxData {
  pub fn new(app_state: AppState, user_id: Uuid, submission: CheckoutSubmission) -> Self {
    Self {
      app_state,
      user_id,
      submission,
      line_items: Vec::new(),
      order: None,
      replayed: false,
      supplier_order_id: None,
    }
  }
}

#[derive(Clone)]
pub struct PaymentIntentCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub amount: Decimal,
  pub receipt: Option<String>,
  pub amount_minor: i64,
  pub key_id: Option<String>,
  pub intent: Option<PaymentIntent>,
}

#[derive(Clone)]
pub struct RemainingIntentCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub order_id: Uuid,
  pub amount: Decimal,
  pub order: Option<Order>,
  pub amount_minor: i64,
  pub intent: Option<RemainingIntent>,
}

#[derive(Clone)]
pub struct RemainingVerifyCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub order_id: Uuid,
  pub proof: PaymentProof,
  pub order: Option<Order>,
  pub outcome: Option<RemainingSettlementOutcome>,
}
