// src/services/partial_payment.rs

//! Second charge of a split-payment order.

use crate::errors::{AppError, PreconditionFailure, Result};
use crate::models::{Order, PaymentProof};
use crate::services::gateway::{PaymentGateway, PaymentIntent};
use crate::services::gateway_settings::GatewaySettings;
use crate::services::ledger::OrderLedger;
use crate::services::pricing::to_minor_units;
use crate::services::signature;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemainingIntent {
  pub order_id: Uuid,
  pub amount_minor: i64,
  pub key_id: String,
  pub intent: PaymentIntent,
}

#[derive(Debug, Clone)]
pub struct RemainingSettlementOutcome {
  pub order: Order,
  /// The balance had already been settled; nothing was written.
  pub already_settled: bool,
}

/// Checks that `amount` exactly matches the balance still owed, in minor units.
pub fn check_remaining_amount(order: &Order, amount: Decimal) -> Result<i64> {
  if order.remaining_settled() {
    return Err(PreconditionFailure::AlreadySettled.into());
  }
  let expected_minor = to_minor_units(order.outstanding_balance())?;
  let received_minor = to_minor_units(amount)?;
  if expected_minor != received_minor {
    return Err(
      PreconditionFailure::AmountMismatch {
        expected_minor,
        received_minor,
      }
      .into(),
    );
  }
  Ok(expected_minor)
}

/// The remaining balance is only paid by a payment made against the intent
/// opened for it, never by the deposit's own payment.
pub fn check_intent(order: &Order, proof: &PaymentProof) -> Result<()> {
  if order.gateway_payment_id.as_deref() == Some(proof.gateway_payment_id.as_str()) {
    return Err(AppError::DuplicatePayment(proof.gateway_payment_id.clone()));
  }
  if order.remaining_gateway_order_id.as_deref() != Some(proof.gateway_order_id.as_str()) {
    return Err(PreconditionFailure::IntentMismatch.into());
  }
  Ok(())
}

pub struct PartialPaymentCoordinator {
  ledger: Arc<OrderLedger>,
  gateway: Arc<dyn PaymentGateway>,
  settings: Arc<GatewaySettings>,
}

impl PartialPaymentCoordinator {
  pub fn new(ledger: Arc<OrderLedger>, gateway: Arc<dyn PaymentGateway>, settings: Arc<GatewaySettings>) -> Self {
    Self {
      ledger,
      gateway,
      settings,
    }
  }

  /// The caller's order, provided it was placed with a partial payment.
  pub async fn load_partial_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Order> {
    let order = self.ledger.get_for_user(order_id, user_id).await?;
    if !order.is_partial_payment {
      return Err(PreconditionFailure::NotPartialPayment.into());
    }
    Ok(order)
  }

  #[instrument(name = "PartialPaymentCoordinator::open_intent", skip(self, order), fields(order_id = %order.id), err)]
  pub async fn open_intent(&self, order: &Order, amount_minor: i64) -> Result<RemainingIntent> {
    let keys = self.settings.active_keys().await?;
    let receipt = format!("rem_{}", order.id.simple());
    let intent = self
      .gateway
      .create_intent(&keys, amount_minor, &order.currency, &receipt)
      .await?;
    self.ledger.record_remaining_intent(order.id, &intent.id).await?;
    info!(intent_id = %intent.id, amount_minor, "Remaining-balance intent created.");
    Ok(RemainingIntent {
      order_id: order.id,
      amount_minor,
      key_id: keys.key_id,
      intent,
    })
  }

  pub async fn create_remaining_intent(&self, user_id: Uuid, order_id: Uuid, amount: Decimal) -> Result<RemainingIntent> {
    let order = self.load_partial_order(user_id, order_id).await?;
    let amount_minor = check_remaining_amount(&order, amount)?;
    self.open_intent(&order, amount_minor).await
  }

  pub async fn verify_signature(&self, proof: &PaymentProof) -> Result<()> {
    let secret = self.settings.signing_secret().await?;
    signature::verify(&secret, &proof.gateway_order_id, &proof.gateway_payment_id, &proof.signature)
  }

  /// Marks the balance paid. The proof must belong to the last intent opened
  /// for this order. Settling an already settled order succeeds without
  /// writing anything.
  #[instrument(name = "PartialPaymentCoordinator::settle", skip(self, order, proof), fields(order_id = %order.id), err)]
  pub async fn settle(&self, order: &Order, proof: &PaymentProof) -> Result<RemainingSettlementOutcome> {
    if order.remaining_settled() {
      info!("Remaining balance already settled; nothing to do.");
      return Ok(RemainingSettlementOutcome {
        order: order.clone(),
        already_settled: true,
      });
    }
    check_intent(order, proof)?;
    let settled_now = self.ledger.settle_remaining(order.id, proof).await?;
    if !settled_now {
      info!("Remaining balance was settled by a concurrent request.");
    }
    Ok(RemainingSettlementOutcome {
      order: self.ledger.get(order.id).await?,
      already_settled: !settled_now,
    })
  }

  pub async fn verify_remaining(&self, user_id: Uuid, order_id: Uuid, proof: &PaymentProof) -> Result<RemainingSettlementOutcome> {
    let order = self.load_partial_order(user_id, order_id).await?;
    self.verify_signature(proof).await?;
    self.settle(&order, proof).await
  }
}
