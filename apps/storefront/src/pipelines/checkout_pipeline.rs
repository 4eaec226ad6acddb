// src/pipelines/checkout_pipeline.rs

//! Checkout: normalize cart -> verify payment -> persist order -> forward to supplier.
//!
//! Everything up to `persist_order` is required; a failure there leaves no
//! order behind. `sync_supplier` is advisory: once the order is stored the
//! checkout succeeds whatever the supplier does.

use crate::errors::AppError;
use crate::models::{CartLine, LineItem, PaymentMethod, ShippingSnapshot};
use crate::pipelines::contexts::CheckoutCtxData;
use crate::services::ledger::{order_total, NewOrder};
use crate::services::pricing::normalize_price;
use crate::services::signature;
use std::sync::Arc;
use storefront_flow::{ContextData, Flows, Pipeline, PipelineControl, StepMode};
use tracing::{info, warn};

pub const NORMALIZE_CART: &str = "normalize_cart";
pub const VERIFY_PAYMENT: &str = "verify_payment";
pub const REPLAY_GUARD: &str = "replay_guard";
pub const PERSIST_ORDER: &str = "persist_order";
pub const SYNC_SUPPLIER: &str = "sync_supplier";

fn validate_shipping(shipping: &ShippingSnapshot) -> Result<(), AppError> {
  let required = [
    ("fullName", &shipping.full_name),
    ("street", &shipping.street),
    ("city", &shipping.city),
    ("country", &shipping.country),
    ("zipCode", &shipping.zip_code),
    ("phone", &shipping.phone),
  ];
  match required.iter().find(|(_, value)| value.trim().is_empty()) {
    Some((field, _)) => Err(AppError::Validation(format!("Shipping {} is required", field))),
    None => Ok(()),
  }
}

/// Turns submitted cart lines into priced line items whose total is
/// representable.
pub fn normalize_cart(cart: &[CartLine]) -> Result<Vec<LineItem>, AppError> {
  if cart.is_empty() {
    return Err(AppError::Validation("Cart is empty".to_string()));
  }
  let items = cart
    .iter()
    .map(|line| {
      if line.product_id.trim().is_empty() {
        return Err(AppError::Validation("Cart line without a product id".to_string()));
      }
      if line.quantity == 0 {
        return Err(AppError::Validation(format!(
          "Quantity for product {} must be at least 1",
          line.product_id
        )));
      }
      Ok(LineItem {
        product_id: line.product_id.clone(),
        name: line.name.clone(),
        image: line.image.clone(),
        unit_price: normalize_price(&line.price)?,
        quantity: line.quantity,
        sku: line.sku.clone(),
      })
    })
    .collect::<Result<Vec<_>, AppError>>()?;
  order_total(&items)?;
  Ok(items)
}

pub fn register_checkout_pipeline(flows: &Flows<AppError>) {
  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(&[
    (NORMALIZE_CART, StepMode::Required, None),
    (
      VERIFY_PAYMENT,
      StepMode::Required,
      Some(Arc::new(|ctx: ContextData<CheckoutCtxData>| ctx.read().submission.payment_proof.is_none())),
    ),
    (
      REPLAY_GUARD,
      StepMode::Optional,
      Some(Arc::new(|ctx: ContextData<CheckoutCtxData>| ctx.read().submission.payment_proof.is_none())),
    ),
    (PERSIST_ORDER, StepMode::Required, None),
    (SYNC_SUPPLIER, StepMode::Advisory, None),
  ])
  .named("checkout");

  p.on_step(NORMALIZE_CART, |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (user_id, submission) = {
        let guard = ctx_data.read();
        (guard.user_id, guard.submission.clone())
      };

      match (submission.payment_method, &submission.payment_proof) {
        (PaymentMethod::Cod, Some(_)) => {
          return Err(AppError::Validation(
            "Cash-on-delivery orders do not carry a payment".to_string(),
          ))
        }
        (PaymentMethod::Cod, None) if submission.amount_paid.is_some() => {
          return Err(AppError::Validation(
            "Cash-on-delivery orders cannot be split".to_string(),
          ))
        }
        (method, None) if method != PaymentMethod::Cod => {
          return Err(AppError::Validation(format!(
            "Payment details are required for {:?} orders",
            method
          )))
        }
        _ => {}
      }
      validate_shipping(&submission.shipping)?;
      let line_items = normalize_cart(&submission.cart)?;

      info!(
        "Checkout (User {}): {} cart line(s) normalized.",
        user_id,
        line_items.len()
      );
      ctx_data.write().line_items = line_items;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_step(VERIFY_PAYMENT, |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (settings, proof) = {
        let guard = ctx_data.read();
        (
          guard.app_state.gateway_settings.clone(),
          guard.submission.payment_proof.clone(),
        )
      };
      let proof = proof.ok_or_else(|| AppError::Internal("verify_payment ran without a payment".to_string()))?;

      let secret = settings.signing_secret().await?;
      if let Err(e) = signature::verify(
        &secret,
        &proof.gateway_order_id,
        &proof.gateway_payment_id,
        &proof.signature,
      ) {
        warn!(
          "Checkout: signature check failed for payment {}.",
          proof.gateway_payment_id
        );
        return Err(e);
      }
      info!("Checkout: payment {} verified.", proof.gateway_payment_id);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_step(REPLAY_GUARD, |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (ledger, user_id, payment_id) = {
        let guard = ctx_data.read();
        (
          guard.app_state.ledger.clone(),
          guard.user_id,
          guard
            .submission
            .payment_proof
            .as_ref()
            .map(|p| p.gateway_payment_id.clone())
            .unwrap_or_default(),
        )
      };

      match ledger.find_by_payment_id(&payment_id).await? {
        None => Ok::<_, AppError>(PipelineControl::Continue),
        // Only the order this payment created is replayed. A payment that
        // settled a remaining balance never opens a new order.
        Some(existing)
          if existing.user_id == user_id && existing.gateway_payment_id.as_deref() == Some(payment_id.as_str()) =>
        {
          info!(
            "Checkout: payment {} already produced order {}; replaying it.",
            payment_id, existing.id
          );
          let mut guard = ctx_data.write();
          guard.order = Some(existing);
          guard.replayed = true;
          Ok(PipelineControl::Stop)
        }
        Some(_) => Err(AppError::DuplicatePayment(payment_id)),
      }
    })
  });

  p.on_step(PERSIST_ORDER, |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (ledger, new_order) = {
        let guard = ctx_data.read();
        let submission = &guard.submission;
        (
          guard.app_state.ledger.clone(),
          NewOrder {
            user_id: guard.user_id,
            items: guard.line_items.clone(),
            shipping: submission.shipping.clone(),
            currency: guard.app_state.config.store_currency.clone(),
            payment_method: submission.payment_method,
            payment: submission.payment_proof.clone(),
            amount_paid: submission.amount_paid,
          },
        )
      };

      let order = ledger.create(new_order).await?;
      ctx_data.write().order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_step(SYNC_SUPPLIER, |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (sync, ledger, order) = {
        let guard = ctx_data.read();
        (
          guard.app_state.supplier_sync.clone(),
          guard.app_state.ledger.clone(),
          guard.order.clone(),
        )
      };
      let order = order.ok_or_else(|| AppError::Internal("sync_supplier ran before persist_order".to_string()))?;

      let synced = sync.synchronize(&order).await;
      // The synchronizer wrote its outcome onto the order either way.
      let refreshed = ledger.get(order.id).await?;
      {
        let mut guard = ctx_data.write();
        guard.order = Some(refreshed);
        guard.supplier_order_id = synced.as_ref().ok().cloned();
      }
      synced.map(|_| PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
  info!("Checkout pipeline registered.");
}
