// src/pipelines/payment_intent_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::contexts::PaymentIntentCtxData;
use crate::services::pricing::to_minor_units;
use rust_decimal::Decimal;
use storefront_flow::{ContextData, Flows, Pipeline, PipelineControl, StepMode};
use tracing::info;
use uuid::Uuid;

pub fn register_payment_intent_pipeline(flows: &Flows<AppError>) {
  let mut p = Pipeline::<PaymentIntentCtxData, AppError>::new(&[
    ("validate_amount", StepMode::Required, None),
    ("create_intent", StepMode::Required, None),
  ])
  .named("payment_intent");

  p.on_step("validate_amount", |ctx_data: ContextData<PaymentIntentCtxData>| {
    Box::pin(async move {
      let amount = ctx_data.read().amount;
      if amount <= Decimal::ZERO {
        return Err(AppError::Validation(format!("Invalid amount {}", amount)));
      }
      let amount_minor = to_minor_units(amount)?;
      if amount_minor < 1 {
        return Err(AppError::Validation(format!("Invalid amount {}", amount)));
      }
      ctx_data.write().amount_minor = amount_minor;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_step("create_intent", |ctx_data: ContextData<PaymentIntentCtxData>| {
    Box::pin(async move {
      let (app_state, user_id, amount_minor, receipt) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.user_id, guard.amount_minor, guard.receipt.clone())
      };
      let receipt = receipt
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| format!("rcpt_{}", Uuid::new_v4().simple()));

      let keys = app_state.gateway_settings.active_keys().await?;
      let intent = app_state
        .gateway
        .create_intent(&keys, amount_minor, &app_state.config.store_currency, &receipt)
        .await?;
      info!(
        "Payment intent {} created for user {} ({} minor units).",
        intent.id, user_id, amount_minor
      );

      let mut guard = ctx_data.write();
      guard.key_id = Some(keys.key_id);
      guard.intent = Some(intent);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
  info!("Payment intent pipeline registered.");
}
