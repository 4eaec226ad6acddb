// src/pipelines/remaining_payment_pipeline.rs

//! Remaining-balance flows of split-payment orders.

use crate::errors::AppError;
use crate::pipelines::contexts::{RemainingIntentCtxData, RemainingVerifyCtxData};
use crate::services::partial_payment::check_remaining_amount;
use storefront_flow::{ContextData, Flows, Pipeline, PipelineControl, StepMode};
use tracing::info;

pub fn register_remaining_intent_pipeline(flows: &Flows<AppError>) {
  let mut p = Pipeline::<RemainingIntentCtxData, AppError>::new(&[
    ("load_order", StepMode::Required, None),
    ("check_amount", StepMode::Required, None),
    ("create_intent", StepMode::Required, None),
  ])
  .named("remaining_intent");

  p.on_step("load_order", |ctx_data: ContextData<RemainingIntentCtxData>| {
    Box::pin(async move {
      let (coordinator, user_id, order_id) = {
        let guard = ctx_data.read();
        (guard.app_state.partial_payments.clone(), guard.user_id, guard.order_id)
      };
      let order = coordinator.load_partial_order(user_id, order_id).await?;
      ctx_data.write().order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_step("check_amount", |ctx_data: ContextData<RemainingIntentCtxData>| {
    Box::pin(async move {
      let amount_minor = {
        let guard = ctx_data.read();
        let order = guard
          .order
          .as_ref()
          .ok_or_else(|| AppError::Internal("check_amount ran without an order".to_string()))?;
        check_remaining_amount(order, guard.amount)?
      };
      ctx_data.write().amount_minor = amount_minor;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_step("create_intent", |ctx_data: ContextData<RemainingIntentCtxData>| {
    Box::pin(async move {
      let (coordinator, order, amount_minor) = {
        let guard = ctx_data.read();
        (guard.app_state.partial_payments.clone(), guard.order.clone(), guard.amount_minor)
      };
      let order = order.ok_or_else(|| AppError::Internal("create_intent ran without an order".to_string()))?;
      let intent = coordinator.open_intent(&order, amount_minor).await?;
      ctx_data.write().intent = Some(intent);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
  info!("Remaining-payment intent pipeline registered.");
}

pub fn register_remaining_verify_pipeline(flows: &Flows<AppError>) {
  let mut p = Pipeline::<RemainingVerifyCtxData, AppError>::new(&[
    ("load_order", StepMode::Required, None),
    ("verify_signature", StepMode::Required, None),
    ("settle", StepMode::Required, None),
  ])
  .named("remaining_verify");

  p.on_step("load_order", |ctx_data: ContextData<RemainingVerifyCtxData>| {
    Box::pin(async move {
      let (coordinator, user_id, order_id) = {
        let guard = ctx_data.read();
        (guard.app_state.partial_payments.clone(), guard.user_id, guard.order_id)
      };
      let order = coordinator.load_partial_order(user_id, order_id).await?;
      ctx_data.write().order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_step("verify_signature", |ctx_data: ContextData<RemainingVerifyCtxData>| {
    Box::pin(async move {
      let (coordinator, proof) = {
        let guard = ctx_data.read();
        (guard.app_state.partial_payments.clone(), guard.proof.clone())
      };
      coordinator.verify_signature(&proof).await?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_step("settle", |ctx_data: ContextData<RemainingVerifyCtxData>| {
    Box::pin(async move {
      let (coordinator, order, proof) = {
        let guard = ctx_data.read();
        (guard.app_state.partial_payments.clone(), guard.order.clone(), guard.proof.clone())
      };
      let order = order.ok_or_else(|| AppError::Internal("settle ran without an order".to_string()))?;
      let outcome = coordinator.settle(&order, &proof).await?;
      info!(
        "Remaining balance of order {} settled (already settled: {}).",
        order.id, outcome.already_settled
      );
      let mut guard = ctx_data.write();
      guard.order = Some(outcome.order.clone());
      guard.outcome = Some(outcome);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
  info!("Remaining-payment verification pipeline registered.");
}
