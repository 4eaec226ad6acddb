// src/pipelines/mod.rs

//! Defines and registers every pipeline the storefront runs.

use crate::errors::AppError;
use storefront_flow::Flows;

pub mod contexts;

pub mod checkout_pipeline;
pub mod payment_intent_pipeline;
pub mod remaining_payment_pipeline;

/// Registers all pipelines. Called once while building the application state.
pub fn register_all_pipelines(flows: &Flows<AppError>) {
  tracing::info!("Registering pipelines...");

  checkout_pipeline::register_checkout_pipeline(flows);
  payment_intent_pipeline::register_payment_intent_pipeline(flows);
  remaining_payment_pipeline::register_remaining_intent_pipeline(flows);
  remaining_payment_pipeline::register_remaining_verify_pipeline(flows);

  tracing::info!("All application pipelines registered.");
}
