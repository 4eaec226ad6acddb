// src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{CartLine, PaymentMethod, PaymentProof, ShippingSnapshot};
use crate::pipelines::contexts::{
  CheckoutSubmission, PaymentIntentCtxData, RemainingIntentCtxData, RemainingVerifyCtxData,
};
use crate::services::gateway_settings::GatewaySettingsUpdate;
use crate::state::AppState;
use crate::web::extractors::{AdminUser, AuthenticatedUser};
use crate::web::handlers::order_handlers::run_checkout;
use storefront_flow::ContextData;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
  pub amount: Decimal,
  #[serde(default)]
  pub receipt: Option<String>,
}

#[instrument(
  name = "handler::create_payment_intent",
  skip(app_state, req_payload, auth_user),
  fields(user_id = %auth_user.user_id)
)]
pub async fn create_payment_intent_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CreateIntentRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let req = req_payload.into_inner();
  let ctx_data = ContextData::new(PaymentIntentCtxData {
    app_state: app_state.get_ref().clone(),
    user_id: auth_user.user_id,
    amount: req.amount,
    receipt: req.receipt,
    amount_minor: 0,
    key_id: None,
    intent: None,
  });
  app_state.flows.run(ctx_data.clone()).await?;

  let (intent, key_id) = {
    let guard = ctx_data.read();
    (guard.intent.clone(), guard.key_id.clone())
  };
  let intent = intent.ok_or_else(|| AppError::Internal("Payment intent was not created".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "order": intent,
    "keyId": key_id,
  })))
}

fn default_verify_method() -> PaymentMethod {
  PaymentMethod::Online
}

/// Gateway callback plus the checkout the payment was made for.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
  #[serde(flatten)]
  pub proof: PaymentProof,
  pub items: Vec<CartLine>,
  #[serde(alias = "shippingAddress")]
  pub shipping: ShippingSnapshot,
  #[serde(default = "default_verify_method")]
  pub payment_method: PaymentMethod,
  #[serde(default)]
  pub is_partial_payment: bool,
  #[serde(default)]
  pub amount_paid: Option<Decimal>,
}

#[instrument(
  name = "handler::verify_payment",
  skip(app_state, req_payload, auth_user),
  fields(user_id = %auth_user.user_id, payment_id = %req_payload.proof.gateway_payment_id)
)]
pub async fn verify_payment_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<VerifyPaymentRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let req = req_payload.into_inner();
  let amount_paid = match (req.is_partial_payment, req.amount_paid) {
    (true, None) => {
      return Err(AppError::Validation(
        "amountPaid is required for partial payments".to_string(),
      ))
    }
    (true, paid) => paid,
    (false, _) => None,
  };
  let submission = CheckoutSubmission {
    cart: req.items,
    shipping: req.shipping,
    payment_method: req.payment_method,
    payment_proof: Some(req.proof),
    amount_paid,
  };

  let response = run_checkout(app_state.get_ref(), auth_user.user_id, submission).await?;
  if response.replayed {
    info!("Payment replay returned existing order {}.", response.order_id);
  } else {
    info!(
      "Verified payment produced order {} (supplier synced: {}).",
      response.order_id, response.supplier_synced
    );
  }
  Ok(HttpResponse::Ok().json(response))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RemainingIntentRequest {
  pub order_id: Uuid,
  pub amount: Decimal,
}

#[instrument(
  name = "handler::create_remaining_intent",
  skip(app_state, req_payload, auth_user),
  fields(user_id = %auth_user.user_id, order_id = %req_payload.order_id)
)]
pub async fn create_remaining_intent_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<RemainingIntentRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let req = req_payload.into_inner();
  let ctx_data = ContextData::new(RemainingIntentCtxData {
    app_state: app_state.get_ref().clone(),
    user_id: auth_user.user_id,
    order_id: req.order_id,
    amount: req.amount,
    order: None,
    amount_minor: 0,
    intent: None,
  });
  app_state.flows.run(ctx_data.clone()).await?;

  let intent = ctx_data
    .read()
    .intent
    .clone()
    .ok_or_else(|| AppError::Internal("Remaining-payment intent was not created".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "order": intent.intent,
    "orderId": intent.order_id,
    "amountMinor": intent.amount_minor,
    "keyId": intent.key_id,
  })))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RemainingVerifyRequest {
  pub order_id: Uuid,
  #[serde(flatten)]
  pub proof: PaymentProof,
}

#[instrument(
  name = "handler::verify_remaining_payment",
  skip(app_state, req_payload, auth_user),
  fields(user_id = %auth_user.user_id, order_id = %req_payload.order_id)
)]
pub async fn verify_remaining_payment_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<RemainingVerifyRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let req = req_payload.into_inner();
  let ctx_data = ContextData::new(RemainingVerifyCtxData {
    app_state: app_state.get_ref().clone(),
    user_id: auth_user.user_id,
    order_id: req.order_id,
    proof: req.proof,
    order: None,
    outcome: None,
  });
  app_state.flows.run(ctx_data.clone()).await?;

  let outcome = ctx_data
    .read()
    .outcome
    .clone()
    .ok_or_else(|| AppError::Internal("Remaining payment was not settled".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "alreadySettled": outcome.already_settled,
    "order": outcome.order,
  })))
}

#[instrument(name = "handler::get_gateway_settings", skip(app_state, _admin))]
pub async fn get_gateway_settings_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let view = app_state.gateway_settings.view().await?;
  Ok(HttpResponse::Ok().json(view))
}

#[instrument(name = "handler::update_gateway_settings", skip(app_state, req_payload, _admin))]
pub async fn update_gateway_settings_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<GatewaySettingsUpdate>,
  _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let view = app_state.gateway_settings.update(req_payload.into_inner()).await?;
  Ok(HttpResponse::Ok().json(view))
}

#[instrument(name = "handler::test_gateway_settings", skip(app_state, _admin))]
pub async fn test_gateway_settings_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  match app_state.gateway_settings.self_test(app_state.gateway.as_ref()).await {
    Ok(count) => Ok(HttpResponse::Ok().json(json!({
      "success": true,
      "message": "Gateway connection succeeded",
      "intentsListed": count,
    }))),
    Err(e) => {
      warn!("Gateway self-test failed: {}", e);
      Err(e)
    }
  }
}
