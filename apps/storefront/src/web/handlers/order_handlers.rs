// src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{CartLine, Order, OrderStatus, PaymentMethod, ShippingSnapshot};
use crate::pipelines::checkout_pipeline::SYNC_SUPPLIER;
use crate::pipelines::contexts::{CheckoutCtxData, CheckoutSubmission};
use crate::state::AppState;
use crate::web::extractors::{AdminUser, AuthenticatedUser};
use storefront_flow::{ContextData, PipelineResult};

fn default_place_method() -> PaymentMethod {
  PaymentMethod::Cod
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
  pub items: Vec<CartLine>,
  #[serde(alias = "shippingAddress")]
  pub shipping: ShippingSnapshot,
  #[serde(default = "default_place_method")]
  pub payment_method: PaymentMethod,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
  pub success: bool,
  pub order_id: Uuid,
  pub order: Order,
  /// The payment had already produced this order; nothing new was written.
  pub replayed: bool,
  pub supplier_synced: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub supplier_error: Option<String>,
}

/// Runs the checkout pipeline and shapes its outcome. Shared by order
/// placement and payment verification.
pub(crate) async fn run_checkout(
  app_state: &AppState,
  user_id: Uuid,
  submission: CheckoutSubmission,
) -> Result<CheckoutResponse, AppError> {
  let ctx_data = ContextData::new(CheckoutCtxData::new(app_state.clone(), user_id, submission));
  let report = app_state.flows.run_with_report(ctx_data.clone()).await?;

  let final_ctx = ctx_data.snapshot();
  let order = final_ctx.order.ok_or_else(|| {
    warn!("Checkout pipeline for user {} finished without an order.", user_id);
    AppError::Internal("Checkout finished without an order".to_string())
  })?;

  let supplier_error = report.failure_for(SYNC_SUPPLIER).map(|f| f.message.clone());
  if let Some(message) = &supplier_error {
    warn!(
      "Order {} stored but not forwarded to the supplier: {}",
      order.id, message
    );
  }
  if report.result == PipelineResult::Stopped && !final_ctx.replayed {
    return Err(AppError::Internal("Checkout was halted unexpectedly".to_string()));
  }

  Ok(CheckoutResponse {
    success: true,
    order_id: order.id,
    supplier_synced: order.supplier_order_id.is_some(),
    order,
    replayed: final_ctx.replayed,
    supplier_error,
  })
}

#[instrument(
  name = "handler::place_order",
  skip(app_state, req_payload, auth_user),
  fields(user_id = %auth_user.user_id, lines = req_payload.items.len())
)]
pub async fn place_order_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<PlaceOrderRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let req = req_payload.into_inner();
  let submission = CheckoutSubmission {
    cart: req.items,
    shipping: req.shipping,
    payment_method: req.payment_method,
    payment_proof: None,
    amount_paid: None,
  };

  let response = run_checkout(app_state.get_ref(), auth_user.user_id, submission).await?;
  info!(
    "Order {} placed by user {} (supplier synced: {}).",
    response.order_id, auth_user.user_id, response.supplier_synced
  );
  Ok(HttpResponse::Created().json(response))
}

#[instrument(name = "handler::list_orders", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.ledger.list_for_user(auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::get_order", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .ledger
    .get_for_user(path.into_inner(), auth_user.user_id)
    .await?;
  Ok(HttpResponse::Ok().json(order))
}

#[derive(Deserialize, Debug)]
pub struct StatusUpdateRequest {
  pub status: OrderStatus,
}

#[instrument(name = "handler::update_order_status", skip(app_state, req_payload, _admin))]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<StatusUpdateRequest>,
  _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .ledger
    .advance_status(path.into_inner(), req_payload.status)
    .await?;
  Ok(HttpResponse::Ok().json(order))
}

/// Re-forwards an order whose supplier linkage is still unset. Only orders
/// that have not shipped or been cancelled are forwarded.
#[instrument(name = "handler::resync_supplier_order", skip(app_state, _admin))]
pub async fn resync_supplier_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let order = app_state.ledger.get(order_id).await?;
  if order.supplier_order_id.is_some() {
    return Ok(HttpResponse::Ok().json(serde_json::json!({
      "success": true,
      "alreadySynced": true,
      "order": order,
    })));
  }
  if !matches!(order.status, OrderStatus::Placed | OrderStatus::Confirmed) {
    warn!("Refusing to forward order {} in status {}.", order_id, order.status);
    return Err(AppError::Validation(format!(
      "Order {} is {} and cannot be forwarded to the supplier",
      order_id, order.status
    )));
  }

  let supplier_order_id = app_state.supplier_sync.synchronize(&order).await?;
  let order = app_state.ledger.get(order_id).await?;
  info!("Order {} reconciled with supplier order {}.", order_id, supplier_order_id);
  Ok(HttpResponse::Ok().json(serde_json::json!({
    "success": true,
    "alreadySynced": false,
    "order": order,
  })))
}
