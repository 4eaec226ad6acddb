// src/web/handlers/supplier_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::instrument;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AdminUser;

/// Expiry information of the stored supplier credential. Tokens are never returned.
#[instrument(name = "handler::supplier_status", skip(app_state, _admin))]
pub async fn supplier_status_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let status = app_state.tokens.status().await?;
  Ok(HttpResponse::Ok().json(status))
}
