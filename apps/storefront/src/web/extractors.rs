// src/web/extractors.rs

//! Request identity extractors.
//!
//! Session issuance lives outside this service; the `X-User-ID` header
//! carries the already-authenticated caller. Admin routes additionally
//! require `X-Admin-Key` to match `ADMIN_API_KEY`.

use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let user_id = req
      .headers()
      .get(USER_ID_HEADER)
      .and_then(|value| value.to_str().ok())
      .and_then(|raw| Uuid::parse_str(raw.trim()).ok());

    match user_id {
      Some(user_id) => ready(Ok(AuthenticatedUser { user_id })),
      None => {
        warn!("AuthenticatedUser extractor: missing or invalid {} header.", USER_ID_HEADER);
        ready(Err(AppError::Auth(format!(
          "Missing or invalid {} header",
          USER_ID_HEADER
        ))))
      }
    }
  }
}

/// Marker for requests that presented the admin key.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser;

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let expected = match req.app_data::<web::Data<AppState>>() {
      Some(state) => state.config.admin_api_key.clone(),
      None => return ready(Err(AppError::Internal("Application state is not configured".to_string()))),
    };
    let Some(expected) = expected else {
      warn!("AdminUser extractor: ADMIN_API_KEY is unset; rejecting admin request.");
      return ready(Err(AppError::Auth("Admin access is disabled".to_string())));
    };

    let presented = req
      .headers()
      .get(ADMIN_KEY_HEADER)
      .and_then(|value| value.to_str().ok())
      .unwrap_or_default();

    if constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
      ready(Ok(AdminUser))
    } else {
      warn!("AdminUser extractor: admin key rejected.");
      ready(Err(AppError::Auth("Invalid admin key".to_string())))
    }
  }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
  if a.len() != b.len() {
    return false;
  }
  a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
