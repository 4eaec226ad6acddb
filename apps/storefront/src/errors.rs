// src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use storefront_flow::FlowError;
use thiserror::Error;

/// Reasons a remaining-balance request is refused, checked in this order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionFailure {
  #[error("Order was not placed with a partial payment")]
  NotPartialPayment,

  #[error("Remaining balance is already settled")]
  AlreadySettled,

  #[error("Amount {received_minor} does not match the remaining balance {expected_minor} (minor units)")]
  AmountMismatch { expected_minor: i64, received_minor: i64 },

  #[error("Payment was not made against this order's remaining-balance intent")]
  IntentMismatch,
}

impl PreconditionFailure {
  pub fn code(&self) -> &'static str {
    match self {
      PreconditionFailure::NotPartialPayment => "NOT_PARTIAL_PAYMENT",
      PreconditionFailure::AlreadySettled => "ALREADY_SETTLED",
      PreconditionFailure::AmountMismatch { .. } => "AMOUNT_MISMATCH",
      PreconditionFailure::IntentMismatch => "INTENT_MISMATCH",
    }
  }
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Invalid price: {0}")]
  InvalidPrice(String),

  #[error("Payment signature mismatch")]
  SignatureMismatch,

  #[error("Supplier credential unavailable: {0}")]
  CredentialUnavailable(String),

  #[error("Supplier synchronization failed: {0}")]
  SupplierSyncFailed(String),

  #[error("Precondition failed: {0}")]
  Precondition(PreconditionFailure),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Payment {0} is already attached to another order")]
  DuplicatePayment(String),

  #[error("Payment Gateway Error: {0}")]
  Gateway(String),

  #[error("Supplier API Error: {0}")]
  Supplier(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  /// Stable machine-readable code sent next to the message.
  pub fn code(&self) -> &'static str {
    match self {
      AppError::Validation(_) => "INVALID_INPUT",
      AppError::InvalidPrice(_) => "INVALID_PRICE",
      AppError::SignatureMismatch => "SIGNATURE_MISMATCH",
      AppError::CredentialUnavailable(_) => "CREDENTIAL_UNAVAILABLE",
      AppError::SupplierSyncFailed(_) => "SUPPLIER_SYNC_FAILED",
      AppError::Precondition(reason) => reason.code(),
      AppError::NotFound(_) => "NOT_FOUND",
      AppError::Auth(_) => "UNAUTHORIZED",
      AppError::DuplicatePayment(_) => "DUPLICATE_PAYMENT",
      AppError::Gateway(_) => "GATEWAY_ERROR",
      AppError::Supplier(_) => "SUPPLIER_ERROR",
      AppError::Config(_) => "CONFIGURATION_ERROR",
      AppError::Sqlx(_) => "DATABASE_ERROR",
      AppError::Workflow { .. } => "WORKFLOW_ERROR",
      AppError::Internal(_) => "INTERNAL_ERROR",
    }
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<AppError>() {
      Ok(app_err) => app_err,
      Err(err) => match err.downcast::<sqlx::Error>() {
        Ok(db_err) => AppError::Sqlx(db_err),
        Err(other) => AppError::Internal(other.to_string()),
      },
    }
  }
}

impl From<PreconditionFailure> for AppError {
  fn from(reason: PreconditionFailure) -> Self {
    AppError::Precondition(reason)
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) | AppError::InvalidPrice(_) | AppError::SignatureMismatch | AppError::Precondition(_) => {
        StatusCode::BAD_REQUEST
      }
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::DuplicatePayment(_) => StatusCode::CONFLICT,
      AppError::CredentialUnavailable(_)
      | AppError::SupplierSyncFailed(_)
      | AppError::Gateway(_)
      | AppError::Supplier(_) => StatusCode::BAD_GATEWAY,
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    let message = match self {
      AppError::Sqlx(_) => "Database operation failed".to_string(),
      AppError::Workflow { source } => {
        tracing::error!(flow_error_source = ?source, "Workflow error details");
        "Workflow processing error".to_string()
      }
      other => other.to_string(),
    };
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, "Responding with error");
    }
    HttpResponse::build(status).json(json!({ "error": message, "code": self.code() }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
