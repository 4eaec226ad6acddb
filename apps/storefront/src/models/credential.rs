// src/models/credential.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The single stored supplier token set. Renewal replaces the whole row.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct SupplierCredential {
  pub open_id: String,
  pub access_token: String,
  pub access_token_expiry: DateTime<Utc>,
  pub refresh_token: String,
  pub refresh_token_expiry: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Gateway settings row. The secret is never returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct GatewayCredential {
  pub key_id: String,
  pub key_secret: String,
  pub is_enabled: bool,
  pub updated_at: DateTime<Utc>,
}

/// Key pair used to authenticate against the gateway.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayKeys {
  pub key_id: String,
  pub key_secret: String,
}

impl std::fmt::Debug for GatewayKeys {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("GatewayKeys")
      .field("key_id", &self.key_id)
      .field("key_secret", &"[REDACTED]")
      .finish()
  }
}
