// src/services/tokens.rs

//! Owner of the supplier access credential.
//!
//! Tokens are renewed lazily: a caller that finds the slot missing or within
//! [`RENEWAL_MARGIN_MINUTES`] of expiry renews it. Renewals are single-flight; callers
//! queue on one async mutex and re-read the slot once they hold it, so a burst
//! of callers against an expired slot produces exactly one renewal.

use crate::db::CredentialRepository;
use crate::errors::{AppError, Result};
use crate::models::SupplierCredential;
use crate::services::supplier::SupplierApi;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Tokens this close to expiry are renewed before use.
pub const RENEWAL_MARGIN_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
  Missing,
  Valid,
  ExpiringSoon,
  Expired,
}

impl TokenState {
  pub fn of(credential: Option<&SupplierCredential>, now: DateTime<Utc>) -> Self {
    match credential {
      None => TokenState::Missing,
      Some(c) if c.access_token_expiry <= now => TokenState::Expired,
      Some(c) if c.access_token_expiry - now <= Duration::minutes(RENEWAL_MARGIN_MINUTES) => TokenState::ExpiringSoon,
      Some(_) => TokenState::Valid,
    }
  }

  pub fn is_usable(self) -> bool {
    self == TokenState::Valid
  }
}

/// Expiry information about the stored credential. Never carries the tokens.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatus {
  pub state: TokenState,
  pub open_id: String,
  pub access_token_expiry: DateTime<Utc>,
  pub access_token_expires_in_secs: i64,
  pub refresh_token_expiry: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

pub struct TokenManager {
  credentials: Arc<dyn CredentialRepository>,
  supplier: Arc<dyn SupplierApi>,
  api_key: String,
  renewal: Mutex<()>,
}

impl TokenManager {
  pub fn new(credentials: Arc<dyn CredentialRepository>, supplier: Arc<dyn SupplierApi>, api_key: String) -> Self {
    Self {
      credentials,
      supplier,
      api_key,
      renewal: Mutex::new(()),
    }
  }

  async fn usable_token(&self) -> Result<Option<String>> {
    let stored = self.credentials.load_supplier_credential().await?;
    let state = TokenState::of(stored.as_ref(), Utc::now());
    debug!(?state, "Supplier token slot checked.");
    Ok(stored.filter(|_| state.is_usable()).map(|c| c.access_token))
  }

  /// Returns a token that is not about to expire, renewing at most once.
  #[instrument(name = "TokenManager::get_valid_token", skip(self), err)]
  pub async fn get_valid_token(&self) -> Result<String> {
    if let Some(token) = self.usable_token().await? {
      return Ok(token);
    }

    let _renewal_guard = self.renewal.lock().await;
    // Another caller may have renewed while this one waited.
    if let Some(token) = self.usable_token().await? {
      debug!("Token renewed by a concurrent caller.");
      return Ok(token);
    }
    self.renew().await
  }

  async fn renew(&self) -> Result<String> {
    if self.api_key.is_empty() {
      return Err(AppError::CredentialUnavailable("supplier API key is not configured".to_string()));
    }
    info!("Renewing supplier access token.");
    let issued = self.supplier.get_access_token(&self.api_key).await.map_err(|e| {
      warn!(error = %e, "Supplier token renewal failed.");
      AppError::CredentialUnavailable(e.to_string())
    })?;
    self
      .credentials
      .upsert_supplier_credential(&issued)
      .await
      .map_err(|e| AppError::CredentialUnavailable(format!("renewed token could not be stored: {}", e)))?;
    info!(expires_at = %issued.access_token_expiry, "Supplier access token renewed.");
    Ok(issued.access_token)
  }

  pub async fn status(&self) -> Result<TokenStatus> {
    let stored = self
      .credentials
      .load_supplier_credential()
      .await?
      .ok_or_else(|| AppError::NotFound("No supplier credential stored".to_string()))?;
    let now = Utc::now();
    Ok(TokenStatus {
      state: TokenState::of(Some(&stored), now),
      access_token_expires_in_secs: (stored.access_token_expiry - now).num_seconds(),
      open_id: stored.open_id,
      access_token_expiry: stored.access_token_expiry,
      refresh_token_expiry: stored.refresh_token_expiry,
      updated_at: stored.updated_at,
    })
  }
}
