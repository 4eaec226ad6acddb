// src/services/gateway_settings.rs

//! Gateway key resolution. A stored settings row overrides the static
//! configuration; the secret is write-only for callers.

use crate::config::GatewayConfig;
use crate::db::CredentialRepository;
use crate::errors::{AppError, Result};
use crate::models::{GatewayCredential, GatewayKeys};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// Shown instead of the secret. Writing it back keeps the stored secret.
pub const SECRET_MASK: &str = "********";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsSource {
  Database,
  Environment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySettingsView {
  pub key_id: String,
  pub key_secret: String,
  pub is_enabled: bool,
  pub source: SettingsSource,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySettingsUpdate {
  pub key_id: String,
  #[serde(default)]
  pub key_secret: String,
  #[serde(default = "enabled_by_default")]
  pub is_enabled: bool,
}

fn enabled_by_default() -> bool {
  true
}

struct ResolvedGateway {
  keys: GatewayKeys,
  is_enabled: bool,
  source: SettingsSource,
}

pub struct GatewaySettings {
  credentials: Arc<dyn CredentialRepository>,
  fallback: GatewayKeys,
}

impl GatewaySettings {
  pub fn new(credentials: Arc<dyn CredentialRepository>, config: &GatewayConfig) -> Self {
    Self {
      credentials,
      fallback: GatewayKeys {
        key_id: config.key_id.clone(),
        key_secret: config.key_secret.clone(),
      },
    }
  }

  async fn resolve(&self) -> Result<ResolvedGateway> {
    Ok(match self.credentials.load_gateway_credential().await? {
      Some(row) => ResolvedGateway {
        keys: GatewayKeys {
          key_id: row.key_id,
          key_secret: row.key_secret,
        },
        is_enabled: row.is_enabled,
        source: SettingsSource::Database,
      },
      None => ResolvedGateway {
        keys: self.fallback.clone(),
        is_enabled: true,
        source: SettingsSource::Environment,
      },
    })
  }

  /// Keys for creating intents. Fails while the gateway is disabled.
  pub async fn active_keys(&self) -> Result<GatewayKeys> {
    let resolved = self.resolve().await?;
    if !resolved.is_enabled {
      return Err(AppError::Gateway("Payment gateway is disabled".to_string()));
    }
    if resolved.keys.key_id.is_empty() || resolved.keys.key_secret.is_empty() {
      return Err(AppError::Config("Gateway keys are not configured".to_string()));
    }
    Ok(resolved.keys)
  }

  /// Secret used to check payment signatures, whether or not the gateway is enabled.
  pub async fn signing_secret(&self) -> Result<String> {
    Ok(self.resolve().await?.keys.key_secret)
  }

  pub async fn view(&self) -> Result<GatewaySettingsView> {
    let resolved = self.resolve().await?;
    Ok(GatewaySettingsView {
      key_secret: if resolved.keys.key_secret.is_empty() {
        String::new()
      } else {
        SECRET_MASK.to_string()
      },
      key_id: resolved.keys.key_id,
      is_enabled: resolved.is_enabled,
      source: resolved.source,
    })
  }

  #[instrument(name = "GatewaySettings::update", skip_all, fields(key_id = %update.key_id, is_enabled = update.is_enabled), err)]
  pub async fn update(&self, update: GatewaySettingsUpdate) -> Result<GatewaySettingsView> {
    let key_id = update.key_id.trim().to_string();
    if key_id.is_empty() {
      return Err(AppError::Validation("keyId is required".to_string()));
    }
    let key_secret = match update.key_secret.trim() {
      "" | SECRET_MASK => self.resolve().await?.keys.key_secret,
      new_secret => new_secret.to_string(),
    };
    if key_secret.is_empty() {
      return Err(AppError::Validation("keySecret is required".to_string()));
    }

    self
      .credentials
      .upsert_gateway_credential(&GatewayCredential {
        key_id,
        key_secret,
        is_enabled: update.is_enabled,
        updated_at: Utc::now(),
      })
      .await?;
    info!("Gateway settings updated.");
    self.view().await
  }

  /// Connectivity self-test with the active keys.
  pub async fn self_test(&self, gateway: &dyn crate::services::gateway::PaymentGateway) -> Result<usize> {
    let keys = self.active_keys().await?;
    gateway.list_intents(&keys, 1).await
  }
}
