// src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::time::Duration;

const DEFAULT_SUPPLIER_API_BASE_URL: &str = "https://developers.cjdropshipping.com/api2.0/v1";
const DEFAULT_GATEWAY_API_BASE_URL: &str = "https://api.razorpay.com";

#[derive(Clone)]
pub struct SupplierConfig {
  pub api_base_url: String,
  pub api_key: String,
  /// Platform identifier sent with every supplier order.
  pub platform: String,
  pub from_country_code: String,
  pub logistic_name: String,
}

/// Static gateway credentials. A stored settings row overrides them.
#[derive(Clone)]
pub struct GatewayConfig {
  pub api_base_url: String,
  pub key_id: String,
  pub key_secret: String,
}

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// `None` runs the server on the in-memory store.
  pub database_url: Option<String>,
  pub supplier: SupplierConfig,
  pub gateway: GatewayConfig,
  pub store_currency: String,
  /// Upper bound for every outbound gateway and supplier call.
  pub outbound_timeout: Duration,
  /// Admin routes reject every request while this is unset.
  pub admin_api_key: Option<String>,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };
    let optional_env = |var_name: &str| env::var(var_name).ok().filter(|v| !v.trim().is_empty());

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = optional_env("DATABASE_URL");

    let supplier = SupplierConfig {
      api_base_url: get_env("SUPPLIER_API_BASE_URL").unwrap_or_else(|_| DEFAULT_SUPPLIER_API_BASE_URL.to_string()),
      api_key: optional_env("SUPPLIER_API_KEY").unwrap_or_default(),
      platform: get_env("SUPPLIER_PLATFORM").unwrap_or_else(|_| "api".to_string()),
      from_country_code: get_env("SUPPLIER_FROM_COUNTRY").unwrap_or_else(|_| "CN".to_string()),
      logistic_name: get_env("SUPPLIER_LOGISTIC_NAME").unwrap_or_else(|_| "CJPacket Ordinary".to_string()),
    };

    let gateway = GatewayConfig {
      api_base_url: get_env("GATEWAY_API_BASE_URL").unwrap_or_else(|_| DEFAULT_GATEWAY_API_BASE_URL.to_string()),
      key_id: optional_env("GATEWAY_KEY_ID").unwrap_or_default(),
      key_secret: optional_env("GATEWAY_KEY_SECRET").unwrap_or_default(),
    };

    let store_currency = get_env("STORE_CURRENCY").unwrap_or_else(|_| "INR".to_string());
    let timeout_secs = get_env("OUTBOUND_TIMEOUT_SECS")
      .unwrap_or_else(|_| "15".to_string())
      .parse::<u64>()
      .map_err(|e| AppError::Config(format!("Invalid OUTBOUND_TIMEOUT_SECS: {}", e)))?;
    if timeout_secs == 0 {
      return Err(AppError::Config("OUTBOUND_TIMEOUT_SECS must be at least 1".to_string()));
    }

    let admin_api_key = optional_env("ADMIN_API_KEY");

    if supplier.api_key.is_empty() {
      tracing::warn!("SUPPLIER_API_KEY is not set; supplier token renewal will fail.");
    }
    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      supplier,
      gateway,
      store_currency,
      outbound_timeout: Duration::from_secs(timeout_secs),
      admin_api_key,
    })
  }
}

// Secrets stay out of logs.
impl fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
      .field("supplier_api_base_url", &self.supplier.api_base_url)
      .field("supplier_platform", &self.supplier.platform)
      .field("gateway_api_base_url", &self.gateway.api_base_url)
      .field("gateway_key_id", &self.gateway.key_id)
      .field("store_currency", &self.store_currency)
      .field("outbound_timeout", &self.outbound_timeout)
      .field("admin_api_key", &self.admin_api_key.as_ref().map(|_| "[REDACTED]"))
      .finish()
  }
}
