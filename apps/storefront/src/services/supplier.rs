// src/services/supplier.rs

//! Dropship supplier client (CJ developer API v2).
//!
//! Every CJ response is wrapped in `{ code, result, message, data }`; a request
//! succeeded only when `result` is true.

use crate::errors::{AppError, Result};
use crate::models::SupplierCredential;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, instrument, warn};

const ACCESS_TOKEN_HEADER: &str = "CJ-Access-Token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierOrderLine {
  pub vid: String,
  pub quantity: u32,
  pub store_line_item_id: String,
}

/// Body of the supplier's order-creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierOrderRequest {
  pub order_number: String,
  pub shipping_country_code: String,
  pub shipping_country: String,
  pub shipping_province: String,
  pub shipping_city: String,
  pub shipping_address: String,
  pub shipping_customer_name: String,
  pub shipping_zip: String,
  pub shipping_phone: String,
  pub from_country_code: String,
  pub logistic_name: String,
  pub platform: String,
  pub products: Vec<SupplierOrderLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SupplierOrderOutcome {
  Accepted { supplier_order_id: String, raw: Value },
  Rejected { message: String, raw: Value },
}

#[async_trait]
pub trait SupplierApi: Send + Sync {
  /// Exchanges the API key for a fresh token set.
  async fn get_access_token(&self, api_key: &str) -> Result<SupplierCredential>;

  async fn lookup_variant(&self, access_token: &str, product_id: &str) -> Result<String>;

  async fn create_order(&self, access_token: &str, request: &SupplierOrderRequest) -> Result<SupplierOrderOutcome>;
}

#[derive(Debug, Deserialize)]
struct Envelope {
  #[serde(default)]
  result: bool,
  #[serde(default)]
  message: Option<String>,
  #[serde(default)]
  data: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenData {
  #[serde(default)]
  open_id: Value,
  access_token: String,
  access_token_expiry_date: String,
  refresh_token: String,
  refresh_token_expiry_date: String,
}

fn parse_expiry(raw: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(raw)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| AppError::Supplier(format!("unreadable token expiry '{}': {}", raw, e)))
}

impl TryFrom<TokenData> for SupplierCredential {
  type Error = AppError;

  fn try_from(data: TokenData) -> Result<Self> {
    let open_id = match data.open_id {
      Value::String(s) => s,
      Value::Null => String::new(),
      other => other.to_string(),
    };
    Ok(SupplierCredential {
      open_id,
      access_token_expiry: parse_expiry(&data.access_token_expiry_date)?,
      refresh_token_expiry: parse_expiry(&data.refresh_token_expiry_date)?,
      access_token: data.access_token,
      refresh_token: data.refresh_token,
      updated_at: Utc::now(),
    })
  }
}

pub struct CjSupplierClient {
  http: reqwest::Client,
  base_url: String,
}

impl CjSupplierClient {
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| AppError::Config(format!("Cannot build supplier HTTP client: {}", e)))?;
    Ok(Self {
      http,
      base_url: base_url.into().trim_end_matches('/').to_string(),
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  /// Reads the envelope, keeping the raw body for diagnostics.
  async fn read_envelope(response: reqwest::Response) -> Result<(Envelope, Value)> {
    let status = response.status();
    let raw: Value = response
      .json()
      .await
      .map_err(|e| AppError::Supplier(format!("unreadable supplier response ({}): {}", status, e)))?;
    let envelope: Envelope = serde_json::from_value(raw.clone())
      .map_err(|e| AppError::Supplier(format!("unexpected supplier response shape: {}", e)))?;
    Ok((envelope, raw))
  }
}

#[async_trait]
impl SupplierApi for CjSupplierClient {
  #[instrument(name = "supplier::get_access_token", skip_all, err)]
  async fn get_access_token(&self, api_key: &str) -> Result<SupplierCredential> {
    let response = self
      .http
      .post(self.url("/authentication/getAccessToken"))
      .json(&json!({ "apiKey": api_key }))
      .send()
      .await
      .map_err(|e| AppError::Supplier(format!("token request failed: {}", e)))?;
    let (envelope, _) = Self::read_envelope(response).await?;
    if !envelope.result {
      return Err(AppError::Supplier(format!(
        "token request refused: {}",
        envelope.message.unwrap_or_default()
      )));
    }
    let data: TokenData = serde_json::from_value(envelope.data)
      .map_err(|e| AppError::Supplier(format!("token payload incomplete: {}", e)))?;
    let credential = SupplierCredential::try_from(data)?;
    info!(expires_at = %credential.access_token_expiry, "Supplier access token issued.");
    Ok(credential)
  }

  #[instrument(name = "supplier::lookup_variant", skip(self, access_token), err)]
  async fn lookup_variant(&self, access_token: &str, product_id: &str) -> Result<String> {
    let response = self
      .http
      .get(self.url("/product/variant/query"))
      .query(&[("pid", product_id)])
      .header(ACCESS_TOKEN_HEADER, access_token)
      .send()
      .await
      .map_err(|e| AppError::Supplier(format!("variant lookup failed: {}", e)))?;
    let (envelope, _) = Self::read_envelope(response).await?;
    if !envelope.result {
      return Err(AppError::Supplier(format!(
        "variant lookup refused: {}",
        envelope.message.unwrap_or_default()
      )));
    }
    envelope
      .data
      .as_array()
      .and_then(|variants| variants.first())
      .and_then(|variant| variant.get("vid"))
      .and_then(Value::as_str)
      .map(str::to_string)
      .ok_or_else(|| AppError::Supplier(format!("no variants listed for product {}", product_id)))
  }

  #[instrument(
    name = "supplier::create_order",
    skip(self, access_token, request),
    fields(order_number = %request.order_number, lines = request.products.len()),
    err
  )]
  async fn create_order(&self, access_token: &str, request: &SupplierOrderRequest) -> Result<SupplierOrderOutcome> {
    let response = self
      .http
      .post(self.url("/shopping/order/createOrderV2"))
      .header(ACCESS_TOKEN_HEADER, access_token)
      .json(request)
      .send()
      .await
      .map_err(|e| AppError::Supplier(format!("order request failed: {}", e)))?;
    let (envelope, raw) = Self::read_envelope(response).await?;

    let supplier_order_id = envelope
      .data
      .get("orderId")
      .and_then(|id| match id {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
      });

    match (envelope.result, supplier_order_id) {
      (true, Some(supplier_order_id)) => Ok(SupplierOrderOutcome::Accepted { supplier_order_id, raw }),
      _ => {
        let message = envelope.message.unwrap_or_else(|| "supplier declined the order".to_string());
        warn!(%message, "Supplier declined order.");
        Ok(SupplierOrderOutcome::Rejected { message, raw })
      }
    }
  }
}
