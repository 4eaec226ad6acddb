// src/services/gateway.rs

//! Payment gateway client (Razorpay orders API).

use crate::errors::{AppError, Result};
use crate::models::GatewayKeys;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// A gateway order the client confirms with the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
  pub id: String,
  /// Minor units.
  pub amount: i64,
  pub currency: String,
  #[serde(default)]
  pub receipt: Option<String>,
  #[serde(default)]
  pub status: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn create_intent(&self, keys: &GatewayKeys, amount_minor: i64, currency: &str, receipt: &str)
    -> Result<PaymentIntent>;

  /// Lists the most recent intents. Only used as a connectivity self-test.
  async fn list_intents(&self, keys: &GatewayKeys, count: u32) -> Result<usize>;
}

#[derive(Deserialize)]
struct IntentCollection {
  #[serde(default)]
  count: usize,
}

pub struct RazorpayGateway {
  http: reqwest::Client,
  base_url: String,
}

impl RazorpayGateway {
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| AppError::Config(format!("Cannot build gateway HTTP client: {}", e)))?;
    Ok(Self {
      http,
      base_url: base_url.into().trim_end_matches('/').to_string(),
    })
  }

  async fn read_json<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      warn!(%status, "Gateway rejected the request.");
      return Err(AppError::Gateway(format!("gateway responded {}: {}", status, body)));
    }
    response
      .json::<T>()
      .await
      .map_err(|e| AppError::Gateway(format!("unreadable gateway response: {}", e)))
  }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
  #[instrument(name = "gateway::create_intent", skip(self, keys), fields(key_id = %keys.key_id), err)]
  async fn create_intent(
    &self,
    keys: &GatewayKeys,
    amount_minor: i64,
    currency: &str,
    receipt: &str,
  ) -> Result<PaymentIntent> {
    let response = self
      .http
      .post(format!("{}/v1/orders", self.base_url))
      .basic_auth(&keys.key_id, Some(&keys.key_secret))
      .json(&json!({ "amount": amount_minor, "currency": currency, "receipt": receipt }))
      .send()
      .await
      .map_err(|e| AppError::Gateway(format!("create order request failed: {}", e)))?;
    let intent: PaymentIntent = Self::read_json(response).await?;
    info!(intent_id = %intent.id, "Gateway intent created.");
    Ok(intent)
  }

  #[instrument(name = "gateway::list_intents", skip(self, keys), fields(key_id = %keys.key_id), err)]
  async fn list_intents(&self, keys: &GatewayKeys, count: u32) -> Result<usize> {
    let response = self
      .http
      .get(format!("{}/v1/orders", self.base_url))
      .query(&[("count", count)])
      .basic_auth(&keys.key_id, Some(&keys.key_secret))
      .send()
      .await
      .map_err(|e| AppError::Gateway(format!("list orders request failed: {}", e)))?;
    let collection: IntentCollection = Self::read_json(response).await?;
    Ok(collection.count)
  }
}
