// src/services/supplier_sync.rs

//! Forwards a stored order to the dropship supplier and records the outcome
//! on the order. Failures leave the order `placed` with no supplier id.

use crate::config::SupplierConfig;
use crate::db::SupplierLinkage;
use crate::errors::{AppError, Result};
use crate::models::Order;
use crate::services::ledger::OrderLedger;
use crate::services::supplier::{SupplierApi, SupplierOrderLine, SupplierOrderOutcome, SupplierOrderRequest};
use crate::services::tokens::TokenManager;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Fixed origin and logistics values sent with every supplier order.
#[derive(Debug, Clone)]
pub struct FulfillmentProfile {
  pub from_country_code: String,
  pub logistic_name: String,
  pub platform: String,
}

impl From<&SupplierConfig> for FulfillmentProfile {
  fn from(config: &SupplierConfig) -> Self {
    Self {
      from_country_code: config.from_country_code.clone(),
      logistic_name: config.logistic_name.clone(),
      platform: config.platform.clone(),
    }
  }
}

pub struct SupplierSynchronizer {
  tokens: Arc<TokenManager>,
  supplier: Arc<dyn SupplierApi>,
  ledger: Arc<OrderLedger>,
  profile: FulfillmentProfile,
  timeout: Duration,
}

/// Two-letter country names pass as ISO codes.
fn country_code(country: &str) -> String {
  let trimmed = country.trim();
  if trimmed.len() == 2 {
    trimmed.to_ascii_uppercase()
  } else {
    trimmed.to_string()
  }
}

impl SupplierSynchronizer {
  pub fn new(
    tokens: Arc<TokenManager>,
    supplier: Arc<dyn SupplierApi>,
    ledger: Arc<OrderLedger>,
    profile: FulfillmentProfile,
    timeout: Duration,
  ) -> Self {
    Self {
      tokens,
      supplier,
      ledger,
      profile,
      timeout,
    }
  }

  /// Resolves each line's variant id. A failed lookup falls back to the
  /// product id instead of failing the order.
  async fn resolve_lines(&self, access_token: &str, order: &Order) -> Vec<SupplierOrderLine> {
    let mut lines = Vec::with_capacity(order.items.len());
    for (idx, item) in order.items.iter().enumerate() {
      let vid = match item.sku.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(sku) => sku.to_string(),
        None => match self.supplier.lookup_variant(access_token, &item.product_id).await {
          Ok(vid) => vid,
          Err(e) => {
            warn!(product_id = %item.product_id, error = %e, "Variant lookup failed; using product id.");
            item.product_id.clone()
          }
        },
      };
      lines.push(SupplierOrderLine {
        vid,
        quantity: item.quantity,
        store_line_item_id: format!("{}-{}", order.id, idx),
      });
    }
    lines
  }

  pub fn build_request(&self, order: &Order, products: Vec<SupplierOrderLine>) -> SupplierOrderRequest {
    let shipping = &order.shipping;
    SupplierOrderRequest {
      order_number: order.id.to_string(),
      shipping_country_code: country_code(&shipping.country),
      shipping_country: shipping.country.clone(),
      shipping_province: shipping.state.clone(),
      shipping_city: shipping.city.clone(),
      shipping_address: shipping.street.trim().to_string(),
      shipping_customer_name: shipping.full_name.clone(),
      shipping_zip: shipping.zip_code.clone(),
      shipping_phone: shipping.phone.clone(),
      from_country_code: self.profile.from_country_code.clone(),
      logistic_name: self.profile.logistic_name.clone(),
      platform: self.profile.platform.clone(),
      products,
    }
  }

  async fn submit(&self, access_token: &str, order: &Order) -> Result<SupplierOrderOutcome> {
    let products = self.resolve_lines(access_token, order).await;
    let request = self.build_request(order, products);
    self.supplier.create_order(access_token, &request).await
  }

  /// Submits `order` once. Returns the supplier order id; every failure is
  /// written onto the order before it is returned.
  #[instrument(name = "SupplierSynchronizer::synchronize", skip_all, fields(order_id = %order.id), err)]
  pub async fn synchronize(&self, order: &Order) -> Result<String> {
    let access_token = match self.tokens.get_valid_token().await {
      Ok(token) => token,
      Err(e) => {
        self.record_failure(order, json!({ "error": e.to_string() })).await;
        return Err(e);
      }
    };

    let outcome = tokio::time::timeout(self.timeout, self.submit(&access_token, order)).await;
    match outcome {
      Ok(Ok(SupplierOrderOutcome::Accepted { supplier_order_id, raw })) => {
        self
          .ledger
          .record_supplier_linkage(
            order.id,
            SupplierLinkage {
              supplier_order_id: Some(supplier_order_id.clone()),
              response: Some(raw),
            },
          )
          .await?;
        info!(%supplier_order_id, "Order forwarded to supplier.");
        Ok(supplier_order_id)
      }
      Ok(Ok(SupplierOrderOutcome::Rejected { message, raw })) => {
        self.record_failure(order, raw).await;
        Err(AppError::SupplierSyncFailed(message))
      }
      Ok(Err(e)) => {
        self.record_failure(order, json!({ "error": e.to_string() })).await;
        Err(AppError::SupplierSyncFailed(e.to_string()))
      }
      Err(_) => {
        let message = format!("supplier did not answer within {:?}", self.timeout);
        self.record_failure(order, json!({ "error": message })).await;
        Err(AppError::SupplierSyncFailed(message))
      }
    }
  }

  async fn record_failure(&self, order: &Order, response: serde_json::Value) {
    let linkage = SupplierLinkage {
      supplier_order_id: None,
      response: Some(response),
    };
    if let Err(e) = self.ledger.record_supplier_linkage(order.id, linkage).await {
      warn!(order_id = %order.id, error = %e, "Could not record supplier failure on order.");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn two_letter_countries_become_codes() {
    assert_eq!(country_code(" in "), "IN");
    assert_eq!(country_code("India"), "India");
  }
}
