// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storefront::config::{AppConfig, GatewayConfig, SupplierConfig};
use storefront::db::MemoryStore;
use storefront::errors::{AppError, Result};
use storefront::models::{
  CartLine, GatewayKeys, PaymentMethod, PaymentProof, PriceInput, ShippingSnapshot, SupplierCredential,
};
use storefront::pipelines::contexts::CheckoutSubmission;
use storefront::services::gateway::{PaymentGateway, PaymentIntent};
use storefront::services::signature;
use storefront::services::supplier::{SupplierApi, SupplierOrderOutcome, SupplierOrderRequest};
use storefront::state::AppState;
use tracing::Level;

pub const GATEWAY_SECRET: &str = "test_secret";
pub const ADMIN_KEY: &str = "admin-secret";
pub const SUPPLIER_ORDER_ID: &str = "CJ-1001";

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// How the fake supplier answers order submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplierBehavior {
  Accept,
  Reject,
  TransportError,
  Hang,
}

pub struct FakeSupplier {
  pub behavior: Mutex<SupplierBehavior>,
  pub token_fails: Mutex<bool>,
  pub token_delay: Duration,
  pub token_calls: AtomicUsize,
  pub order_calls: AtomicUsize,
  pub submitted: Mutex<Vec<SupplierOrderRequest>>,
}

impl FakeSupplier {
  pub fn new(behavior: SupplierBehavior) -> Self {
    Self {
      behavior: Mutex::new(behavior),
      token_fails: Mutex::new(false),
      token_delay: Duration::from_millis(50),
      token_calls: AtomicUsize::new(0),
      order_calls: AtomicUsize::new(0),
      submitted: Mutex::new(Vec::new()),
    }
  }

  pub fn set_behavior(&self, behavior: SupplierBehavior) {
    *self.behavior.lock() = behavior;
  }

  pub fn fail_tokens(&self) {
    *self.token_fails.lock() = true;
  }

  pub fn token_calls(&self) -> usize {
    self.token_calls.load(Ordering::SeqCst)
  }

  pub fn order_calls(&self) -> usize {
    self.order_calls.load(Ordering::SeqCst)
  }
}

pub fn fresh_credential(access_token: &str) -> SupplierCredential {
  let now = Utc::now();
  SupplierCredential {
    open_id: "open-1".to_string(),
    access_token: access_token.to_string(),
    access_token_expiry: now + ChronoDuration::days(15),
    refresh_token: "refresh-1".to_string(),
    refresh_token_expiry: now + ChronoDuration::days(180),
    updated_at: now,
  }
}

#[async_trait]
impl SupplierApi for FakeSupplier {
  async fn get_access_token(&self, api_key: &str) -> Result<SupplierCredential> {
    tokio::time::sleep(self.token_delay).await;
    let call = self.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
    if *self.token_fails.lock() {
      return Err(AppError::Supplier("authentication refused".to_string()));
    }
    assert_eq!(api_key, "supplier-key");
    Ok(fresh_credential(&format!("token-{}", call)))
  }

  async fn lookup_variant(&self, _access_token: &str, product_id: &str) -> Result<String> {
    if product_id.starts_with("unknown") {
      return Err(AppError::Supplier("no variants".to_string()));
    }
    Ok(format!("vid-{}", product_id))
  }

  async fn create_order(&self, _access_token: &str, request: &SupplierOrderRequest) -> Result<SupplierOrderOutcome> {
    self.order_calls.fetch_add(1, Ordering::SeqCst);
    self.submitted.lock().push(request.clone());
    let behavior = *self.behavior.lock();
    match behavior {
      SupplierBehavior::Accept => Ok(SupplierOrderOutcome::Accepted {
        supplier_order_id: SUPPLIER_ORDER_ID.to_string(),
        raw: json!({ "result": true, "data": { "orderId": SUPPLIER_ORDER_ID } }),
      }),
      SupplierBehavior::Reject => Ok(SupplierOrderOutcome::Rejected {
        message: "Inventory shortage".to_string(),
        raw: json!({ "result": false, "message": "Inventory shortage" }),
      }),
      SupplierBehavior::TransportError => Err(AppError::Supplier("connection reset".to_string())),
      SupplierBehavior::Hang => {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Err(AppError::Supplier("unreachable".to_string()))
      }
    }
  }
}

#[derive(Default)]
pub struct FakeGateway {
  pub created: Mutex<Vec<(i64, String, String)>>,
  pub used_keys: Mutex<Vec<GatewayKeys>>,
}

impl FakeGateway {
  pub fn intents_created(&self) -> usize {
    self.created.lock().len()
  }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
  async fn create_intent(&self, keys: &GatewayKeys, amount_minor: i64, currency: &str, receipt: &str) -> Result<PaymentIntent> {
    let mut created = self.created.lock();
    created.push((amount_minor, currency.to_string(), receipt.to_string()));
    self.used_keys.lock().push(keys.clone());
    Ok(PaymentIntent {
      id: format!("order_test_{}", created.len()),
      amount: amount_minor,
      currency: currency.to_string(),
      receipt: Some(receipt.to_string()),
      status: Some("created".to_string()),
    })
  }

  async fn list_intents(&self, keys: &GatewayKeys, count: u32) -> Result<usize> {
    if keys.key_secret != GATEWAY_SECRET {
      return Err(AppError::Gateway("gateway responded 401 Unauthorized".to_string()));
    }
    Ok(count as usize)
  }
}

pub fn test_config() -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".to_string(),
    server_port: 0,
    database_url: None,
    supplier: SupplierConfig {
      api_base_url: "http://supplier.invalid".to_string(),
      api_key: "supplier-key".to_string(),
      platform: "storefront".to_string(),
      from_country_code: "CN".to_string(),
      logistic_name: "CJPacket Ordinary".to_string(),
    },
    gateway: GatewayConfig {
      api_base_url: "http://gateway.invalid".to_string(),
      key_id: "rzp_test_key".to_string(),
      key_secret: GATEWAY_SECRET.to_string(),
    },
    store_currency: "INR".to_string(),
    outbound_timeout: Duration::from_millis(200),
    admin_api_key: Some(ADMIN_KEY.to_string()),
  }
}

pub struct TestApp {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub supplier: Arc<FakeSupplier>,
  pub gateway: Arc<FakeGateway>,
}

pub fn build_app(behavior: SupplierBehavior) -> TestApp {
  build_app_with(test_config(), behavior)
}

pub fn build_app_with(config: AppConfig, behavior: SupplierBehavior) -> TestApp {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let supplier = Arc::new(FakeSupplier::new(behavior));
  let gateway = Arc::new(FakeGateway::default());
  let state = AppState::build(config, store.clone(), store.clone(), supplier.clone(), gateway.clone());
  TestApp {
    state,
    store,
    supplier,
    gateway,
  }
}

pub fn shipping() -> ShippingSnapshot {
  ShippingSnapshot {
    full_name: "Asha Rao".to_string(),
    street: "12 MG Road".to_string(),
    city: "Bengaluru".to_string(),
    state: "Karnataka".to_string(),
    country: "IN".to_string(),
    zip_code: "560001".to_string(),
    phone: "+91 98450 00000".to_string(),
  }
}

pub fn cart_line(product_id: &str, price: &str, quantity: u32) -> CartLine {
  CartLine {
    product_id: product_id.to_string(),
    name: format!("Product {}", product_id),
    image: None,
    price: PriceInput::Text(price.to_string()),
    quantity,
    sku: None,
  }
}

pub fn signed_proof(gateway_order_id: &str, gateway_payment_id: &str) -> PaymentProof {
  PaymentProof {
    gateway_order_id: gateway_order_id.to_string(),
    gateway_payment_id: gateway_payment_id.to_string(),
    signature: signature::sign(GATEWAY_SECRET, gateway_order_id, gateway_payment_id).unwrap(),
  }
}

/// Cart "12.50" x 2, paid online.
pub fn paid_submission(proof: PaymentProof) -> CheckoutSubmission {
  CheckoutSubmission {
    cart: vec![cart_line("p-100", "12.50", 2)],
    shipping: shipping(),
    payment_method: PaymentMethod::Online,
    payment_proof: Some(proof),
    amount_paid: None,
  }
}

pub fn cod_submission() -> CheckoutSubmission {
  CheckoutSubmission {
    cart: vec![cart_line("p-200", "1378 -- 1915", 1)],
    shipping: shipping(),
    payment_method: PaymentMethod::Cod,
    payment_proof: None,
    amount_paid: None,
  }
}

pub fn dec(raw: &str) -> Decimal {
  Decimal::from_str(raw).unwrap()
}
