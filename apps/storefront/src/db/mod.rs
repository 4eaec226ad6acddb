// src/db/mod.rs

//! Persistence seam. `PgStore` backs production, `MemoryStore` runs without a
//! database and backs the test-suite.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::errors::Result;
use crate::models::{GatewayCredential, Order, OrderStatus, SupplierCredential};
use async_trait::async_trait;
use uuid::Uuid;

/// Result of one supplier submission, written back onto the order.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplierLinkage {
  /// Set only when the supplier accepted the order. Promotes a `placed`
  /// order to `confirmed`.
  pub supplier_order_id: Option<String>,
  pub response: Option<serde_json::Value>,
}

/// Second gateway id pair stored when the remaining balance is paid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemainingSettlement {
  pub gateway_order_id: String,
  pub gateway_payment_id: String,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
  /// Inserts a new order. A gateway payment id already attached to any order,
  /// as its deposit or its remaining-balance payment, fails with
  /// `AppError::DuplicatePayment`.
  async fn insert_order(&self, order: &Order) -> Result<()>;

  async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>>;

  /// Looks in both `gateway_payment_id` and `remaining_gateway_payment_id`.
  async fn find_by_gateway_payment_id(&self, gateway_payment_id: &str) -> Result<Option<Order>>;

  /// Newest first.
  async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>>;

  async fn record_supplier_linkage(&self, order_id: Uuid, linkage: &SupplierLinkage) -> Result<()>;

  async fn update_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()>;

  /// Stores the gateway intent opened for the remaining balance. No-op once
  /// the balance is settled.
  async fn record_remaining_intent(&self, order_id: Uuid, gateway_order_id: &str) -> Result<()>;

  /// Marks the remaining balance paid unless it already is. Returns `false`
  /// when another request settled it first. A payment id already attached to
  /// any order fails with `AppError::DuplicatePayment` and writes nothing.
  async fn settle_remaining(&self, order_id: Uuid, settlement: &RemainingSettlement) -> Result<bool>;
}

#[async_trait]
pub trait CredentialRepository: Send + Sync {
  async fn load_supplier_credential(&self) -> Result<Option<SupplierCredential>>;

  /// Replaces the singleton row.
  async fn upsert_supplier_credential(&self, credential: &SupplierCredential) -> Result<()>;

  async fn load_gateway_credential(&self) -> Result<Option<GatewayCredential>>;

  async fn upsert_gateway_credential(&self, credential: &GatewayCredential) -> Result<()>;
}
