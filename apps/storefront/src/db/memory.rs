// src/db/memory.rs

use super::{CredentialRepository, OrderRepository, RemainingSettlement, SupplierLinkage};
use crate::errors::{AppError, Result};
use crate::models::{GatewayCredential, Order, OrderStatus, RemainingPaymentStatus, SupplierCredential};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

/// Process-local store. Every operation runs under one lock, so each write is
/// atomic with respect to the others.
#[derive(Default)]
pub struct MemoryStore {
  orders: Mutex<HashMap<Uuid, Order>>,
  supplier_credential: Mutex<Option<SupplierCredential>>,
  gateway_credential: Mutex<Option<GatewayCredential>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn order_count(&self) -> usize {
    self.orders.lock().len()
  }
}

fn missing_order(order_id: Uuid) -> AppError {
  AppError::NotFound(format!("Order {} not found", order_id))
}

fn pays_with(order: &Order, payment_id: &str) -> bool {
  order.gateway_payment_id.as_deref() == Some(payment_id)
    || order.remaining_gateway_payment_id.as_deref() == Some(payment_id)
}

#[async_trait]
impl OrderRepository for MemoryStore {
  async fn insert_order(&self, order: &Order) -> Result<()> {
    let mut orders = self.orders.lock();
    if let Some(payment_id) = order.gateway_payment_id.as_deref() {
      if orders.values().any(|o| pays_with(o, payment_id)) {
        return Err(AppError::DuplicatePayment(payment_id.to_string()));
      }
    }
    if orders.contains_key(&order.id) {
      return Err(AppError::Internal(format!("Order id {} already exists", order.id)));
    }
    orders.insert(order.id, order.clone());
    Ok(())
  }

  async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>> {
    Ok(self.orders.lock().get(&order_id).cloned())
  }

  async fn find_by_gateway_payment_id(&self, gateway_payment_id: &str) -> Result<Option<Order>> {
    Ok(
      self
        .orders
        .lock()
        .values()
        .find(|o| pays_with(o, gateway_payment_id))
        .cloned(),
    )
  }

  async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
    let mut found: Vec<Order> = self
      .orders
      .lock()
      .values()
      .filter(|o| o.user_id == user_id)
      .cloned()
      .collect();
    found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(found)
  }

  async fn record_supplier_linkage(&self, order_id: Uuid, linkage: &SupplierLinkage) -> Result<()> {
    let mut orders = self.orders.lock();
    let order = orders.get_mut(&order_id).ok_or_else(|| missing_order(order_id))?;
    if let Some(supplier_order_id) = &linkage.supplier_order_id {
      order.supplier_order_id = Some(supplier_order_id.clone());
      if order.status == OrderStatus::Placed {
        order.status = OrderStatus::Confirmed;
      }
    }
    if linkage.response.is_some() {
      order.supplier_response = linkage.response.clone();
    }
    order.updated_at = Utc::now();
    Ok(())
  }

  async fn update_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()> {
    let mut orders = self.orders.lock();
    let order = orders.get_mut(&order_id).ok_or_else(|| missing_order(order_id))?;
    order.status = status;
    order.updated_at = Utc::now();
    Ok(())
  }

  async fn record_remaining_intent(&self, order_id: Uuid, gateway_order_id: &str) -> Result<()> {
    let mut orders = self.orders.lock();
    let order = orders.get_mut(&order_id).ok_or_else(|| missing_order(order_id))?;
    if order.is_partial_payment && !order.remaining_settled() {
      order.remaining_gateway_order_id = Some(gateway_order_id.to_string());
      order.updated_at = Utc::now();
    }
    Ok(())
  }

  async fn settle_remaining(&self, order_id: Uuid, settlement: &RemainingSettlement) -> Result<bool> {
    let mut orders = self.orders.lock();
    let order = orders.get(&order_id).ok_or_else(|| missing_order(order_id))?;
    if !order.is_partial_payment || order.remaining_settled() {
      return Ok(false);
    }
    if orders.values().any(|o| pays_with(o, &settlement.gateway_payment_id)) {
      return Err(AppError::DuplicatePayment(settlement.gateway_payment_id.clone()));
    }
    let order = orders.get_mut(&order_id).ok_or_else(|| missing_order(order_id))?;
    order.remaining_payment_status = Some(RemainingPaymentStatus::Paid);
    order.remaining_gateway_order_id = Some(settlement.gateway_order_id.clone());
    order.remaining_gateway_payment_id = Some(settlement.gateway_payment_id.clone());
    order.updated_at = Utc::now();
    Ok(true)
  }
}

#[async_trait]
impl CredentialRepository for MemoryStore {
  async fn load_supplier_credential(&self) -> Result<Option<SupplierCredential>> {
    Ok(self.supplier_credential.lock().clone())
  }

  async fn upsert_supplier_credential(&self, credential: &SupplierCredential) -> Result<()> {
    *self.supplier_credential.lock() = Some(credential.clone());
    Ok(())
  }

  async fn load_gateway_credential(&self) -> Result<Option<GatewayCredential>> {
    Ok(self.gateway_credential.lock().clone())
  }

  async fn upsert_gateway_credential(&self, credential: &GatewayCredential) -> Result<()> {
    *self.gateway_credential.lock() = Some(credential.clone());
    Ok(())
  }
}
