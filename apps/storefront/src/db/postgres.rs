// src/db/postgres.rs

use super::{CredentialRepository, OrderRepository, RemainingSettlement, SupplierLinkage};
use crate::errors::{AppError, Result};
use crate::models::{
  GatewayCredential, LineItem, Order, OrderStatus, PaymentMethod, PaymentStatus, RemainingPaymentStatus,
  ShippingSnapshot, SupplierCredential,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, user_id, items, shipping, total_amount, currency, status, payment_method, \
   payment_status, gateway_order_id, gateway_payment_id, supplier_order_id, supplier_response, \
   is_partial_payment, amount_paid, remaining_amount, remaining_payment_status, \
   remaining_gateway_order_id, remaining_gateway_payment_id, created_at, updated_at";

#[derive(FromRow)]
struct OrderRow {
  id: Uuid,
  user_id: Uuid,
  items: Json<Vec<LineItem>>,
  shipping: Json<ShippingSnapshot>,
  total_amount: Decimal,
  currency: String,
  status: OrderStatus,
  payment_method: PaymentMethod,
  payment_status: PaymentStatus,
  gateway_order_id: Option<String>,
  gateway_payment_id: Option<String>,
  supplier_order_id: Option<String>,
  supplier_response: Option<serde_json::Value>,
  is_partial_payment: bool,
  amount_paid: Option<Decimal>,
  remaining_amount: Option<Decimal>,
  remaining_payment_status: Option<RemainingPaymentStatus>,
  remaining_gateway_order_id: Option<String>,
  remaining_gateway_payment_id: Option<String>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
  fn from(row: OrderRow) -> Self {
    Order {
      id: row.id,
      user_id: row.user_id,
      items: row.items.0,
      shipping: row.shipping.0,
      total_amount: row.total_amount,
      currency: row.currency,
      status: row.status,
      payment_method: row.payment_method,
      payment_status: row.payment_status,
      gateway_order_id: row.gateway_order_id,
      gateway_payment_id: row.gateway_payment_id,
      supplier_order_id: row.supplier_order_id,
      supplier_response: row.supplier_response,
      is_partial_payment: row.is_partial_payment,
      amount_paid: row.amount_paid,
      remaining_amount: row.remaining_amount,
      remaining_payment_status: row.remaining_payment_status,
      remaining_gateway_order_id: row.remaining_gateway_order_id,
      remaining_gateway_payment_id: row.remaining_gateway_payment_id,
      created_at: row.created_at,
      updated_at: row.updated_at,
    }
  }
}

/// Postgres-backed store. Queries are checked at run time.
#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  /// Connects and applies the bundled migrations.
  #[instrument(name = "PgStore::connect", skip(database_url), err)]
  pub async fn connect(database_url: &str) -> Result<Self> {
    let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
    info!("Successfully connected to the database.");
    sqlx::migrate!("./migrations")
      .run(&pool)
      .await
      .map_err(|e| AppError::Internal(format!("Database migration failed: {}", e)))?;
    info!("Database migrations applied.");
    Ok(Self::new(pool))
  }
}

#[async_trait]
impl OrderRepository for PgStore {
  #[instrument(name = "PgStore::insert_order", skip_all, fields(order_id = %order.id), err)]
  async fn insert_order(&self, order: &Order) -> Result<()> {
    let sql = format!(
      "INSERT INTO orders ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)",
      ORDER_COLUMNS
    );
    let mut tx = self.pool.begin().await?;
    sqlx::query(&sql)
      .bind(order.id)
      .bind(order.user_id)
      .bind(Json(&order.items))
      .bind(Json(&order.shipping))
      .bind(order.total_amount)
      .bind(&order.currency)
      .bind(order.status)
      .bind(order.payment_method)
      .bind(order.payment_status)
      .bind(&order.gateway_order_id)
      .bind(&order.gateway_payment_id)
      .bind(&order.supplier_order_id)
      .bind(&order.supplier_response)
      .bind(order.is_partial_payment)
      .bind(order.amount_paid)
      .bind(order.remaining_amount)
      .bind(order.remaining_payment_status)
      .bind(&order.remaining_gateway_order_id)
      .bind(&order.remaining_gateway_payment_id)
      .bind(order.created_at)
      .bind(order.updated_at)
      .execute(&mut *tx)
      .await
      .map_err(|e| match e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
          AppError::DuplicatePayment(order.gateway_payment_id.clone().unwrap_or_default())
        }
        other => AppError::Sqlx(other),
      })?;
    if let Some(payment_id) = &order.gateway_payment_id {
      claim_payment(&mut tx, payment_id, order.id).await?;
    }
    tx.commit().await?;
    Ok(())
  }

  async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
    let row = sqlx::query_as::<_, OrderRow>(&sql)
      .bind(order_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(Order::from))
  }

  async fn find_by_gateway_payment_id(&self, gateway_payment_id: &str) -> Result<Option<Order>> {
    let sql = format!(
      "SELECT {} FROM orders WHERE gateway_payment_id = $1 OR remaining_gateway_payment_id = $1",
      ORDER_COLUMNS
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
      .bind(gateway_payment_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(Order::from))
  }

  async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
    let sql = format!(
      "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
      ORDER_COLUMNS
    );
    let rows = sqlx::query_as::<_, OrderRow>(&sql)
      .bind(user_id)
      .fetch_all(&self.pool)
      .await?;
    Ok(rows.into_iter().map(Order::from).collect())
  }

  #[instrument(name = "PgStore::record_supplier_linkage", skip(self, linkage), err)]
  async fn record_supplier_linkage(&self, order_id: Uuid, linkage: &SupplierLinkage) -> Result<()> {
    let result = sqlx::query(
      "UPDATE orders SET \
         supplier_order_id = COALESCE($2, supplier_order_id), \
         supplier_response = COALESCE($3, supplier_response), \
         status = CASE WHEN $2 IS NOT NULL AND status = 'placed' THEN 'confirmed'::order_status ELSE status END, \
         updated_at = now() \
       WHERE id = $1",
    )
    .bind(order_id)
    .bind(&linkage.supplier_order_id)
    .bind(&linkage.response)
    .execute(&self.pool)
    .await?;
    if result.rows_affected() == 0 {
      return Err(AppError::NotFound(format!("Order {} not found", order_id)));
    }
    Ok(())
  }

  async fn update_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()> {
    let result = sqlx::query("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1")
      .bind(order_id)
      .bind(status)
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      return Err(AppError::NotFound(format!("Order {} not found", order_id)));
    }
    Ok(())
  }

  async fn record_remaining_intent(&self, order_id: Uuid, gateway_order_id: &str) -> Result<()> {
    sqlx::query(
      "UPDATE orders SET remaining_gateway_order_id = $2, updated_at = now() \
       WHERE id = $1 AND is_partial_payment AND remaining_payment_status IS DISTINCT FROM 'paid'",
    )
    .bind(order_id)
    .bind(gateway_order_id)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  #[instrument(name = "PgStore::settle_remaining", skip(self, settlement), err)]
  async fn settle_remaining(&self, order_id: Uuid, settlement: &RemainingSettlement) -> Result<bool> {
    let mut tx = self.pool.begin().await?;
    // Compare-and-set: only the first settlement flips the status.
    let result = sqlx::query(
      "UPDATE orders SET \
         remaining_payment_status = 'paid', \
         remaining_gateway_order_id = $2, \
         remaining_gateway_payment_id = $3, \
         updated_at = now() \
       WHERE id = $1 AND is_partial_payment AND remaining_payment_status IS DISTINCT FROM 'paid'",
    )
    .bind(order_id)
    .bind(&settlement.gateway_order_id)
    .bind(&settlement.gateway_payment_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| match e {
      sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
        AppError::DuplicatePayment(settlement.gateway_payment_id.clone())
      }
      other => AppError::Sqlx(other),
    })?;
    if result.rows_affected() == 0 {
      tx.rollback().await?;
      return Ok(false);
    }
    claim_payment(&mut tx, &settlement.gateway_payment_id, order_id).await?;
    tx.commit().await?;
    Ok(true)
  }
}

/// Records `payment_id` as spent. Dropping `tx` on the error path rolls the
/// surrounding write back.
async fn claim_payment(tx: &mut Transaction<'_, Postgres>, payment_id: &str, order_id: Uuid) -> Result<()> {
  sqlx::query("INSERT INTO gateway_payments (gateway_payment_id, order_id) VALUES ($1, $2)")
    .bind(payment_id)
    .bind(order_id)
    .execute(&mut **tx)
    .await
    .map_err(|e| match e {
      sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::DuplicatePayment(payment_id.to_string()),
      other => AppError::Sqlx(other),
    })?;
  Ok(())
}

#[async_trait]
impl CredentialRepository for PgStore {
  async fn load_supplier_credential(&self) -> Result<Option<SupplierCredential>> {
    let credential = sqlx::query_as::<_, SupplierCredential>(
      "SELECT open_id, access_token, access_token_expiry, refresh_token, refresh_token_expiry, updated_at \
       FROM supplier_credentials WHERE id = 1",
    )
    .fetch_optional(&self.pool)
    .await?;
    Ok(credential)
  }

  #[instrument(name = "PgStore::upsert_supplier_credential", skip_all, err)]
  async fn upsert_supplier_credential(&self, credential: &SupplierCredential) -> Result<()> {
    sqlx::query(
      "INSERT INTO supplier_credentials \
         (id, open_id, access_token, access_token_expiry, refresh_token, refresh_token_expiry, updated_at) \
       VALUES (1, $1, $2, $3, $4, $5, $6) \
       ON CONFLICT (id) DO UPDATE SET \
         open_id = EXCLUDED.open_id, \
         access_token = EXCLUDED.access_token, \
         access_token_expiry = EXCLUDED.access_token_expiry, \
         refresh_token = EXCLUDED.refresh_token, \
         refresh_token_expiry = EXCLUDED.refresh_token_expiry, \
         updated_at = EXCLUDED.updated_at",
    )
    .bind(&credential.open_id)
    .bind(&credential.access_token)
    .bind(credential.access_token_expiry)
    .bind(&credential.refresh_token)
    .bind(credential.refresh_token_expiry)
    .bind(credential.updated_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn load_gateway_credential(&self) -> Result<Option<GatewayCredential>> {
    let credential = sqlx::query_as::<_, GatewayCredential>(
      "SELECT key_id, key_secret, is_enabled, updated_at FROM gateway_credentials WHERE id = 1",
    )
    .fetch_optional(&self.pool)
    .await?;
    Ok(credential)
  }

  #[instrument(name = "PgStore::upsert_gateway_credential", skip_all, err)]
  async fn upsert_gateway_credential(&self, credential: &GatewayCredential) -> Result<()> {
    sqlx::query(
      "INSERT INTO gateway_credentials (id, key_id, key_secret, is_enabled, updated_at) \
       VALUES (1, $1, $2, $3, $4) \
       ON CONFLICT (id) DO UPDATE SET \
         key_id = EXCLUDED.key_id, \
         key_secret = EXCLUDED.key_secret, \
         is_enabled = EXCLUDED.is_enabled, \
         updated_at = EXCLUDED.updated_at",
    )
    .bind(&credential.key_id)
    .bind(&credential.key_secret)
    .bind(credential.is_enabled)
    .bind(credential.updated_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}
