// src/state.rs
use crate::config::AppConfig;
use crate::db::{CredentialRepository, OrderRepository};
use crate::errors::AppError;
use crate::pipelines;
use crate::services::gateway::PaymentGateway;
use crate::services::gateway_settings::GatewaySettings;
use crate::services::ledger::OrderLedger;
use crate::services::partial_payment::PartialPaymentCoordinator;
use crate::services::supplier::SupplierApi;
use crate::services::supplier_sync::{FulfillmentProfile, SupplierSynchronizer};
use crate::services::tokens::TokenManager;
use std::sync::Arc;
use storefront_flow::Flows;

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub flows: Arc<Flows<AppError>>,
  pub ledger: Arc<OrderLedger>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub gateway_settings: Arc<GatewaySettings>,
  pub tokens: Arc<TokenManager>,
  pub supplier_sync: Arc<SupplierSynchronizer>,
  pub partial_payments: Arc<PartialPaymentCoordinator>,
}

impl AppState {
  /// Wires the services over the given store and outbound clients and
  /// registers every pipeline.
  pub fn build(
    config: AppConfig,
    orders: Arc<dyn OrderRepository>,
    credentials: Arc<dyn CredentialRepository>,
    supplier: Arc<dyn SupplierApi>,
    gateway: Arc<dyn PaymentGateway>,
  ) -> Self {
    let ledger = Arc::new(OrderLedger::new(orders));
    let gateway_settings = Arc::new(GatewaySettings::new(credentials.clone(), &config.gateway));
    let tokens = Arc::new(TokenManager::new(
      credentials,
      supplier.clone(),
      config.supplier.api_key.clone(),
    ));
    let supplier_sync = Arc::new(SupplierSynchronizer::new(
      tokens.clone(),
      supplier,
      ledger.clone(),
      FulfillmentProfile::from(&config.supplier),
      config.outbound_timeout,
    ));
    let partial_payments = Arc::new(PartialPaymentCoordinator::new(
      ledger.clone(),
      gateway.clone(),
      gateway_settings.clone(),
    ));

    let flows = Arc::new(Flows::<AppError>::new());
    pipelines::register_all_pipelines(&flows);

    Self {
      config: Arc::new(config),
      flows,
      ledger,
      gateway,
      gateway_settings,
      tokens,
      supplier_sync,
      partial_payments,
    }
  }
}
