// src/main.rs

use std::sync::Arc;

use actix_web::{web as actix_data, App, HttpServer};
use storefront::config::AppConfig;
use storefront::db::memory::MemoryStore;
use storefront::db::postgres::PgStore;
use storefront::db::{CredentialRepository, OrderRepository};
use storefront::services::gateway::RazorpayGateway;
use storefront::services::supplier::CjSupplierClient;
use storefront::state::AppState;
use storefront::web::configure_app_routes;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting storefront server...");

  let app_config = AppConfig::from_env().map_err(|e| {
    tracing::error!(error = %e, "Failed to load application configuration.");
    e
  })?;
  tracing::info!(config = ?app_config, "Configuration loaded.");

  let (orders, credentials): (Arc<dyn OrderRepository>, Arc<dyn CredentialRepository>) =
    match app_config.database_url.as_deref() {
      Some(url) => {
        let store = Arc::new(PgStore::connect(url).await.map_err(|e| {
          tracing::error!(error = %e, "Failed to connect to the database.");
          e
        })?);
        (store.clone(), store)
      }
      None => {
        tracing::warn!("DATABASE_URL is not set; orders and credentials are kept in memory only.");
        let store = Arc::new(MemoryStore::new());
        (store.clone(), store)
      }
    };

  let supplier = Arc::new(CjSupplierClient::new(
    app_config.supplier.api_base_url.clone(),
    app_config.outbound_timeout,
  )?);
  let gateway = Arc::new(RazorpayGateway::new(
    app_config.gateway.api_base_url.clone(),
    app_config.outbound_timeout,
  )?);

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  let app_state = AppState::build(app_config, orders, credentials, supplier, gateway);
  tracing::info!(pipelines = ?app_state.flows.pipeline_names(), "Pipelines ready.");

  tracing::info!("Attempting to bind server to {}...", server_address);
  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await?;

  Ok(())
}
