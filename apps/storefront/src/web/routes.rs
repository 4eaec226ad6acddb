// src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{order_handlers, payment_handlers, supplier_handlers};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/orders")
          .route("", web::get().to(order_handlers::list_orders_handler))
          .route("/place", web::post().to(order_handlers::place_order_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
          .route(
            "/{order_id}/status",
            web::patch().to(order_handlers::update_order_status_handler),
          )
          .route(
            "/{order_id}/supplier-sync",
            web::post().to(order_handlers::resync_supplier_order_handler),
          ),
      )
      .service(
        web::scope("/payments")
          .route(
            "/create-order",
            web::post().to(payment_handlers::create_payment_intent_handler),
          )
          .route("/verify", web::post().to(payment_handlers::verify_payment_handler))
          .route(
            "/remaining/create-order",
            web::post().to(payment_handlers::create_remaining_intent_handler),
          )
          .route(
            "/remaining/verify",
            web::post().to(payment_handlers::verify_remaining_payment_handler),
          )
          .route("/settings", web::get().to(payment_handlers::get_gateway_settings_handler))
          .route("/settings", web::put().to(payment_handlers::update_gateway_settings_handler))
          .route(
            "/settings/test",
            web::get().to(payment_handlers::test_gateway_settings_handler),
          ),
      )
      .service(
        web::scope("/supplier").route("/status", web::get().to(supplier_handlers::supplier_status_handler)),
      ),
  );
}
