// src/models/mod.rs

//! Data structures shared by the store, the services and the HTTP layer.

pub mod cart;
pub mod credential;
pub mod order;

pub use cart::{CartLine, PriceInput};
pub use credential::{GatewayCredential, GatewayKeys, SupplierCredential};
pub use order::{
  LineItem, Order, OrderStatus, PaymentMethod, PaymentProof, PaymentStatus, RemainingPaymentStatus, ShippingSnapshot,
};
