// src/services/mod.rs

pub mod gateway;
pub mod gateway_settings;
pub mod ledger;
pub mod partial_payment;
pub mod pricing;
pub mod signature;
pub mod supplier;
pub mod supplier_sync;
pub mod tokens;
