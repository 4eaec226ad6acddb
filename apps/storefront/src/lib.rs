// src/lib.rs

//! Storefront fulfillment and payment-reconciliation backend.
//!
//! Checkout turns a verified payment into a durable order and forwards it to
//! the dropship supplier; split-payment orders are settled by a second
//! verified charge.

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod web;
