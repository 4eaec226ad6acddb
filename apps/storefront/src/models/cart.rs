// src/models/cart.rs

use serde::{Deserialize, Serialize};

/// A price as clients send it: a JSON number, a numeric string, or a range
/// string such as `"1378 -- 1915"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
  Number(serde_json::Number),
  Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
  pub product_id: String,
  pub name: String,
  #[serde(default)]
  pub image: Option<String>,
  pub price: PriceInput,
  pub quantity: u32,
  #[serde(default)]
  pub sku: Option<String>,
}
