// src/services/signature.rs

//! Gateway payment signatures: hex HMAC-SHA256 over `"{order_id}|{payment_id}"`.

use crate::errors::{AppError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn keyed_mac(secret: &str, gateway_order_id: &str, gateway_payment_id: &str) -> Result<HmacSha256> {
  if secret.is_empty() {
    return Err(AppError::Config("Gateway key secret is not configured".to_string()));
  }
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
    .map_err(|e| AppError::Internal(format!("Cannot key payment signature: {}", e)))?;
  mac.update(gateway_order_id.as_bytes());
  mac.update(b"|");
  mac.update(gateway_payment_id.as_bytes());
  Ok(mac)
}

/// Signature the gateway sends for this id pair.
pub fn sign(secret: &str, gateway_order_id: &str, gateway_payment_id: &str) -> Result<String> {
  let mac = keyed_mac(secret, gateway_order_id, gateway_payment_id)?;
  Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks a claimed signature in constant time.
pub fn verify(secret: &str, gateway_order_id: &str, gateway_payment_id: &str, claimed_signature: &str) -> Result<()> {
  let claimed = hex::decode(claimed_signature.trim()).map_err(|_| AppError::SignatureMismatch)?;
  keyed_mac(secret, gateway_order_id, gateway_payment_id)?
    .verify_slice(&claimed)
    .map_err(|_| AppError::SignatureMismatch)
}
