// src/services/pricing.rs

//! Cart price normalization and minor-unit conversion.

use crate::errors::{AppError, Result};
use crate::models::PriceInput;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Canonical unit price for a cart line, in whole minor units. Ranges resolve
/// to their lower bound.
pub fn normalize_price(input: &PriceInput) -> Result<Decimal> {
  match input {
    PriceInput::Number(n) => positive(parse_decimal(&n.to_string())?, &n.to_string()),
    PriceInput::Text(s) => normalize_price_text(s),
  }
}

/// Parses `"500"`, `"1,299.00"`, `"1378 -- 1915"` or `"1378-1915"`.
pub fn normalize_price_text(raw: &str) -> Result<Decimal> {
  let trimmed = raw.trim();
  let lower_bound = if let Some((low, _)) = trimmed.split_once("--") {
    low
  } else {
    // A leading '-' is a sign, not a range separator.
    match trimmed.char_indices().skip(1).find(|(_, c)| *c == '-') {
      Some((idx, _)) => &trimmed[..idx],
      None => trimmed,
    }
  };
  let cleaned: String = lower_bound.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
  positive(parse_decimal(&cleaned).map_err(|_| invalid(raw))?, raw)
}

/// Converts a major-unit amount to minor units (paise, cents), rounding half
/// away from zero at the second decimal place.
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
  amount
    .checked_mul(Decimal::ONE_HUNDRED)
    .and_then(|minor| {
      minor
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
    })
    .ok_or_else(|| AppError::Validation(format!("Amount {} is out of range", amount)))
}

fn parse_decimal(s: &str) -> Result<Decimal> {
  Decimal::from_str(s)
    .or_else(|_| Decimal::from_scientific(s))
    .map_err(|_| invalid(s))
}

/// Rounds to two decimal places first, so `"0.001"` is not a price.
fn positive(value: Decimal, raw: &str) -> Result<Decimal> {
  let value = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
  if value <= Decimal::ZERO {
    return Err(invalid(raw));
  }
  Ok(value)
}

fn invalid(raw: &str) -> AppError {
  AppError::InvalidPrice(format!("'{}' is not a usable price", raw))
}
