//! Pure mathematical functions for the position engine
//! All functions are deterministic and work on `Decimal` amounts
//! Nothing here returns an error: degenerate inputs collapse to zero

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::constants::{CALC_PRECISION, DISPLAY_PRECISION};

/// Fractional digits used when rounding engine values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundingPolicy {
  /// Digits kept for intermediate calculator values (utilization, pending legs, deltas)
  pub calc_dp: u32,
  /// Digits kept for human-facing maxima
  pub display_dp: u32,
}

impl Default for RoundingPolicy {
  fn default() -> Self {
    Self {
      calc_dp: CALC_PRECISION,
      display_dp: DISPLAY_PRECISION,
    }
  }
}

impl RoundingPolicy {
  pub fn calc(&self, value: Decimal) -> Decimal {
    round_half_up(value, self.calc_dp)
  }

  pub fn display(&self, value: Decimal) -> Decimal {
    round_half_up(value, self.display_dp)
  }
}

/// Round to `dp` fractional digits, ties away from zero
/// Engine amounts are non-negative, so this is plain round-half-up
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
  value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

pub fn clamp_non_negative(value: Decimal) -> Decimal {
  value.max(Decimal::ZERO)
}

/// Multiply two values and divide by a third
/// Returns None on a zero divisor or on overflow
pub fn mul_div(a: Decimal, b: Decimal, c: Decimal) -> Option<Decimal> {
  if c.is_zero() {
    return None;
  }

  a.checked_mul(b)?.checked_div(c)
}

/// Divide, collapsing a zero divisor or overflow to zero
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
  if denominator.is_zero() {
    return Decimal::ZERO;
  }

  numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

/// Compute price-adjusted utilization of a position
///
/// # Arguments
/// * `tokens` - Synthetic tokens outstanding
/// * `collateral` - Collateral locked against those tokens
/// * `token_price` - Token price in collateral units
///
/// # Returns
/// `tokens * token_price / collateral`, or 0 when collateral is not positive
/// or the product overflows. Never negative.
pub fn compute_utilization(tokens: Decimal, collateral: Decimal, token_price: Decimal) -> Decimal {
  if collateral <= Decimal::ZERO {
    return Decimal::ZERO;
  }

  mul_div(tokens, token_price, collateral)
    .map(clamp_non_negative)
    .unwrap_or(Decimal::ZERO)
}

/// Collateral left when a position is scaled down to `tokens`, keeping its ratio
///
/// # Arguments
/// * `collateral` - Collateral leg of the current position
/// * `current_tokens` - Token leg of the current position
/// * `tokens` - Token leg after the scale
///
/// # Returns
/// `collateral * tokens / current_tokens`; `collateral` unchanged when the
/// position holds no tokens, 0 on overflow
pub fn proportional_collateral(
  collateral: Decimal,
  current_tokens: Decimal,
  tokens: Decimal,
) -> Decimal {
  if current_tokens <= Decimal::ZERO {
    return clamp_non_negative(collateral);
  }

  mul_div(collateral, tokens, current_tokens)
    .map(clamp_non_negative)
    .unwrap_or(Decimal::ZERO)
}

/// Collateralization ratio is the reciprocal of utilization (0 with no debt)
pub fn collateralization_ratio(utilization: Decimal) -> Decimal {
  safe_div(Decimal::ONE, utilization)
}

/// Token price at which a position reaches the liquidation point
///
/// # Arguments
/// * `collateral` - Collateral leg
/// * `tokens` - Token leg
/// * `liquidation_point` - Utilization threshold for liquidation
///
/// # Returns
/// `liquidation_point * collateral / tokens`, 0 when there are no tokens
pub fn liquidation_price(
  collateral: Decimal,
  tokens: Decimal,
  liquidation_point: Decimal,
) -> Decimal {
  if tokens <= Decimal::ZERO {
    return Decimal::ZERO;
  }

  mul_div(liquidation_point, collateral, tokens)
    .map(clamp_non_negative)
    .unwrap_or(Decimal::ZERO)
}

/// Parse a user-typed amount. Anything unparseable or negative is 0.
pub fn parse_amount(text: &str) -> Decimal {
  let trimmed = text.trim();
  if trimmed.is_empty() {
    return Decimal::ZERO;
  }

  Decimal::from_str(trimmed)
    .or_else(|_| Decimal::from_scientific(trimmed))
    .map(clamp_non_negative)
    .unwrap_or(Decimal::ZERO)
}
