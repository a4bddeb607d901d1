//! Invariant assertions for sponsor positions
//! These are the rules a pending position must satisfy before an action is offered
//! Each returns the violated rule as an `EngineError` and never panics

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::EngineError;
use crate::state::PositionSnapshot;

/// Assert that a resulting token amount respects the position minimum
/// A position holds either no tokens or at least `min_tokens`
///
/// # Arguments
/// * `tokens` - Resulting token amount
/// * `min_tokens` - Minimum non-zero token amount
pub fn assert_min_tokens_floor(tokens: Decimal, min_tokens: Decimal) -> Result<(), EngineError> {
  if tokens > Decimal::ZERO && tokens < min_tokens {
    return Err(EngineError::BelowMinTokens { tokens, min_tokens });
  }
  Ok(())
}

/// Assert that outstanding tokens have collateral behind them.
/// Utilization clamps to 0 at zero collateral, so the utilization bounds alone miss this.
pub fn assert_collateral_backs_tokens(collateral: Decimal, tokens: Decimal) -> Result<(), EngineError> {
  if collateral.is_zero() && tokens > Decimal::ZERO {
    return Err(EngineError::UnbackedTokens { tokens });
  }
  Ok(())
}

/// Assert that utilization does not exceed the global utilization (GCR bound)
///
/// # Arguments
/// * `utilization` - Pending utilization
/// * `global_utilization` - System-wide utilization ceiling
pub fn assert_within_global_utilization(
  utilization: Decimal,
  global_utilization: Decimal,
) -> Result<(), EngineError> {
  if utilization > global_utilization {
    return Err(EngineError::AboveGlobalUtilization {
      utilization,
      limit: global_utilization,
    });
  }
  Ok(())
}

/// Assert that utilization does not exceed the liquidation point
pub fn assert_below_liquidation_point(
  utilization: Decimal,
  liquidation_point: Decimal,
) -> Result<(), EngineError> {
  if utilization > liquidation_point {
    return Err(EngineError::AboveLiquidationPoint {
      utilization,
      limit: liquidation_point,
    });
  }
  Ok(())
}

/// Assert that a deposit can be funded from the wallet
///
/// # Arguments
/// * `collateral_delta` - Net collateral movement; only positive values are deposits
/// * `wallet_balance` - Collateral available in the wallet
pub fn assert_within_wallet_balance(
  collateral_delta: Decimal,
  wallet_balance: Decimal,
) -> Result<(), EngineError> {
  if collateral_delta > wallet_balance {
    return Err(EngineError::ExceedsWalletBalance {
      required: collateral_delta,
      available: wallet_balance,
    });
  }
  Ok(())
}

pub fn assert_positive_amount(amount: Decimal) -> Result<(), EngineError> {
  if amount <= Decimal::ZERO {
    return Err(EngineError::ZeroAmount);
  }
  Ok(())
}

/// At most one withdrawal request per position
pub fn assert_no_withdrawal_request(snapshot: &PositionSnapshot) -> Result<(), EngineError> {
  if snapshot.withdrawal_request.is_some() {
    return Err(EngineError::WithdrawalRequestOutstanding);
  }
  Ok(())
}

/// Assert the position has not expired. After expiry only settlement is valid.
pub fn assert_not_expired(snapshot: &PositionSnapshot) -> Result<(), EngineError> {
  if snapshot.is_expired {
    return Err(EngineError::PositionExpired);
  }
  Ok(())
}

/// Assert no withdrawal countdown is running at `now`
pub fn assert_no_running_withdrawal(
  snapshot: &PositionSnapshot,
  now: DateTime<Utc>,
) -> Result<(), EngineError> {
  if snapshot.withdrawal_pending(now) {
    return Err(EngineError::WithdrawalRequestOutstanding);
  }
  Ok(())
}
