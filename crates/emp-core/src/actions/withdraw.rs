//! Withdraw: take collateral out, either instantly or through a timed request.
//!
//! A withdrawal that keeps utilization at or under the global utilization is
//! instant. One that lands strictly between the global utilization and the
//! liquidation point needs a request first. Anything at the liquidation point
//! or beyond is refused outright.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::EligibilityContext;
use crate::error::EngineError;
use crate::invariants::{assert_no_running_withdrawal, assert_positive_amount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawRoute {
  Direct,
  RequiresRequest,
  Blocked,
}

pub fn route(ctx: &EligibilityContext) -> WithdrawRoute {
  let snapshot = ctx.snapshot;
  let pending = ctx.pending;

  // all collateral gone with debt left: utilization clamps to 0 but the position is unbacked
  if pending.pending_collateral.is_zero() && pending.pending_tokens > Decimal::ZERO {
    return WithdrawRoute::Blocked;
  }

  let utilization = pending.pending_utilization;
  if utilization <= snapshot.global_utilization {
    WithdrawRoute::Direct
  } else if utilization < snapshot.liquidation_point {
    WithdrawRoute::RequiresRequest
  } else {
    WithdrawRoute::Blocked
  }
}

/// Direct (instant) withdrawal
pub fn check(ctx: &EligibilityContext) -> Result<(), EngineError> {
  assert_positive_amount(ctx.withdrawal_amount())?;
  assert_no_running_withdrawal(ctx.snapshot, ctx.now)?;

  match route(ctx) {
    WithdrawRoute::Direct => Ok(()),
    WithdrawRoute::RequiresRequest => Err(EngineError::WithdrawalRequestRequired),
    WithdrawRoute::Blocked => Err(EngineError::AboveLiquidationPoint {
      utilization: ctx.pending.pending_utilization,
      limit: ctx.snapshot.liquidation_point,
    }),
  }
}

/// Execute a request whose wait period has elapsed
pub fn check_passed_request(ctx: &EligibilityContext) -> Result<(), EngineError> {
  let timer = ctx
    .snapshot
    .withdrawal_timer()
    .ok_or(EngineError::NoWithdrawalRequest)?;

  if !timer.has_elapsed(ctx.now) {
    return Err(EngineError::WithdrawalNotPassed);
  }
  Ok(())
}
