//! Mint: add debt, optionally with more collateral, staying inside the GCR band

use rust_decimal::Decimal;

use super::EligibilityContext;
use crate::error::EngineError;
use crate::invariants::{
  assert_below_liquidation_point, assert_collateral_backs_tokens, assert_min_tokens_floor,
  assert_positive_amount, assert_within_global_utilization,
};

pub fn check(ctx: &EligibilityContext) -> Result<(), EngineError> {
  let snapshot = ctx.snapshot;
  let utilization = ctx.pending.pending_utilization;

  assert_positive_amount(ctx.deltas.tokens)?;

  if ctx.deltas.collateral < Decimal::ZERO {
    return Err(EngineError::CollateralDecrease);
  }

  assert_collateral_backs_tokens(ctx.pending.pending_collateral, ctx.pending.pending_tokens)?;

  assert_within_global_utilization(utilization, snapshot.global_utilization)?;
  assert_below_liquidation_point(utilization, snapshot.liquidation_point)?;
  assert_min_tokens_floor(ctx.pending.pending_tokens, snapshot.min_tokens)?;

  Ok(())
}
