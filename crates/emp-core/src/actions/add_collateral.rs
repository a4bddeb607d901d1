//! AddCollateral: deposit more collateral into the position

use super::EligibilityContext;
use crate::error::EngineError;
use crate::invariants::assert_positive_amount;

pub fn check(ctx: &EligibilityContext) -> Result<(), EngineError> {
  assert_positive_amount(ctx.deltas.collateral)
}
