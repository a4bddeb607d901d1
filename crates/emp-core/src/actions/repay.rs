//! Repay: burn part of the debt, leaving collateral in place.
//! Burning everything is the close flow, not a repay.

use super::{check_partial_burn, EligibilityContext};
use crate::error::EngineError;

pub fn check(ctx: &EligibilityContext) -> Result<(), EngineError> {
  check_partial_burn(ctx)
}
