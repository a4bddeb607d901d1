//! Redeem: burn tokens and take back collateral at the current ratio.
//! The calculator derives the collateral leg, so only the burn is checked here.

use super::{check_partial_burn, EligibilityContext};
use crate::error::EngineError;

pub fn check(ctx: &EligibilityContext) -> Result<(), EngineError> {
  check_partial_burn(ctx)
}
