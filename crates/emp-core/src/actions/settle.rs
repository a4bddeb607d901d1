//! Settle: redeem against the settlement price once the contract has expired

use super::EligibilityContext;
use crate::error::EngineError;

pub fn check(ctx: &EligibilityContext) -> Result<(), EngineError> {
  if !ctx.snapshot.is_expired {
    return Err(EngineError::NotExpired);
  }
  Ok(())
}
