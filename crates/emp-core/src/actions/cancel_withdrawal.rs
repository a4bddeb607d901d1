//! CancelWithdrawal: drop a request that is still counting down

use super::EligibilityContext;
use crate::error::EngineError;

pub fn check(ctx: &EligibilityContext) -> Result<(), EngineError> {
  let timer = ctx
    .snapshot
    .withdrawal_timer()
    .ok_or(EngineError::NoWithdrawalRequest)?;

  if timer.has_elapsed(ctx.now) {
    return Err(EngineError::WithdrawalPassed);
  }
  Ok(())
}
