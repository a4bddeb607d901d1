//! RequestWithdrawal: start the timed withdrawal flow

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::EligibilityContext;
use crate::error::EngineError;
use crate::invariants::{assert_no_withdrawal_request, assert_positive_amount};
use crate::timer::WithdrawalTimer;

/// Confirmation shown before a request is submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestWithdrawalPrompt {
  pub amount: Decimal,
  pub wait_minutes: i64,
  /// When the request would pass if submitted now
  pub pass_timestamp: DateTime<Utc>,
}

pub fn check(ctx: &EligibilityContext) -> Result<(), EngineError> {
  assert_positive_amount(ctx.withdrawal_amount())?;
  assert_no_withdrawal_request(ctx.snapshot)?;
  Ok(())
}

pub fn prompt(ctx: &EligibilityContext) -> Option<RequestWithdrawalPrompt> {
  check(ctx).ok()?;

  let wait_minutes = ctx.snapshot.withdrawal_period_minutes;
  let timer = WithdrawalTimer::starting_at(ctx.now, wait_minutes)?;

  Some(RequestWithdrawalPrompt {
    amount: ctx.withdrawal_amount(),
    wait_minutes,
    pass_timestamp: timer.pass_timestamp(),
  })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    use crate::actions::tests::{edit, now, snapshot};
    use crate::math::RoundingPolicy;
    use crate::state::Approvals;

    #[test]
    fn test_prompt_surfaces_wait_period() {
        let snap = snapshot();
        let pending = edit(&snap, dec!(60), dec!(40));
        let ctx = EligibilityContext::new(&snap, &pending, Approvals::granted(), now(), &RoundingPolicy::default());
        let prompt = prompt(&ctx).unwrap();
        assert_eq!(prompt.amount, dec!(40));
        assert_eq!(prompt.wait_minutes, 120);
        assert_eq!(prompt.pass_timestamp, now() + Duration::minutes(120));
    }

    #[test]
    fn test_no_prompt_without_amount() {
        let snap = snapshot();
        let pending = edit(&snap, dec!(100), dec!(40));
        let ctx = EligibilityContext::new(&snap, &pending, Approvals::granted(), now(), &RoundingPolicy::default());
        assert_eq!(check(&ctx), Err(EngineError::ZeroAmount));
        assert!(prompt(&ctx).is_none());
    }

    #[test]
    fn test_no_prompt_for_unrepresentable_wait() {
        let mut snap = snapshot();
        snap.withdrawal_period_minutes = i64::MAX / 2;
        let pending = edit(&snap, dec!(60), dec!(40));
        let ctx = EligibilityContext::new(&snap, &pending, Approvals::granted(), now(), &RoundingPolicy::default());
        assert!(check(&ctx).is_ok());
        assert!(prompt(&ctx).is_none());
    }
}
