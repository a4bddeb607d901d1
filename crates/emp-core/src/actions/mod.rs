//! Action eligibility state machine
//! One module per action; each exposes `check`, returning the first rule the
//! pending position breaks for that action

pub mod add_collateral;
pub mod cancel_withdrawal;
pub mod mint;
pub mod redeem;
pub mod repay;
pub mod request_withdrawal;
pub mod settle;
pub mod withdraw;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculator::deltas_of;
use crate::error::EngineError;
use crate::invariants::{assert_min_tokens_floor, assert_not_expired, assert_positive_amount};
use crate::math::RoundingPolicy;
use crate::state::{Action, ApprovalKind, Approvals, Deltas, PendingEdit, PositionSnapshot};

pub use request_withdrawal::RequestWithdrawalPrompt;
pub use withdraw::WithdrawRoute;

/// What the confirm button for an action should show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "approval")]
pub enum Availability {
  Enabled,
  /// The spender grant is missing; show "Approve" instead of the action
  NeedsApproval(ApprovalKind),
  Disabled,
}

/// Everything an eligibility decision reads
#[derive(Debug, Clone, Copy)]
pub struct EligibilityContext<'a> {
  pub snapshot: &'a PositionSnapshot,
  pub pending: &'a PendingEdit,
  pub deltas: Deltas,
  pub approvals: Approvals,
  pub now: DateTime<Utc>,
}

impl<'a> EligibilityContext<'a> {
  pub fn new(
    snapshot: &'a PositionSnapshot,
    pending: &'a PendingEdit,
    approvals: Approvals,
    now: DateTime<Utc>,
    policy: &RoundingPolicy,
  ) -> Self {
    Self {
      snapshot,
      pending,
      deltas: deltas_of(snapshot, pending, policy),
      approvals,
      now,
    }
  }

  /// Enable predicate for `action`, ignoring approvals
  pub fn check(&self, action: Action) -> Result<(), EngineError> {
    if action != Action::Settle {
      assert_not_expired(self.snapshot)?;
    }

    match action {
      Action::Manage => Err(EngineError::NotConfirmable(Action::Manage)),
      Action::Mint => mint::check(self),
      Action::AddCollateral => add_collateral::check(self),
      Action::Repay => repay::check(self),
      Action::Redeem => redeem::check(self),
      Action::Withdraw => withdraw::check(self),
      Action::RequestWithdrawal => request_withdrawal::check(self),
      Action::CancelWithdrawal => cancel_withdrawal::check(self),
      Action::WithdrawPassedRequest => withdraw::check_passed_request(self),
      Action::Settle => settle::check(self),
    }
  }

  pub fn predicate_holds(&self, action: Action) -> bool {
    self.check(action).is_ok()
  }

  /// The approve affordance replaces the action button whenever the grant is
  /// missing, whatever the state of the predicate
  pub fn availability(&self, action: Action) -> Availability {
    if let Some(kind) = action.required_approval() {
      if !self.approvals.has(kind) {
        return Availability::NeedsApproval(kind);
      }
    }

    if self.predicate_holds(action) {
      Availability::Enabled
    } else {
      Availability::Disabled
    }
  }

  pub fn is_enabled(&self, action: Action) -> bool {
    self.availability(action) == Availability::Enabled
  }

  pub fn enabled_actions(&self) -> BTreeSet<Action> {
    Action::ALL
      .iter()
      .copied()
      .filter(|action| self.is_enabled(*action))
      .collect()
  }

  pub fn route_withdrawal(&self) -> WithdrawRoute {
    withdraw::route(self)
  }

  /// Collateral leaving the position under the pending edit
  pub fn withdrawal_amount(&self) -> Decimal {
    self.snapshot.sponsor_collateral - self.pending.pending_collateral
  }

  /// Tokens burned under the pending edit
  pub fn burn_amount(&self) -> Decimal {
    self.snapshot.sponsor_tokens - self.pending.pending_tokens
  }
}

/// Repay and Redeem both burn part of the debt: `0 < burned < sponsor_tokens`,
/// and the remainder must respect the token floor
fn check_partial_burn(ctx: &EligibilityContext) -> Result<(), EngineError> {
  let burned = ctx.burn_amount();
  assert_positive_amount(burned)?;

  if burned >= ctx.snapshot.sponsor_tokens {
    return Err(EngineError::FullClosureRequired);
  }

  assert_min_tokens_floor(ctx.pending.pending_tokens, ctx.snapshot.min_tokens)
}
