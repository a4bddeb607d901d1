//! Engine state types
//! The snapshot mirrors the on-chain sponsor record plus market parameters,
//! the pending edit is the user's proposed resulting position

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_WITHDRAWAL_PERIOD_MINUTES;
use crate::math::{clamp_non_negative, RoundingPolicy};
use crate::timer::WithdrawalTimer;

/// Tunables shared by the loader, the calculator and the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
  pub rounding: RoundingPolicy,
  /// Wait period assumed when market data does not carry one
  pub default_withdrawal_period_minutes: i64,
}

impl Default for EngineSettings {
  fn default() -> Self {
    Self {
      rounding: RoundingPolicy::default(),
      default_withdrawal_period_minutes: DEFAULT_WITHDRAWAL_PERIOD_MINUTES,
    }
  }
}

/// The selected action. `Manage` is the menu state of an existing position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
  Manage,
  Mint,
  AddCollateral,
  Repay,
  Redeem,
  Withdraw,
  RequestWithdrawal,
  CancelWithdrawal,
  WithdrawPassedRequest,
  Settle,
}

impl Action {
  pub const ALL: [Action; 10] = [
    Action::Manage,
    Action::Mint,
    Action::AddCollateral,
    Action::Repay,
    Action::Redeem,
    Action::Withdraw,
    Action::RequestWithdrawal,
    Action::CancelWithdrawal,
    Action::WithdrawPassedRequest,
    Action::Settle,
  ];

  /// Spender grant the action needs before it can be submitted.
  /// Collateral flows into the contract on Mint and AddCollateral,
  /// synthetic tokens flow in on Repay, Redeem and Settle.
  pub fn required_approval(self) -> Option<ApprovalKind> {
    match self {
      Action::Mint | Action::AddCollateral => Some(ApprovalKind::Collateral),
      Action::Repay | Action::Redeem | Action::Settle => Some(ApprovalKind::Synth),
      _ => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Action::Manage => "manage",
      Action::Mint => "mint",
      Action::AddCollateral => "add_collateral",
      Action::Repay => "repay",
      Action::Redeem => "redeem",
      Action::Withdraw => "withdraw",
      Action::RequestWithdrawal => "request_withdrawal",
      Action::CancelWithdrawal => "cancel_withdrawal",
      Action::WithdrawPassedRequest => "withdraw_passed_request",
      Action::Settle => "settle",
    }
  }
}

impl fmt::Display for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalKind {
  Collateral,
  Synth,
}

/// Spender grants reported by the token-allowance collaborator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approvals {
  pub collateral: bool,
  pub synth: bool,
}

impl Approvals {
  pub fn granted() -> Self {
    Self {
      collateral: true,
      synth: true,
    }
  }

  pub fn has(&self, kind: ApprovalKind) -> bool {
    match kind {
      ApprovalKind::Collateral => self.collateral,
      ApprovalKind::Synth => self.synth,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
  pub amount: Decimal,
  pub pass_timestamp: DateTime<Utc>,
}

impl WithdrawalRequest {
  pub fn timer(&self) -> WithdrawalTimer {
    WithdrawalTimer::new(self.pass_timestamp)
  }
}

/// Read-only view of a sponsor position and its market.
/// Replaced wholesale on every refresh, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
  /// Collateral locked in the on-chain position
  pub sponsor_collateral: Decimal,
  /// Synthetic tokens outstanding against that collateral
  pub sponsor_tokens: Decimal,
  /// `sponsor_tokens * token_price / sponsor_collateral`, 0 with no position
  pub utilization: Decimal,
  /// Utilization ceiling for new mints (reciprocal of the GCR)
  pub global_utilization: Decimal,
  /// Utilization at which the position becomes liquidatable
  pub liquidation_point: Decimal,
  /// Smallest non-zero token amount a position may hold
  pub min_tokens: Decimal,
  /// Collateral available in the wallet
  pub max_collateral: Decimal,
  /// Token price in collateral units
  pub token_price: Decimal,
  pub withdrawal_request: Option<WithdrawalRequest>,
  pub withdrawal_period_minutes: i64,
  pub is_expired: bool,
  pub has_position: bool,
  pub loaded_at: DateTime<Utc>,
}

impl PositionSnapshot {
  /// Locked collateral less any outstanding withdrawal request
  pub fn effective_collateral(&self) -> Decimal {
    let requested = self
      .withdrawal_request
      .map(|request| request.amount)
      .unwrap_or(Decimal::ZERO);

    clamp_non_negative(self.sponsor_collateral - requested)
  }

  pub fn withdrawal_timer(&self) -> Option<WithdrawalTimer> {
    self.withdrawal_request.map(|request| request.timer())
  }

  pub fn withdrawal_minutes_left(&self, now: DateTime<Utc>) -> Option<i64> {
    self.withdrawal_timer().map(|timer| timer.minutes_left(now))
  }

  /// True while a request exists and its wait has not elapsed
  pub fn withdrawal_pending(&self, now: DateTime<Utc>) -> bool {
    self
      .withdrawal_timer()
      .map(|timer| timer.is_running(now))
      .unwrap_or(false)
  }

  pub fn withdrawal_passed(&self, now: DateTime<Utc>) -> bool {
    self
      .withdrawal_timer()
      .map(|timer| timer.has_elapsed(now))
      .unwrap_or(false)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingField {
  Collateral,
  Tokens,
}

/// Net movement from the sponsor position to the pending one.
/// Positive collateral is a deposit, positive tokens a mint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deltas {
  pub collateral: Decimal,
  pub tokens: Decimal,
}

/// The user's proposed resulting position (not deltas)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEdit {
  pub pending_collateral: Decimal,
  pub pending_tokens: Decimal,
  /// Always finite and non-negative
  pub pending_utilization: Decimal,
}
