//! Pending position calculator
//! Every value leaving this module is rounded and non-negative

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EngineError;
use crate::invariants::{
  assert_below_liquidation_point, assert_collateral_backs_tokens, assert_min_tokens_floor,
  assert_within_global_utilization, assert_within_wallet_balance,
};
use crate::math::{
  clamp_non_negative, compute_utilization, liquidation_price, proportional_collateral,
  safe_div, RoundingPolicy,
};
use crate::state::{Action, Deltas, PendingEdit, PendingField, PositionSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recomputed {
  pub pending_utilization: Decimal,
  pub deltas: Deltas,
}

/// GCR-aligned ceiling offered by a "maximum" affordance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maximum {
  pub collateral: Decimal,
  pub tokens: Decimal,
}

/// Recompute utilization and deltas for a proposed position
///
/// # Arguments
/// * `snapshot` - Current sponsor position and market
/// * `pending_collateral` - Proposed resulting collateral
/// * `pending_tokens` - Proposed resulting tokens
/// * `policy` - Rounding policy
///
/// # Returns
/// Utilization (0 when collateral is 0) and the net movement from the sponsor position
pub fn recompute(
  snapshot: &PositionSnapshot,
  pending_collateral: Decimal,
  pending_tokens: Decimal,
  policy: &RoundingPolicy,
) -> Recomputed {
  let pending_collateral = policy.calc(clamp_non_negative(pending_collateral));
  let pending_tokens = policy.calc(clamp_non_negative(pending_tokens));

  let pending_utilization = policy.calc(compute_utilization(
    pending_tokens,
    pending_collateral,
    snapshot.token_price,
  ));

  let deltas = Deltas {
    collateral: policy.calc(pending_collateral - snapshot.sponsor_collateral),
    tokens: policy.calc(pending_tokens - snapshot.sponsor_tokens),
  };

  Recomputed {
    pending_utilization,
    deltas,
  }
}

/// Build a pending edit from raw legs
pub fn pending_edit(
  snapshot: &PositionSnapshot,
  pending_collateral: Decimal,
  pending_tokens: Decimal,
  policy: &RoundingPolicy,
) -> PendingEdit {
  let recomputed = recompute(snapshot, pending_collateral, pending_tokens, policy);

  PendingEdit {
    pending_collateral: policy.calc(clamp_non_negative(pending_collateral)),
    pending_tokens: policy.calc(clamp_non_negative(pending_tokens)),
    pending_utilization: recomputed.pending_utilization,
  }
}

/// Net movement from the sponsor position to `pending`
pub fn deltas_of(snapshot: &PositionSnapshot, pending: &PendingEdit, policy: &RoundingPolicy) -> Deltas {
  recompute(snapshot, pending.pending_collateral, pending.pending_tokens, policy).deltas
}

/// Pending edit mirroring the snapshot, with any outstanding withdrawal
/// request already taken off the collateral leg
pub fn reset_pending(snapshot: &PositionSnapshot, policy: &RoundingPolicy) -> PendingEdit {
  pending_edit(
    snapshot,
    snapshot.effective_collateral(),
    snapshot.sponsor_tokens,
    policy,
  )
}

/// Collateral left after redeeming down to `pending_tokens`.
/// Scales the exact sponsor legs, not the rounded utilization, so the ratio holds
/// for positions whose utilization rounds to 0.
pub fn redeem_collateral(
  snapshot: &PositionSnapshot,
  pending_tokens: Decimal,
  policy: &RoundingPolicy,
) -> Decimal {
  policy.calc(proportional_collateral(
    snapshot.sponsor_collateral,
    snapshot.sponsor_tokens,
    pending_tokens,
  ))
}

/// Apply one field edit under the rules of the selected action.
/// Redeem keeps the collateralization ratio: tokens drive, collateral follows.
pub fn apply_edit(
  snapshot: &PositionSnapshot,
  action: Action,
  current: &PendingEdit,
  field: PendingField,
  value: Decimal,
  policy: &RoundingPolicy,
) -> PendingEdit {
  let value = policy.calc(clamp_non_negative(value));

  let (collateral, tokens) = match (action, field) {
    (Action::Redeem, PendingField::Tokens) => (redeem_collateral(snapshot, value, policy), value),
    (Action::Redeem, PendingField::Collateral) => {
      debug!("collateral is derived while redeeming, edit ignored");
      (current.pending_collateral, current.pending_tokens)
    }
    (_, PendingField::Collateral) => (value, current.pending_tokens),
    (_, PendingField::Tokens) => (current.pending_collateral, value),
  };

  pending_edit(snapshot, collateral, tokens, policy)
}

/// Re-derive an existing edit against a fresh snapshot, keeping the user's legs
pub fn rebase_pending(
  snapshot: &PositionSnapshot,
  action: Action,
  current: &PendingEdit,
  policy: &RoundingPolicy,
) -> PendingEdit {
  let collateral = if action == Action::Redeem {
    redeem_collateral(snapshot, current.pending_tokens, policy)
  } else {
    current.pending_collateral
  };

  pending_edit(snapshot, collateral, current.pending_tokens, policy)
}

/// Maximum collateral (wallet plus locked) and the tokens it supports at the
/// global utilization. Not a liquidation-safe bound.
pub fn compute_maximum(snapshot: &PositionSnapshot, policy: &RoundingPolicy) -> Maximum {
  let collateral = snapshot
    .max_collateral
    .checked_add(snapshot.sponsor_collateral)
    .unwrap_or(Decimal::MAX);
  let tokens = collateral
    .checked_mul(safe_div(snapshot.global_utilization, snapshot.token_price))
    .unwrap_or(Decimal::ZERO);

  Maximum {
    collateral: policy.display(collateral),
    tokens: policy.display(clamp_non_negative(tokens)),
  }
}

/// Token price at which the pending position would hit the liquidation point
pub fn pending_liquidation_price(
  snapshot: &PositionSnapshot,
  pending: &PendingEdit,
  policy: &RoundingPolicy,
) -> Decimal {
  policy.calc(liquidation_price(
    pending.pending_collateral,
    pending.pending_tokens,
    snapshot.liquidation_point,
  ))
}

/// Every rule the pending position currently breaks, for display.
/// Utilization limits only apply to edits that add debt or remove collateral.
pub fn validate(snapshot: &PositionSnapshot, pending: &PendingEdit, deltas: &Deltas) -> Vec<EngineError> {
  let mut issues = Vec::new();

  if let Err(e) = assert_min_tokens_floor(pending.pending_tokens, snapshot.min_tokens) {
    issues.push(e);
  }
  if let Err(e) = assert_collateral_backs_tokens(pending.pending_collateral, pending.pending_tokens) {
    issues.push(e);
  }

  let adds_risk = deltas.tokens > Decimal::ZERO || deltas.collateral < Decimal::ZERO;
  if adds_risk {
    if let Err(e) = assert_within_global_utilization(pending.pending_utilization, snapshot.global_utilization) {
      issues.push(e);
    }
    if let Err(e) = assert_below_liquidation_point(pending.pending_utilization, snapshot.liquidation_point) {
      issues.push(e);
    }
  }

  if let Err(e) = assert_within_wallet_balance(deltas.collateral, snapshot.max_collateral) {
    issues.push(e);
  }

  issues
}
