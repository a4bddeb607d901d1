use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::state::{Action, Approvals, PendingField};

/// Observable outcome of a reducer step. Data only; the session logs them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
  SnapshotRefreshed {
    collateral: Decimal,
    tokens: Decimal,
    utilization: Decimal,
    first_load: bool,
  },
  ActionChanged {
    from: Action,
    to: Action,
  },
  PendingReset {
    action: Action,
    collateral: Decimal,
    tokens: Decimal,
  },
  PendingRecomputed {
    field: PendingField,
    collateral: Decimal,
    tokens: Decimal,
    utilization: Decimal,
  },
  InputClamped {
    field: PendingField,
    raw: String,
  },
  ClockAdvanced {
    now: DateTime<Utc>,
  },
  ApprovalsUpdated {
    approvals: Approvals,
  },
  WaitingChanged {
    waiting: bool,
  },
  TransactionSettled,
  NotReady {
    command: &'static str,
  },
}

impl SessionEvent {
  pub fn log(&self) {
    match self {
      SessionEvent::SnapshotRefreshed { collateral, tokens, utilization, first_load } => info!(
        %collateral,
        %tokens,
        %utilization,
        first_load,
        "snapshot refreshed"
      ),
      SessionEvent::ActionChanged { from, to } => info!(%from, %to, "action changed"),
      SessionEvent::PendingReset { action, collateral, tokens } => {
        debug!(%action, %collateral, %tokens, "pending edit reset")
      }
      SessionEvent::PendingRecomputed { field, collateral, tokens, utilization } => debug!(
        ?field,
        %collateral,
        %tokens,
        %utilization,
        "pending edit recomputed"
      ),
      SessionEvent::InputClamped { field, raw } => debug!(?field, raw = %raw, "input clamped to zero"),
      SessionEvent::ClockAdvanced { now } => debug!(%now, "clock advanced"),
      SessionEvent::ApprovalsUpdated { approvals } => info!(
        collateral = approvals.collateral,
        synth = approvals.synth,
        "approvals updated"
      ),
      SessionEvent::WaitingChanged { waiting } => debug!(waiting, "waiting changed"),
      SessionEvent::TransactionSettled => info!("transaction settled"),
      SessionEvent::NotReady { command } => debug!(command, "ignored, snapshot not loaded"),
    }
  }
}
