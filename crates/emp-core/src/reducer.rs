//! Session reducer
//! `reduce` is the single chokepoint for every session transition:
//! (state, command) -> (new state, events). It never fails and never panics.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::actions::EligibilityContext;
use crate::calculator::{apply_edit, rebase_pending, reset_pending};
use crate::events::SessionEvent;
use crate::loader::initial_action;
use crate::math::parse_amount;
use crate::state::{Action, Approvals, EngineSettings, PendingEdit, PendingField, PositionSnapshot};

/// Inputs the session reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  /// A fresh snapshot from the loader (new block, account or synth switch)
  RefreshSnapshot(PositionSnapshot),
  ChangeAction(Action),
  EditPending { field: PendingField, value: Decimal },
  /// Raw keystrokes; unparseable text counts as 0
  EditPendingText { field: PendingField, text: String },
  Tick(DateTime<Utc>),
  SetApprovals(Approvals),
  SetWaiting(bool),
  /// The collaborator's transaction promise settled, success or not
  TransactionSettled,
}

impl Command {
  pub fn name(&self) -> &'static str {
    match self {
      Command::RefreshSnapshot(_) => "refresh_snapshot",
      Command::ChangeAction(_) => "change_action",
      Command::EditPending { .. } => "edit_pending",
      Command::EditPendingText { .. } => "edit_pending_text",
      Command::Tick(_) => "tick",
      Command::SetApprovals(_) => "set_approvals",
      Command::SetWaiting(_) => "set_waiting",
      Command::TransactionSettled => "transaction_settled",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
  /// `None` until the first snapshot arrives
  pub snapshot: Option<PositionSnapshot>,
  pub action: Action,
  pub pending: PendingEdit,
  pub approvals: Approvals,
  pub now: DateTime<Utc>,
  pub waiting: bool,
  pub settings: EngineSettings,
}

impl SessionState {
  pub fn new(settings: EngineSettings) -> Self {
    Self {
      snapshot: None,
      action: Action::Mint,
      pending: PendingEdit::default(),
      approvals: Approvals::default(),
      now: DateTime::<Utc>::UNIX_EPOCH,
      waiting: false,
      settings,
    }
  }

  pub fn is_ready(&self) -> bool {
    self.snapshot.is_some()
  }

  pub fn eligibility(&self) -> Option<EligibilityContext<'_>> {
    let snapshot = self.snapshot.as_ref()?;
    Some(EligibilityContext::new(
      snapshot,
      &self.pending,
      self.approvals,
      self.now,
      &self.settings.rounding,
    ))
  }
}

pub fn reduce(state: &SessionState, command: Command) -> (SessionState, Vec<SessionEvent>) {
  let mut next = state.clone();
  let mut events = Vec::new();
  let policy = state.settings.rounding;

  match command {
    Command::RefreshSnapshot(snapshot) => {
      let first_load = state.snapshot.is_none();
      if snapshot.loaded_at > next.now {
        next.now = snapshot.loaded_at;
      }

      events.push(SessionEvent::SnapshotRefreshed {
        collateral: snapshot.sponsor_collateral,
        tokens: snapshot.sponsor_tokens,
        utilization: snapshot.utilization,
        first_load,
      });

      if first_load {
        let action = initial_action(&snapshot);
        if action != state.action {
          events.push(SessionEvent::ActionChanged {
            from: state.action,
            to: action,
          });
        }
        next.action = action;
        next.pending = reset_pending(&snapshot, &policy);
        events.push(reset_event(action, &next.pending));
      } else {
        next.pending = rebase_pending(&snapshot, next.action, &state.pending, &policy);
      }

      next.snapshot = Some(snapshot);
    }

    Command::ChangeAction(action) => {
      if state.action != action {
        events.push(SessionEvent::ActionChanged {
          from: state.action,
          to: action,
        });
      }
      next.action = action;

      match &state.snapshot {
        Some(snapshot) => {
          next.pending = reset_pending(snapshot, &policy);
          events.push(reset_event(action, &next.pending));
        }
        None => {
          next.pending = PendingEdit::default();
          events.push(SessionEvent::NotReady {
            command: "change_action",
          });
        }
      }
    }

    Command::EditPending { field, value } => {
      edit(state, &mut next, &mut events, field, value);
    }

    Command::EditPendingText { field, text } => {
      let value = parse_amount(&text);
      if value.is_zero() && !is_zero_literal(&text) {
        events.push(SessionEvent::InputClamped {
          field,
          raw: text.clone(),
        });
      }
      edit(state, &mut next, &mut events, field, value);
    }

    Command::Tick(now) => {
      next.now = now;
      events.push(SessionEvent::ClockAdvanced { now });
    }

    Command::SetApprovals(approvals) => {
      next.approvals = approvals;
      events.push(SessionEvent::ApprovalsUpdated { approvals });
    }

    Command::SetWaiting(waiting) => {
      next.waiting = waiting;
      events.push(SessionEvent::WaitingChanged { waiting });
    }

    Command::TransactionSettled => {
      next.waiting = false;
      events.push(SessionEvent::TransactionSettled);
      if let Some(snapshot) = &state.snapshot {
        next.pending = reset_pending(snapshot, &policy);
        events.push(reset_event(next.action, &next.pending));
      }
    }
  }

  (next, events)
}

fn edit(
  state: &SessionState,
  next: &mut SessionState,
  events: &mut Vec<SessionEvent>,
  field: PendingField,
  value: Decimal,
) {
  let Some(snapshot) = &state.snapshot else {
    events.push(SessionEvent::NotReady {
      command: "edit_pending",
    });
    return;
  };

  if value < Decimal::ZERO {
    events.push(SessionEvent::InputClamped {
      field,
      raw: value.to_string(),
    });
  }

  next.pending = apply_edit(
    snapshot,
    state.action,
    &state.pending,
    field,
    value,
    &state.settings.rounding,
  );

  events.push(SessionEvent::PendingRecomputed {
    field,
    collateral: next.pending.pending_collateral,
    tokens: next.pending.pending_tokens,
    utilization: next.pending.pending_utilization,
  });
}

fn reset_event(action: Action, pending: &PendingEdit) -> SessionEvent {
  SessionEvent::PendingReset {
    action,
    collateral: pending.pending_collateral,
    tokens: pending.pending_tokens,
  }
}

/// A cleared field or a typed zero is not a clamp
fn is_zero_literal(text: &str) -> bool {
  let trimmed = text.trim();
  trimmed.is_empty() || trimmed.parse::<Decimal>().map(|v| v.is_zero()).unwrap_or(false)
}
