//! Position session
//! The surface the view layer talks to. Every mutation goes through `reduce`;
//! the query methods read the current state and never mutate it.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::actions::{request_withdrawal, Availability, RequestWithdrawalPrompt, WithdrawRoute};
use crate::calculator::{self, Maximum};
use crate::constants::MAX_BUFFERED_EVENTS;
use crate::error::EngineError;
use crate::events::SessionEvent;
use crate::loader::{self, ChainReader, MarketData, SponsorPosition};
use crate::math::collateralization_ratio;
use crate::reducer::{reduce, Command, SessionState};
use crate::state::{Action, Approvals, Deltas, EngineSettings, PendingEdit, PendingField, PositionSnapshot};

/// Result of a pending edit, as handed back to the view layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditOutcome {
  pub pending: PendingEdit,
  pub pending_utilization: Decimal,
  pub deltas: Deltas,
  pub enabled_actions: BTreeSet<Action>,
}

#[derive(Debug, Clone)]
pub struct PositionSession {
  state: SessionState,
  /// Events since the last `take_events`. Every event is also logged, so
  /// callers that never drain lose only the oldest buffered copies.
  events: Vec<SessionEvent>,
}

impl Default for PositionSession {
  fn default() -> Self {
    Self::new(EngineSettings::default())
  }
}

impl PositionSession {
  pub fn new(settings: EngineSettings) -> Self {
    Self {
      state: SessionState::new(settings),
      events: Vec::new(),
    }
  }

  pub fn state(&self) -> &SessionState {
    &self.state
  }

  pub fn is_ready(&self) -> bool {
    self.state.is_ready()
  }

  pub fn snapshot(&self) -> Option<&PositionSnapshot> {
    self.state.snapshot.as_ref()
  }

  pub fn selected_action(&self) -> Action {
    self.state.action
  }

  pub fn pending(&self) -> &PendingEdit {
    &self.state.pending
  }

  /// Run one command through the reducer
  pub fn dispatch(&mut self, command: Command) {
    debug!(command = command.name(), "dispatch");
    let (next, events) = reduce(&self.state, command);
    for event in &events {
      event.log();
    }
    self.state = next;
    self.events.extend(events);

    if self.events.len() > MAX_BUFFERED_EVENTS {
      let overflow = self.events.len() - MAX_BUFFERED_EVENTS;
      self.events.drain(..overflow);
    }
  }

  /// Drain the events produced since the last call. At most
  /// `MAX_BUFFERED_EVENTS` are kept between drains.
  pub fn take_events(&mut self) -> Vec<SessionEvent> {
    std::mem::take(&mut self.events)
  }

  /// Load a snapshot from collaborator records and make it current.
  /// Missing market data leaves the session not ready.
  pub fn initialize(
    &mut self,
    sponsor: Option<&SponsorPosition>,
    market: Option<&MarketData>,
    wallet_balance: Decimal,
    now: DateTime<Utc>,
  ) -> Result<&PositionSnapshot, EngineError> {
    let snapshot = loader::load(sponsor, market, wallet_balance, now, &self.state.settings)?;
    self.refresh(snapshot);
    self.snapshot().ok_or(EngineError::DataNotReady("position snapshot"))
  }

  /// Same as `initialize`, reading through a `ChainReader`; approvals are refreshed too
  pub fn initialize_from<R: ChainReader>(
    &mut self,
    reader: &R,
    synth_id: &str,
    collateral_token: &str,
    synth_token: &str,
    spender: &str,
    now: DateTime<Utc>,
  ) -> Result<&PositionSnapshot, EngineError> {
    let (snapshot, approvals) = loader::load_from(
      reader,
      synth_id,
      collateral_token,
      synth_token,
      spender,
      now,
      &self.state.settings,
    )?;
    self.set_approvals(approvals);
    self.refresh(snapshot);
    self.snapshot().ok_or(EngineError::DataNotReady("position snapshot"))
  }

  pub fn refresh(&mut self, snapshot: PositionSnapshot) {
    self.dispatch(Command::RefreshSnapshot(snapshot));
  }

  pub fn select_action(&mut self, action: Action) -> PendingEdit {
    self.dispatch(Command::ChangeAction(action));
    self.state.pending
  }

  pub fn edit_pending(&mut self, field: PendingField, value: Decimal) -> Result<EditOutcome, EngineError> {
    self.dispatch(Command::EditPending { field, value });
    self.outcome()
  }

  pub fn edit_pending_text(&mut self, field: PendingField, text: &str) -> Result<EditOutcome, EngineError> {
    self.dispatch(Command::EditPendingText {
      field,
      text: text.to_string(),
    });
    self.outcome()
  }

  pub fn tick(&mut self, now: DateTime<Utc>) {
    self.dispatch(Command::Tick(now));
  }

  pub fn set_approvals(&mut self, approvals: Approvals) {
    self.dispatch(Command::SetApprovals(approvals));
  }

  /// The caller handed a transaction to the wallet collaborator
  pub fn begin_transaction(&mut self) {
    self.dispatch(Command::SetWaiting(true));
  }

  /// The collaborator's promise settled; the outcome is not interpreted
  pub fn transaction_settled(&mut self) {
    self.dispatch(Command::TransactionSettled);
  }

  pub fn is_waiting(&self) -> bool {
    self.state.waiting
  }

  pub fn compute_maximum(&self) -> Result<Maximum, EngineError> {
    let snapshot = self.ready_snapshot()?;
    Ok(calculator::compute_maximum(snapshot, &self.state.settings.rounding))
  }

  pub fn deltas(&self) -> Result<Deltas, EngineError> {
    let snapshot = self.ready_snapshot()?;
    Ok(calculator::deltas_of(snapshot, &self.state.pending, &self.state.settings.rounding))
  }

  /// False while not ready; the caller must not submit a disabled action
  pub fn is_action_enabled(&self, action: Action) -> bool {
    self
      .state
      .eligibility()
      .map(|ctx| ctx.is_enabled(action))
      .unwrap_or(false)
  }

  pub fn availability(&self, action: Action) -> Availability {
    self
      .state
      .eligibility()
      .map(|ctx| ctx.availability(action))
      .unwrap_or(Availability::Disabled)
  }

  /// Why `action` is not offered, if it is not
  pub fn ineligibility(&self, action: Action) -> Option<EngineError> {
    match self.state.eligibility() {
      Some(ctx) => ctx.check(action).err(),
      None => Some(EngineError::DataNotReady("position snapshot")),
    }
  }

  pub fn enabled_actions(&self) -> BTreeSet<Action> {
    self
      .state
      .eligibility()
      .map(|ctx| ctx.enabled_actions())
      .unwrap_or_default()
  }

  pub fn route_withdrawal(&self) -> Option<WithdrawRoute> {
    self.state.eligibility().map(|ctx| ctx.route_withdrawal())
  }

  pub fn withdrawal_minutes_left(&self) -> Option<i64> {
    self.snapshot()?.withdrawal_minutes_left(self.state.now)
  }

  pub fn request_withdrawal_prompt(&self) -> Option<RequestWithdrawalPrompt> {
    let ctx = self.state.eligibility()?;
    request_withdrawal::prompt(&ctx)
  }

  /// Rules the pending position breaks, for display next to the inputs
  pub fn validate(&self) -> Vec<EngineError> {
    match self.snapshot() {
      Some(snapshot) => {
        let deltas = calculator::deltas_of(snapshot, &self.state.pending, &self.state.settings.rounding);
        calculator::validate(snapshot, &self.state.pending, &deltas)
      }
      None => vec![EngineError::DataNotReady("position snapshot")],
    }
  }

  pub fn liquidation_price(&self) -> Option<Decimal> {
    let snapshot = self.snapshot()?;
    Some(calculator::pending_liquidation_price(
      snapshot,
      &self.state.pending,
      &self.state.settings.rounding,
    ))
  }

  pub fn pending_collateralization_ratio(&self) -> Decimal {
    self
      .state
      .settings
      .rounding
      .calc(collateralization_ratio(self.state.pending.pending_utilization))
  }

  fn ready_snapshot(&self) -> Result<&PositionSnapshot, EngineError> {
    self.snapshot().ok_or(EngineError::DataNotReady("position snapshot"))
  }

  fn outcome(&self) -> Result<EditOutcome, EngineError> {
    let deltas = self.deltas()?;
    Ok(EditOutcome {
      pending: self.state.pending,
      pending_utilization: self.state.pending.pending_utilization,
      deltas,
      enabled_actions: self.enabled_actions(),
    })
  }
}
