//! Scenario replay
//! A scenario is a starting position plus a list of user steps. Each step is
//! fed through a `PositionSession` and the resulting view is recorded.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use emp_core::actions::RequestWithdrawalPrompt;
use emp_core::{
  Action, Approvals, Availability, Deltas, EngineSettings, MarketData, Maximum, PendingEdit,
  PendingField, PositionSession, SessionEvent, SponsorPosition, WithdrawRoute,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
  pub now: DateTime<Utc>,
  #[serde(default)]
  pub wallet_balance: Decimal,
  #[serde(default)]
  pub sponsor: Option<SponsorPosition>,
  #[serde(default)]
  pub market: Option<MarketData>,
  #[serde(default)]
  pub approvals: Approvals,
  #[serde(default)]
  pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
  Select { action: Action },
  Edit { field: PendingField, value: Decimal },
  EditText { field: PendingField, text: String },
  Tick { now: DateTime<Utc> },
  Approvals { collateral: bool, synth: bool },
  /// Hand the selected action to the wallet if it is enabled
  Submit,
  Settled,
  Refresh {
    now: DateTime<Utc>,
    #[serde(default)]
    wallet_balance: Decimal,
    #[serde(default)]
    sponsor: Option<SponsorPosition>,
    #[serde(default)]
    market: Option<MarketData>,
  },
}

impl Step {
  fn name(&self) -> &'static str {
    match self {
      Step::Select { .. } => "select",
      Step::Edit { .. } => "edit",
      Step::EditText { .. } => "edit_text",
      Step::Tick { .. } => "tick",
      Step::Approvals { .. } => "approvals",
      Step::Submit => "submit",
      Step::Settled => "settled",
      Step::Refresh { .. } => "refresh",
    }
  }
}

/// What a view would render after a step
#[derive(Debug, Clone, Serialize)]
pub struct View {
  pub step: &'static str,
  pub ready: bool,
  pub action: Action,
  pub waiting: bool,
  pub pending: PendingEdit,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub deltas: Option<Deltas>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub maximum: Option<Maximum>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub liquidation_price: Option<Decimal>,
  pub availability: BTreeMap<Action, Availability>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub withdraw_route: Option<WithdrawRoute>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub withdrawal_minutes_left: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub request_prompt: Option<RequestWithdrawalPrompt>,
  pub issues: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub rejected: Option<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub events: Vec<SessionEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
  pub views: Vec<View>,
}

/// Replay `scenario` and collect one view per step, plus the initial one
pub fn replay(scenario: &Scenario, settings: EngineSettings, with_events: bool) -> Result<Report> {
  let mut session = PositionSession::new(settings);
  let mut views = Vec::with_capacity(scenario.steps.len() + 1);

  session.set_approvals(scenario.approvals);
  if let Err(e) = session.initialize(
    scenario.sponsor.as_ref(),
    scenario.market.as_ref(),
    scenario.wallet_balance,
    scenario.now,
  ) {
    warn!(error = %e, "scenario starts without a snapshot");
  }
  views.push(view(&mut session, "initialize", None, with_events));

  for step in &scenario.steps {
    let rejected = apply(&mut session, step)?;
    views.push(view(&mut session, step.name(), rejected, with_events));
  }

  info!(steps = scenario.steps.len(), "scenario replayed");
  Ok(Report { views })
}

fn apply(session: &mut PositionSession, step: &Step) -> Result<Option<String>> {
  match step {
    Step::Select { action } => {
      session.select_action(*action);
    }
    Step::Edit { field, value } => {
      if let Err(e) = session.edit_pending(*field, *value) {
        return Ok(Some(e.to_string()));
      }
    }
    Step::EditText { field, text } => {
      if let Err(e) = session.edit_pending_text(*field, text) {
        return Ok(Some(e.to_string()));
      }
    }
    Step::Tick { now } => session.tick(*now),
    Step::Approvals { collateral, synth } => session.set_approvals(Approvals {
      collateral: *collateral,
      synth: *synth,
    }),
    Step::Submit => {
      if session.is_waiting() {
        bail!("submit while a transaction is still waiting");
      }
      let action = session.selected_action();
      match session.availability(action) {
        Availability::Enabled => session.begin_transaction(),
        Availability::NeedsApproval(kind) => {
          return Ok(Some(format!("{action} needs the {kind:?} approval first")));
        }
        Availability::Disabled => {
          let reason = session
            .ineligibility(action)
            .map(|e| e.to_string())
            .unwrap_or_else(|| format!("{action} is disabled"));
          return Ok(Some(reason));
        }
      }
    }
    Step::Settled => session.transaction_settled(),
    Step::Refresh {
      now,
      wallet_balance,
      sponsor,
      market,
    } => {
      if let Err(e) = session.initialize(sponsor.as_ref(), market.as_ref(), *wallet_balance, *now) {
        return Ok(Some(e.to_string()));
      }
    }
  }
  Ok(None)
}

fn view(session: &mut PositionSession, step: &'static str, rejected: Option<String>, with_events: bool) -> View {
  let availability = Action::ALL
    .iter()
    .map(|action| (*action, session.availability(*action)))
    .collect();
  let events = session.take_events();

  View {
    step,
    ready: session.is_ready(),
    action: session.selected_action(),
    waiting: session.is_waiting(),
    pending: *session.pending(),
    deltas: session.deltas().ok(),
    maximum: session.compute_maximum().ok(),
    liquidation_price: session.liquidation_price(),
    availability,
    withdraw_route: session.route_withdrawal(),
    withdrawal_minutes_left: session.withdrawal_minutes_left(),
    request_prompt: session.request_withdrawal_prompt(),
    issues: session.validate().iter().map(|e| e.to_string()).collect(),
    rejected,
    events: if with_events { events } else { Vec::new() },
  }
}
