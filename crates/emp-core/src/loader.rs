//! Position snapshot loader
//! Maps collaborator records into a `PositionSnapshot`. No business rules live here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::math::{clamp_non_negative, compute_utilization};
use crate::state::{Action, Approvals, EngineSettings, PositionSnapshot, WithdrawalRequest};

/// Raw sponsor record as read from the contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorPosition {
  pub tokens_outstanding: Decimal,
  pub raw_collateral: Decimal,
  #[serde(default)]
  pub withdrawal_request_amount: Decimal,
  /// Unix seconds; 0 when no request was ever made
  #[serde(default)]
  pub withdrawal_request_pass_timestamp: i64,
}

/// Per-synth market parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketData {
  pub global_utilization: Decimal,
  pub liquidation_point: Decimal,
  pub min_tokens: Decimal,
  pub token_price: Decimal,
  #[serde(default)]
  pub is_expired: bool,
  #[serde(default)]
  pub withdrawal_period_minutes: Option<i64>,
}

/// Read side of the contract, market-data, balance and allowance collaborators.
/// Implementations do their own async work before handing values over.
pub trait ChainReader {
  /// `Ok(None)` when the contract rejects the read with "no position"
  fn sponsor_position(&self, synth_id: &str) -> Result<Option<SponsorPosition>, EngineError>;

  /// `Ok(None)` while market data is still loading
  fn market_data(&self, synth_id: &str) -> Result<Option<MarketData>, EngineError>;

  fn wallet_balance(&self, token_address: &str) -> Result<Decimal, EngineError>;

  fn allowance(&self, token_address: &str, spender_address: &str) -> Result<bool, EngineError>;
}

/// Build a snapshot from collaborator records
///
/// # Arguments
/// * `sponsor` - Sponsor record, `None` when the caller has no position yet
/// * `market` - Market parameters, `None` while they are still loading
/// * `wallet_balance` - Collateral held in the caller's wallet
/// * `now` - Instant the snapshot is taken at
/// * `settings` - Rounding and the fallback withdrawal period
///
/// # Returns
/// The snapshot, or `EngineError::DataNotReady` when market data is absent
pub fn load(
  sponsor: Option<&SponsorPosition>,
  market: Option<&MarketData>,
  wallet_balance: Decimal,
  now: DateTime<Utc>,
  settings: &EngineSettings,
) -> Result<PositionSnapshot, EngineError> {
  let market = market.ok_or(EngineError::DataNotReady("market data"))?;

  let sponsor_collateral = sponsor
    .map(|s| non_negative("raw_collateral", s.raw_collateral))
    .unwrap_or(Decimal::ZERO);
  let sponsor_tokens = sponsor
    .map(|s| non_negative("tokens_outstanding", s.tokens_outstanding))
    .unwrap_or(Decimal::ZERO);
  let token_price = non_negative("token_price", market.token_price);

  let has_position = sponsor.is_some()
    && (sponsor_collateral > Decimal::ZERO || sponsor_tokens > Decimal::ZERO);

  let utilization = settings.rounding.calc(compute_utilization(
    sponsor_tokens,
    sponsor_collateral,
    token_price,
  ));

  let withdrawal_request = sponsor.and_then(|s| withdrawal_request_of(s, now));

  let snapshot = PositionSnapshot {
    sponsor_collateral,
    sponsor_tokens,
    utilization,
    global_utilization: non_negative("global_utilization", market.global_utilization),
    liquidation_point: non_negative("liquidation_point", market.liquidation_point),
    min_tokens: non_negative("min_tokens", market.min_tokens),
    max_collateral: non_negative("wallet_balance", wallet_balance),
    token_price,
    withdrawal_request,
    withdrawal_period_minutes: market
      .withdrawal_period_minutes
      .unwrap_or(settings.default_withdrawal_period_minutes)
      .max(0),
    is_expired: market.is_expired,
    has_position,
    loaded_at: now,
  };

  info!(
    collateral = %snapshot.sponsor_collateral,
    tokens = %snapshot.sponsor_tokens,
    utilization = %snapshot.utilization,
    has_position,
    expired = snapshot.is_expired,
    "position snapshot loaded"
  );

  Ok(snapshot)
}

/// Load through the collaborator trait. Allowances are read alongside.
pub fn load_from<R: ChainReader>(
  reader: &R,
  synth_id: &str,
  collateral_token: &str,
  synth_token: &str,
  spender: &str,
  now: DateTime<Utc>,
  settings: &EngineSettings,
) -> Result<(PositionSnapshot, Approvals), EngineError> {
  let market = reader.market_data(synth_id)?;
  let sponsor = reader.sponsor_position(synth_id)?;
  let wallet_balance = reader.wallet_balance(collateral_token)?;

  let snapshot = load(
    sponsor.as_ref(),
    market.as_ref(),
    wallet_balance,
    now,
    settings,
  )?;

  let approvals = Approvals {
    collateral: reader.allowance(collateral_token, spender)?,
    synth: reader.allowance(synth_token, spender)?,
  };

  Ok((snapshot, approvals))
}

/// Action selected when a position first loads
pub fn initial_action(snapshot: &PositionSnapshot) -> Action {
  if snapshot.has_position {
    Action::AddCollateral
  } else {
    Action::Mint
  }
}

fn withdrawal_request_of(sponsor: &SponsorPosition, now: DateTime<Utc>) -> Option<WithdrawalRequest> {
  if sponsor.withdrawal_request_amount <= Decimal::ZERO {
    return None;
  }

  let pass_timestamp =
    DateTime::<Utc>::from_timestamp(sponsor.withdrawal_request_pass_timestamp, 0)
      .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
  let request = WithdrawalRequest {
    amount: sponsor.withdrawal_request_amount,
    pass_timestamp,
  };

  debug!(
    amount = %request.amount,
    minutes_left = request.timer().minutes_left(now),
    "withdrawal request present"
  );

  Some(request)
}

fn non_negative(field: &'static str, value: Decimal) -> Decimal {
  if value < Decimal::ZERO {
    warn!(field, %value, "negative collaborator value clamped to zero");
  }
  clamp_non_negative(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn market() -> MarketData {
        MarketData {
            global_utilization: dec!(0.5),
            liquidation_point: dec!(0.8),
            min_tokens: dec!(5),
            token_price: dec!(1),
            is_expired: false,
            withdrawal_period_minutes: Some(60),
        }
    }

    #[test]
    fn test_missing_market_is_not_ready() {
        let result = load(None, None, dec!(10), now(), &EngineSettings::default());
        assert_eq!(result, Err(EngineError::DataNotReady("market data")));
    }

    #[test]
    fn test_no_position_defaults_to_mint() {
        let snapshot = load(None, Some(&market()), dec!(250), now(), &EngineSettings::default()).unwrap();
        assert_eq!(snapshot.sponsor_collateral, Decimal::ZERO);
        assert_eq!(snapshot.sponsor_tokens, Decimal::ZERO);
        assert_eq!(snapshot.utilization, Decimal::ZERO);
        assert_eq!(snapshot.max_collateral, dec!(250));
        assert!(!snapshot.has_position);
        assert_eq!(initial_action(&snapshot), Action::Mint);
    }

    #[test]
    fn test_existing_position_defaults_to_add_collateral() {
        let sponsor = SponsorPosition {
            tokens_outstanding: dec!(40),
            raw_collateral: dec!(100),
            withdrawal_request_amount: Decimal::ZERO,
            withdrawal_request_pass_timestamp: 0,
        };
        let snapshot = load(Some(&sponsor), Some(&market()), dec!(0), now(), &EngineSettings::default()).unwrap();
        assert_eq!(snapshot.utilization, dec!(0.4));
        assert!(snapshot.withdrawal_request.is_none());
        assert_eq!(snapshot.withdrawal_period_minutes, 60);
        assert_eq!(initial_action(&snapshot), Action::AddCollateral);
    }

    #[test]
    fn test_withdrawal_request_only_for_nonzero_amount() {
        let pass = now() + Duration::minutes(10);
        let sponsor = SponsorPosition {
            tokens_outstanding: dec!(40),
            raw_collateral: dec!(100),
            withdrawal_request_amount: dec!(20),
            withdrawal_request_pass_timestamp: pass.timestamp(),
        };
        let snapshot = load(Some(&sponsor), Some(&market()), dec!(0), now(), &EngineSettings::default()).unwrap();
        let request = snapshot.withdrawal_request.unwrap();
        assert_eq!(request.amount, dec!(20));
        assert_eq!(snapshot.withdrawal_minutes_left(now()), Some(10));
        assert_eq!(snapshot.effective_collateral(), dec!(80));
    }

    #[test]
    fn test_elapsed_request_is_kept() {
        let pass = now() - Duration::minutes(3);
        let sponsor = SponsorPosition {
            tokens_outstanding: dec!(40),
            raw_collateral: dec!(100),
            withdrawal_request_amount: dec!(20),
            withdrawal_request_pass_timestamp: pass.timestamp(),
        };
        let snapshot = load(Some(&sponsor), Some(&market()), dec!(0), now(), &EngineSettings::default()).unwrap();
        assert!(snapshot.withdrawal_request.is_some());
        assert_eq!(snapshot.withdrawal_minutes_left(now()), Some(0));
        assert!(snapshot.withdrawal_passed(now()));
    }

    #[test]
    fn test_negative_inputs_are_clamped() {
        let sponsor = SponsorPosition {
            tokens_outstanding: dec!(-1),
            raw_collateral: dec!(-5),
            withdrawal_request_amount: Decimal::ZERO,
            withdrawal_request_pass_timestamp: 0,
        };
        let snapshot = load(Some(&sponsor), Some(&market()), dec!(-3), now(), &EngineSettings::default()).unwrap();
        assert_eq!(snapshot.sponsor_collateral, Decimal::ZERO);
        assert_eq!(snapshot.sponsor_tokens, Decimal::ZERO);
        assert_eq!(snapshot.max_collateral, Decimal::ZERO);
        assert!(!snapshot.has_position);
    }

    #[test]
    fn test_missing_period_uses_default() {
        let mut market = market();
        market.withdrawal_period_minutes = None;
        let settings = EngineSettings {
            default_withdrawal_period_minutes: 90,
            ..EngineSettings::default()
        };
        let snapshot = load(None, Some(&market), dec!(0), now(), &settings).unwrap();
        assert_eq!(snapshot.withdrawal_period_minutes, 90);
    }

    struct StubReader {
        market: Option<MarketData>,
    }

    impl ChainReader for StubReader {
        fn sponsor_position(&self, _synth_id: &str) -> Result<Option<SponsorPosition>, EngineError> {
            Ok(None)
        }

        fn market_data(&self, _synth_id: &str) -> Result<Option<MarketData>, EngineError> {
            Ok(self.market.clone())
        }

        fn wallet_balance(&self, _token_address: &str) -> Result<Decimal, EngineError> {
            Ok(dec!(42))
        }

        fn allowance(&self, token_address: &str, _spender_address: &str) -> Result<bool, EngineError> {
            Ok(token_address == "collateral")
        }
    }

    #[test]
    fn test_load_from_reader() {
        let reader = StubReader { market: Some(market()) };
        let (snapshot, approvals) = load_from(
            &reader,
            "synth",
            "collateral",
            "synth-token",
            "emp",
            now(),
            &EngineSettings::default(),
        )
        .unwrap();
        assert_eq!(snapshot.max_collateral, dec!(42));
        assert!(approvals.collateral);
        assert!(!approvals.synth);
    }

    #[test]
    fn test_load_from_reader_not_ready() {
        let reader = StubReader { market: None };
        let result = load_from(
            &reader,
            "synth",
            "collateral",
            "synth-token",
            "emp",
            now(),
            &EngineSettings::default(),
        );
        assert!(matches!(result, Err(EngineError::DataNotReady(_))));
    }
}
