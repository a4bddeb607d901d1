use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use emp_core::calculator::{pending_edit, recompute};
use emp_core::{
    Action, Approvals, EligibilityContext, EngineError, EngineSettings, MarketData, PendingField,
    PositionSession, PositionSnapshot, RoundingPolicy, SponsorPosition, WithdrawRoute,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn market(min_tokens: Decimal) -> MarketData {
    MarketData {
        global_utilization: dec!(0.5),
        liquidation_point: dec!(0.8),
        min_tokens,
        token_price: dec!(1),
        is_expired: false,
        withdrawal_period_minutes: None,
    }
}

fn sponsor(collateral: Decimal, tokens: Decimal) -> SponsorPosition {
    SponsorPosition {
        tokens_outstanding: tokens,
        raw_collateral: collateral,
        withdrawal_request_amount: Decimal::ZERO,
        withdrawal_request_pass_timestamp: 0,
    }
}

fn session_with(sponsor: &SponsorPosition, market: &MarketData) -> PositionSession {
    let mut session = PositionSession::new(EngineSettings::default());
    session
        .initialize(Some(sponsor), Some(market), dec!(1000), now())
        .unwrap();
    session.set_approvals(Approvals::granted());
    session
}

fn snapshot(collateral: Decimal, tokens: Decimal, min_tokens: Decimal) -> PositionSnapshot {
    emp_core::loader::load(
        Some(&sponsor(collateral, tokens)),
        Some(&market(min_tokens)),
        dec!(1000),
        now(),
        &EngineSettings::default(),
    )
    .unwrap()
}

#[test]
fn scenario_a_mint_above_global_utilization_is_disabled() {
    let mut session = session_with(&sponsor(dec!(100), dec!(40)), &market(dec!(5)));
    session.select_action(Action::Mint);
    session.edit_pending(PendingField::Collateral, dec!(100)).unwrap();
    let outcome = session.edit_pending(PendingField::Tokens, dec!(60)).unwrap();

    assert_eq!(outcome.pending_utilization, dec!(0.6));
    assert!(!outcome.enabled_actions.contains(&Action::Mint));
    assert_eq!(
        session.ineligibility(Action::Mint),
        Some(EngineError::AboveGlobalUtilization {
            utilization: dec!(0.6),
            limit: dec!(0.5),
        })
    );
}

#[test]
fn scenario_b_mint_within_global_utilization_is_enabled() {
    let mut session = session_with(&sponsor(dec!(100), dec!(40)), &market(dec!(5)));
    session.select_action(Action::Mint);
    let outcome = session.edit_pending(PendingField::Tokens, dec!(45)).unwrap();

    assert_eq!(outcome.pending_utilization, dec!(0.45));
    assert!(outcome.enabled_actions.contains(&Action::Mint));
    assert_eq!(outcome.deltas.tokens, dec!(5));
    assert_eq!(outcome.deltas.collateral, Decimal::ZERO);
}

#[test]
fn scenario_c_running_request_can_only_be_cancelled() {
    let position = SponsorPosition {
        withdrawal_request_amount: dec!(20),
        withdrawal_request_pass_timestamp: (now() + Duration::minutes(10)).timestamp(),
        ..sponsor(dec!(100), dec!(40))
    };
    let session = session_with(&position, &market(dec!(5)));

    assert_eq!(session.withdrawal_minutes_left(), Some(10));
    assert!(session.is_action_enabled(Action::CancelWithdrawal));
    assert!(!session.is_action_enabled(Action::WithdrawPassedRequest));
    assert_eq!(session.pending().pending_collateral, dec!(80));
}

#[test]
fn scenario_d_repay_below_min_tokens_is_invalid() {
    let mut session = session_with(&sponsor(dec!(100), dec!(40)), &market(dec!(5)));
    session.select_action(Action::Repay);
    session.edit_pending(PendingField::Tokens, dec!(2)).unwrap();

    let floor = EngineError::BelowMinTokens {
        tokens: dec!(2),
        min_tokens: dec!(5),
    };
    assert!(!session.is_action_enabled(Action::Repay));
    assert_eq!(session.ineligibility(Action::Repay), Some(floor.clone()));
    assert!(session.validate().contains(&floor));
}

#[test]
fn withdrawal_at_065_routes_to_request() {
    let mut session = session_with(&sponsor(dec!(100), dec!(40)), &market(dec!(5)));
    session.select_action(Action::Withdraw);
    let outcome = session.edit_pending(PendingField::Collateral, dec!(61.5385)).unwrap();

    assert_eq!(outcome.pending_utilization, dec!(0.65));
    assert_eq!(session.route_withdrawal(), Some(WithdrawRoute::RequiresRequest));
    assert!(!outcome.enabled_actions.contains(&Action::Withdraw));
    assert!(outcome.enabled_actions.contains(&Action::RequestWithdrawal));
}

#[test]
fn redeem_half_of_overcollateralized_position_keeps_half_the_collateral() {
    let mut session = session_with(&sponsor(dec!(100000), dec!(1)), &market(dec!(0)));
    session.select_action(Action::Redeem);
    let outcome = session.edit_pending(PendingField::Tokens, dec!(0.5)).unwrap();

    assert_eq!(session.pending().pending_collateral, dec!(50000));
    assert_eq!(outcome.deltas.collateral, dec!(-50000));
}

fn xorshift64(seed: &mut u64) -> u64 {
    let mut x = *seed;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    *seed = x;
    x
}

fn rand_range(seed: &mut u64, lo: u64, hi: u64) -> u64 {
    if hi <= lo {
        return lo;
    }
    lo + (xorshift64(seed) % (hi - lo + 1))
}

/// Random amount with four decimal places in `[lo, hi]` whole units
fn rand_amount(seed: &mut u64, lo: u64, hi: u64) -> Decimal {
    Decimal::new(rand_range(seed, lo * 10_000, hi * 10_000) as i64, 4)
}

fn units(value: Decimal) -> u64 {
    (value * dec!(10000)).trunc().to_u64().unwrap_or(0)
}

#[test]
fn property_utilization_is_clamped() {
    let mut seed = 0x9E37_79B9_7F4A_7C15u64;
    let policy = RoundingPolicy::default();
    let snap = snapshot(dec!(100), dec!(40), dec!(5));

    for i in 0..2_000 {
        let tokens = rand_amount(&mut seed, 0, 1_000_000);
        let collateral = if i % 5 == 0 {
            Decimal::ZERO
        } else {
            rand_amount(&mut seed, 0, 1_000_000)
        };

        let r = recompute(&snap, collateral, tokens, &policy);
        assert!(r.pending_utilization >= Decimal::ZERO);
        if collateral.is_zero() {
            assert_eq!(r.pending_utilization, Decimal::ZERO);
        }
        assert!(r.pending_utilization.scale() <= 4);
    }
}

#[test]
fn property_redeem_preserves_ratio() {
    let mut seed = 0xD1B5_4A32_D192_ED03u64;

    for i in 0..400 {
        // every other position is large enough that its utilization rounds to 0
        let (collateral, tokens) = if i % 2 == 0 {
            (rand_amount(&mut seed, 100, 10_000), rand_amount(&mut seed, 1, 50))
        } else {
            (rand_amount(&mut seed, 100_000, 5_000_000), rand_amount(&mut seed, 1, 2))
        };
        let price = Decimal::new(rand_range(&mut seed, 5_000, 20_000) as i64, 4);
        let position = sponsor(collateral, tokens);
        let mut data = market(dec!(1));
        data.token_price = price;

        let mut session = session_with(&position, &data);
        session.select_action(Action::Redeem);
        let remaining = Decimal::new(rand_range(&mut seed, 1, units(tokens) - 1) as i64, 4);
        let outcome = session.edit_pending(PendingField::Tokens, remaining).unwrap();

        let expected = collateral * remaining / tokens;
        let pending_collateral = session.pending().pending_collateral;
        let diff = (pending_collateral - expected).abs();
        assert!(diff <= dec!(0.0001), "collateral drifted by {diff}");
        assert!(pending_collateral > Decimal::ZERO);
        assert!(outcome.deltas.collateral > -collateral);
    }
}

#[test]
fn property_smaller_mint_stays_enabled() {
    let mut seed = 0xA076_1D64_78BD_642Fu64;
    let policy = RoundingPolicy::default();
    let mut checked = 0;

    for _ in 0..1_000 {
        let collateral = rand_amount(&mut seed, 100, 10_000);
        let max_tokens = units(collateral * dec!(0.5));
        let sponsor_tokens = Decimal::new(rand_range(&mut seed, 50_000, max_tokens / 2) as i64, 4);
        let snap = snapshot(collateral, sponsor_tokens, dec!(5));

        let requested = Decimal::new(
            rand_range(&mut seed, units(sponsor_tokens) + 2, max_tokens + 10_000) as i64,
            4,
        );
        let pending = pending_edit(&snap, collateral, requested, &policy);
        let ctx = EligibilityContext::new(&snap, &pending, Approvals::granted(), now(), &policy);
        if !ctx.is_enabled(Action::Mint) {
            continue;
        }

        let smaller = Decimal::new(
            rand_range(&mut seed, units(sponsor_tokens) + 1, units(requested) - 1) as i64,
            4,
        );
        let pending = pending_edit(&snap, collateral, smaller, &policy);
        let ctx = EligibilityContext::new(&snap, &pending, Approvals::granted(), now(), &policy);
        assert!(
            ctx.is_enabled(Action::Mint),
            "mint of {smaller} disabled where {requested} was enabled"
        );
        checked += 1;
    }

    assert!(checked > 100);
}

#[test]
fn property_withdrawal_between_limits_needs_request() {
    let mut seed = 0xE703_7ED1_A0B4_28DBu64;
    let policy = RoundingPolicy::default();

    for _ in 0..1_000 {
        let collateral = rand_amount(&mut seed, 1_000, 10_000);
        let tokens = Decimal::new(rand_range(&mut seed, 50_000, units(collateral * dec!(0.4))) as i64, 4);
        let snap = snapshot(collateral, tokens, dec!(5));

        let target = Decimal::new(rand_range(&mut seed, 5_100, 7_900) as i64, 4);
        let withdrawn_to = policy.calc(tokens / target);
        let pending = pending_edit(&snap, withdrawn_to, tokens, &policy);
        assert!(pending.pending_utilization > dec!(0.5));
        assert!(pending.pending_utilization < dec!(0.8));

        let ctx = EligibilityContext::new(&snap, &pending, Approvals::granted(), now(), &policy);
        assert_eq!(ctx.route_withdrawal(), WithdrawRoute::RequiresRequest);
        assert!(!ctx.is_enabled(Action::Withdraw));
        assert!(ctx.is_enabled(Action::RequestWithdrawal));
    }
}

#[test]
fn property_selecting_mint_twice_has_no_drift() {
    let mut seed = 0x2545_F491_4F6C_DD1Du64;

    for _ in 0..300 {
        let collateral = rand_amount(&mut seed, 0, 10_000);
        let tokens = rand_amount(&mut seed, 0, 5_000);
        let mut session = session_with(&sponsor(collateral, tokens), &market(dec!(5)));

        session
            .edit_pending(PendingField::Collateral, rand_amount(&mut seed, 0, 20_000))
            .unwrap();
        session
            .edit_pending(PendingField::Tokens, rand_amount(&mut seed, 0, 20_000))
            .unwrap();

        let once = session.select_action(Action::Mint);
        let twice = session.select_action(Action::Mint);
        assert_eq!(once, twice);
        assert_eq!(once.pending_collateral, collateral);
        assert_eq!(once.pending_tokens, tokens);
    }
}
