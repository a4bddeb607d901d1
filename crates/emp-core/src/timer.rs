//! Withdrawal request countdown
//! The engine never schedules anything: it only compares two instants

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::SECONDS_PER_MINUTE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalTimer {
  pass_timestamp: DateTime<Utc>,
}

impl WithdrawalTimer {
  pub fn new(pass_timestamp: DateTime<Utc>) -> Self {
    Self { pass_timestamp }
  }

  /// Pass time for a request submitted at `requested_at` with a wait of `period_minutes`.
  /// `None` when the wait does not fit in a timestamp.
  pub fn starting_at(requested_at: DateTime<Utc>, period_minutes: i64) -> Option<Self> {
    let wait = Duration::try_minutes(period_minutes.max(0))?;
    requested_at.checked_add_signed(wait).map(Self::new)
  }

  pub fn pass_timestamp(&self) -> DateTime<Utc> {
    self.pass_timestamp
  }

  /// Time left until the request passes, floored at zero
  pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
    let left = self.pass_timestamp - now;
    if left < Duration::zero() {
      Duration::zero()
    } else {
      left
    }
  }

  /// Whole minutes left, rounded up so a partial minute still shows as one
  pub fn minutes_left(&self, now: DateTime<Utc>) -> i64 {
    let seconds = self.remaining(now).num_seconds();
    (seconds + SECONDS_PER_MINUTE - 1) / SECONDS_PER_MINUTE
  }

  /// An elapsed request is withdrawable, not gone
  pub fn has_elapsed(&self, now: DateTime<Utc>) -> bool {
    now >= self.pass_timestamp
  }

  pub fn is_running(&self, now: DateTime<Utc>) -> bool {
    !self.has_elapsed(now)
  }
}
