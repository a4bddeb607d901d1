//! Engine-wide constants
//! Centralized location for rounding and timing defaults

// PRECISION CONSTANTS
pub const CALC_PRECISION: u32 = 4;      // fractional digits for calculator values
pub const DISPLAY_PRECISION: u32 = 2;   // fractional digits for human-facing maxima

// WITHDRAWAL TIMING
pub const DEFAULT_WITHDRAWAL_PERIOD_MINUTES: i64 = 120;
pub const SECONDS_PER_MINUTE: i64 = 60;

// SESSION
pub const MAX_BUFFERED_EVENTS: usize = 1024;  // oldest events dropped past this until drained
