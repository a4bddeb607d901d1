//! Position state engine for Expiring Multi-Party (EMP) synthetic positions.
//!
//! The engine is pure and synchronous. Collaborators hand it a sponsor
//! position, market parameters and a wallet balance; it answers with a pending
//! position calculator and an action eligibility checker.

pub mod constants;
pub mod math;
pub mod error;
pub mod state;
pub mod timer;
pub mod loader;
pub mod calculator;
pub mod invariants;
pub mod actions;
pub mod events;
pub mod reducer;
pub mod session;

pub use actions::{Availability, EligibilityContext, WithdrawRoute};
pub use calculator::{Maximum, Recomputed};
pub use error::EngineError;
pub use events::SessionEvent;
pub use loader::{ChainReader, MarketData, SponsorPosition};
pub use math::RoundingPolicy;
pub use reducer::{reduce, Command, SessionState};
pub use session::{EditOutcome, PositionSession};
pub use state::*;
pub use timer::WithdrawalTimer;
