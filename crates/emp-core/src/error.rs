use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
  #[error("Data not ready - {0} has not been loaded yet")]
  DataNotReady(&'static str),

  #[error("Resulting token amount {tokens} is below the position minimum of {min_tokens} - it must be 0 or at least the minimum")]
  BelowMinTokens { tokens: Decimal, min_tokens: Decimal },

  #[error("Utilization {utilization} exceeds the global utilization limit {limit}")]
  AboveGlobalUtilization { utilization: Decimal, limit: Decimal },

  #[error("Utilization {utilization} exceeds the liquidation point {limit}")]
  AboveLiquidationPoint { utilization: Decimal, limit: Decimal },

  #[error("{tokens} tokens would be outstanding with no collateral behind them")]
  UnbackedTokens { tokens: Decimal },

  #[error("Deposit of {required} exceeds the wallet balance of {available}")]
  ExceedsWalletBalance { required: Decimal, available: Decimal },

  #[error("A withdrawal request is already outstanding for this position")]
  WithdrawalRequestOutstanding,

  #[error("Amount must be greater than zero")]
  ZeroAmount,

  #[error("Position has expired - only settlement is possible")]
  PositionExpired,

  #[error("Position has not expired yet - settlement is unavailable")]
  NotExpired,

  #[error("Minting cannot remove collateral")]
  CollateralDecrease,

  #[error("Burning every token closes the position - partial burns must leave tokens outstanding")]
  FullClosureRequired,

  #[error("Withdrawal would push utilization above the global utilization - submit a withdrawal request instead")]
  WithdrawalRequestRequired,

  #[error("No withdrawal request is outstanding")]
  NoWithdrawalRequest,

  #[error("Withdrawal request has already passed its wait period")]
  WithdrawalPassed,

  #[error("Withdrawal request is still inside its wait period")]
  WithdrawalNotPassed,

  #[error("The {0} state has no confirm action")]
  NotConfirmable(crate::state::Action),

  #[error("Collaborator read failed: {0}")]
  Collaborator(String),
}
