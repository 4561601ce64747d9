use candid::Principal;
use thiserror::Error;

/// Failures of the value-transfer layer (wallet <-> vault).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient funds in {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        account: String,
        available: u64,
        requested: u64,
    },

    #[error("transfer overflow crediting {account}")]
    Overflow { account: String },
}

/// Every way a ledger operation can be rejected.
///
/// Errors are raised before any record is written or any value moves, so a
/// rejected operation leaves the ledger exactly as it found it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("unauthorized: caller {caller} is not the ledger admin")]
    Unauthorized { caller: Principal },

    #[error("ledger already initialized")]
    AlreadyInitialized,

    #[error("ledger not initialized")]
    NotInitialized,

    #[error("invalid chance {chance}: must be between {min} and {max}")]
    InvalidChance { chance: u64, min: u64, max: u64 },

    #[error("invalid amount: {0}")]
    InvalidAmount(&'static str),

    #[error("not enough funds to play: balance {balance}, wager {wager}")]
    NotEnoughFundsToPlay { balance: u64, wager: u64 },

    #[error("not enough funds: balance {balance}, requested {requested}")]
    NotEnoughFunds { balance: u64, requested: u64 },

    #[error("arithmetic overflow")]
    Overflow,

    #[error("bet too big: wager {wager} exceeds max bet {max_bet}")]
    BetTooBig { wager: u64, max_bet: u64 },

    #[error("insufficient output: payout {payout} exceeds available {available}")]
    InsufficientOutput { payout: u64, available: u64 },

    #[error("liquidity locked until {unlocks_at}")]
    LiquidityLocked { unlocks_at: u64 },

    #[error("constraint seeds: caller {caller} does not own the addressed record")]
    ConstraintSeeds { caller: Principal },

    #[error("position at slot {slot} for {owner} still redeems {redeemable} and cannot be liquidated")]
    NotUnderwater { owner: Principal, slot: u64, redeemable: u64 },

    #[error("no liquidity position at slot {slot} for {owner}")]
    PositionNotFound { owner: Principal, slot: u64 },

    #[error("slippage exceeded: expected at least {expected_min} shares, would mint {actual}")]
    SlippageExceeded { expected_min: u128, actual: u128 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}
