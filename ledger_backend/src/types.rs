use candid::{CandidType, Deserialize, Principal};
use serde::Serialize;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Smallest chance denominator the house accepts. 1 (or 0) is not a game.
pub const MIN_CHANCE: u64 = 2;
pub const DEFAULT_MAX_CHANCE: u64 = 50;
/// Prime modulus of the default house edge (1/53 of all rolls go to the house).
pub const HOUSE_EDGE_MODULUS: u64 = 53;
pub const DEFAULT_MAX_RISK_BPS: u64 = 100; // 1% of bankroll per wager
pub const BPS_DENOMINATOR: u64 = 10_000;

// =============================================================================
// OPERATION RESULTS
// =============================================================================

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct WagerOutcome {
    pub player: Principal,
    pub won: bool,
    pub wager: u64,
    pub chance: u64,
    pub random_number: u64,
    // Credited to the player on a win, 0 on a loss
    pub payout: u64,
    pub balance_after: u64,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct LiquidityWithdrawal {
    pub shares_burned: u128,
    pub principal: u64,
    // Signed: negative when the pool lost money while the position was open
    pub profit: i128,
    pub payout: u64,
}
