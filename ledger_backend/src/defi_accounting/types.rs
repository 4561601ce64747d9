use candid::{CandidType, Deserialize, Principal};
use ic_stable_structures::storable::Bound;
use ic_stable_structures::Storable;
use serde::Serialize;
use std::borrow::Cow;

use super::fixed_point::Q64;

// =============================================================================
// LEDGER RECORDS
// =============================================================================

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct GlobalState {
    pub admin: Principal,
    pub total_shares: u128,
    pub acc_profit_per_share: Q64,
    /// Sum of all play balances. Owed to players, never part of the bankroll.
    pub user_funds: u64,
    /// Principal pool: LP capital still in the vault, excluding profit.
    pub deposits: u64,
    /// Bankroll as of the last synchronisation.
    pub last_bankroll: u64,
    pub wager_count: u64,
}

impl GlobalState {
    pub fn new(admin: Principal) -> Self {
        Self {
            admin,
            total_shares: 0,
            acc_profit_per_share: Q64::ZERO,
            user_funds: 0,
            deposits: 0,
            last_bankroll: 0,
            wager_count: 0,
        }
    }
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct UserLiquidity {
    pub owner: Principal,
    pub slot: u64,
    pub deposited: u64,
    pub shares: u128,
    /// Accumulator value at which this position's profit starts counting.
    pub profit_entry: Q64,
    pub last_deposit_at: u64,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct UserBalance {
    pub owner: Principal,
    pub balance: u64,
}

// =============================================================================
// AUDIT LOG
// =============================================================================

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct AuditEntry {
    pub timestamp: u64,
    pub event: LedgerEvent,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    Initialized { admin: Principal },
    LiquidityProvided { owner: Principal, slot: u64, amount: u64, shares: u128 },
    LiquidityWithdrawn { owner: Principal, slot: u64, shares: u128, payout: u64 },
    /// A closed position's uncovered loss, spread over the remaining shares.
    LossSocialised { owner: Principal, slot: u64, deficit: u64 },
    /// An underwater position closed by someone other than its owner.
    PositionLiquidated { owner: Principal, slot: u64, by: Principal, deficit: u64 },
    FundsDeposited { owner: Principal, amount: u64 },
    FundsWithdrawn { owner: Principal, amount: u64 },
    PlayResult { player: Principal, won: bool, wager: u64, payout: u64 },
    BankrollSynced { delta: i128, distributed: bool },
}

// =============================================================================
// STORABLE IMPLEMENTATIONS
// =============================================================================

macro_rules! candid_storable {
    ($ty:ty, $name:literal) => {
        impl Storable for $ty {
            fn to_bytes(&self) -> Cow<'_, [u8]> {
                Cow::Owned(candid::encode_one(self).expect(concat!(
                    "CRITICAL: Failed to encode ",
                    $name,
                    ". This should never happen unless there's a bug in candid serialization."
                )))
            }

            fn into_bytes(self) -> Vec<u8> {
                self.to_bytes().into_owned()
            }

            fn from_bytes(bytes: Cow<[u8]>) -> Self {
                candid::decode_one(&bytes).expect(concat!(
                    "CRITICAL: Failed to decode ",
                    $name,
                    " from stable storage. This indicates storage corruption or an incompatible upgrade."
                ))
            }

            const BOUND: Bound = Bound::Bounded {
                max_size: 1000, // Estimated max size
                is_fixed_size: false,
            };
        }
    };
}

candid_storable!(GlobalState, "GlobalState");
candid_storable!(UserLiquidity, "UserLiquidity");
candid_storable!(UserBalance, "UserBalance");
candid_storable!(AuditEntry, "AuditEntry");

// =============================================================================
// QUERY RESULTS
// =============================================================================

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct LPPosition {
    pub owner: Principal,
    pub slot: u64,
    pub shares: u128,
    pub deposited: u64,
    pub principal: u64,
    pub pending_profit: i128,
    /// What a withdrawal would pay right now (never negative).
    pub redeemable: u64,
    pub pool_ownership_bps: u64,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PoolStats {
    pub total_shares: u128,
    pub deposits: u64,
    pub bankroll: u64,
    pub user_funds: u64,
    pub vault_balance: u64,
    pub acc_profit_per_share: Q64,
    pub lp_count: u64,
    pub player_count: u64,
    pub wager_count: u64,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ConservationReport {
    pub vault_balance: u64,
    pub rent_reserve: u64,
    pub user_funds: u64,
    pub sum_of_balances: u64,
    pub bankroll: u64,
    pub total_shares: u128,
    pub sum_of_shares: u128,
    pub deposits: u64,
    /// Signed sum of what every open position could redeem.
    pub lp_claims: i128,
    pub position_count: u64,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct HealthCheck {
    pub report: ConservationReport,
    /// Bankroll minus all LP claims. Negative means the pool owes more than it holds.
    pub excess: i128,
    pub is_healthy: bool,
    pub health_status: String,
    pub timestamp: u64,
    pub unique_players: u64,
    pub unique_lps: u64,
    pub audit_log_len: u64,
}
