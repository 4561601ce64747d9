use candid::Principal;
use ic_stable_structures::Memory;
use tracing::{info, warn};

use crate::defi_accounting::fixed_point::Q64;
use crate::defi_accounting::nat_helpers::mul_div_floor;
use crate::defi_accounting::storage::{Authority, WriteBatch};
use crate::defi_accounting::types::{LedgerEvent, UserBalance};
use crate::defi_accounting::vault::Vault;
use crate::error::LedgerError;
use crate::ledger::{Ledger, Transfer};
use crate::types::{WagerOutcome, BPS_DENOMINATOR, MIN_CHANCE};

// =============================================================================
// FAIRNESS
// =============================================================================

/// Decides whether a supplied random number wins at the given odds.
pub trait FairnessPolicy: Send {
    fn player_wins(&self, random_number: u64, chance: u64) -> bool;
}

/// Player wins iff `random % chance == 0`, except on multiples of the house
/// modulus, which always lose. With the default modulus of 53 the house
/// keeps 1/53 of the rolls that would otherwise have won.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModuloHouseEdge {
    house_modulus: u64,
}

impl ModuloHouseEdge {
    pub fn new(house_modulus: u64) -> Self {
        Self { house_modulus }
    }
}

impl FairnessPolicy for ModuloHouseEdge {
    fn player_wins(&self, random_number: u64, chance: u64) -> bool {
        if chance == 0 || self.house_modulus == 0 {
            return false;
        }
        random_number % chance == 0 && random_number % self.house_modulus != 0
    }
}

// =============================================================================
// CALCULATION FUNCTIONS
// =============================================================================

// Largest wager whose win, wager * (chance - 1), stays within
// bankroll * risk_bps / 10_000
pub fn max_bet(bankroll: u64, chance: u64, risk_bps: u64) -> Result<u64, LedgerError> {
    if chance < MIN_CHANCE {
        return Err(LedgerError::InvalidChance { chance, min: MIN_CHANCE, max: u64::MAX });
    }
    let exposure = mul_div_floor(u128::from(bankroll), u128::from(risk_bps), u128::from(BPS_DENOMINATOR))
        .ok_or(LedgerError::Overflow)?;
    let bet = exposure / u128::from(chance - 1);
    u64::try_from(bet).map_err(|_| LedgerError::Overflow)
}

// =============================================================================
// MAIN GAME LOGIC
// =============================================================================

impl<M: Memory, V: Vault> Ledger<M, V> {
    /// Settles one wager against the player's play balance and the house.
    ///
    /// Only the admin may resolve wagers: it supplies `random_number`, and the
    /// fairness policy turns it into an outcome. No value crosses the vault
    /// boundary; the wager moves between the player's balance and the bankroll.
    pub fn resolve_wager(
        &mut self,
        caller: Principal,
        player: Principal,
        wager: u64,
        chance: u64,
        random_number: u64,
    ) -> Result<WagerOutcome, LedgerError> {
        let (mut state, synced) = self.load_synced()?;
        if caller != state.admin {
            warn!(caller = %caller, "resolve_wager rejected: caller is not admin");
            return Err(LedgerError::Unauthorized { caller });
        }
        if chance < MIN_CHANCE || chance > self.config.max_chance {
            return Err(LedgerError::InvalidChance {
                chance,
                min: MIN_CHANCE,
                max: self.config.max_chance,
            });
        }
        if wager == 0 {
            return Err(LedgerError::InvalidAmount("wager must be greater than zero"));
        }

        let mut balance = self
            .store
            .load_balance(player)?
            .ok_or(LedgerError::NotEnoughFundsToPlay { balance: 0, wager })?;
        if wager > balance.balance {
            return Err(LedgerError::NotEnoughFundsToPlay { balance: balance.balance, wager });
        }

        let max_bet = max_bet(state.last_bankroll, chance, self.config.max_risk_bps)?;
        if wager > max_bet {
            return Err(LedgerError::BetTooBig { wager, max_bet });
        }

        let won = self.fairness.player_wins(random_number, chance);
        let win_amount = wager.checked_mul(chance - 1).ok_or(LedgerError::Overflow)?;

        // House profit is the mirror image of the player's result
        let house_profit: i128 = if won {
            balance.balance = balance.balance.checked_add(win_amount).ok_or(LedgerError::Overflow)?;
            state.user_funds = state.user_funds.checked_add(win_amount).ok_or(LedgerError::Overflow)?;
            state.last_bankroll = state.last_bankroll.checked_sub(win_amount).ok_or(LedgerError::Overflow)?;
            -i128::from(win_amount)
        } else {
            balance.balance -= wager;
            state.user_funds = state.user_funds.checked_sub(wager).ok_or(LedgerError::Overflow)?;
            state.last_bankroll = state.last_bankroll.checked_add(wager).ok_or(LedgerError::Overflow)?;
            i128::from(wager)
        };
        if state.total_shares > 0 {
            let increment = Q64::per_share(house_profit, state.total_shares)?;
            state.acc_profit_per_share = state.acc_profit_per_share.checked_add(increment)?;
        }
        state.wager_count = state.wager_count.checked_add(1).ok_or(LedgerError::Overflow)?;

        let payout = if won { win_amount } else { 0 };
        let outcome = WagerOutcome {
            player,
            won,
            wager,
            chance,
            random_number,
            payout,
            balance_after: balance.balance,
        };

        let mut batch = WriteBatch::new(Authority::Admin(caller));
        if let Some(event) = synced {
            batch = batch.event(event);
        }
        let batch = batch
            .global(state)
            .balance(UserBalance { owner: player, balance: balance.balance })
            .event(LedgerEvent::PlayResult { player, won, wager, payout });
        self.commit(batch, Transfer::None)?;

        info!(
            player = %player,
            won,
            wager,
            chance,
            random_number,
            payout,
            house_profit = %house_profit,
            "wager resolved"
        );
        Ok(outcome)
    }
}
