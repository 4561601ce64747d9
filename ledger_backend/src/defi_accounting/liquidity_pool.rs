use candid::Principal;
use ic_stable_structures::Memory;
use tracing::{info, warn};

use super::fixed_point::Q64;
use super::nat_helpers::{merged_entry, mul_div_floor};
use super::storage::{Authority, WriteBatch};
use super::types::{GlobalState, LedgerEvent, UserLiquidity};
use super::vault::Vault;
use crate::error::LedgerError;
use crate::ledger::{Ledger, Transfer};
use crate::types::LiquidityWithdrawal;

// =============================================================================
// SHARE MATH
// =============================================================================

// Shares minted for a deposit. The first depositor gets one share per unit;
// later depositors are priced against the principal pool, since profit is
// tracked separately by the accumulator.
pub fn shares_for_deposit(state: &GlobalState, amount: u64) -> Result<u128, LedgerError> {
    if state.total_shares == 0 {
        return Ok(u128::from(amount));
    }
    if state.deposits == 0 {
        return Err(LedgerError::InvariantViolation(format!(
            "{} shares outstanding against an empty principal pool",
            state.total_shares
        )));
    }
    mul_div_floor(u128::from(amount), state.total_shares, u128::from(state.deposits)).ok_or(LedgerError::Overflow)
}

/// Principal and signed profit currently attributable to a position.
pub fn position_value(state: &GlobalState, position: &UserLiquidity) -> Result<(u64, i128), LedgerError> {
    let profit = state
        .acc_profit_per_share
        .checked_sub(position.profit_entry)?
        .mul_shares(position.shares)?;
    let principal = mul_div_floor(position.shares, u128::from(state.deposits), state.total_shares)
        .ok_or_else(|| {
            LedgerError::InvariantViolation(format!(
                "position of {} shares cannot be priced against {} total shares",
                position.shares, state.total_shares
            ))
        })?;
    let principal = u64::try_from(principal).map_err(|_| LedgerError::Overflow)?;
    Ok((principal, profit))
}

// What a withdrawal pays: principal plus profit, floored at zero
pub fn redeemable(principal: u64, profit: i128) -> Result<u64, LedgerError> {
    let claim = i128::from(principal) + profit;
    if claim <= 0 {
        return Ok(0);
    }
    u64::try_from(claim).map_err(|_| LedgerError::Overflow)
}

// Takes a position out of the pool totals. A negative claim leaves a deficit
// that is spread over the remaining shares; returns that deficit.
fn close_position(
    state: &mut GlobalState,
    position: &UserLiquidity,
    principal: u64,
    profit: i128,
) -> Result<u64, LedgerError> {
    state.total_shares = state.total_shares.checked_sub(position.shares).ok_or(LedgerError::Overflow)?;
    state.deposits = state.deposits.checked_sub(principal).ok_or(LedgerError::Overflow)?;
    let claim = i128::from(principal) + profit;
    if claim >= 0 || state.total_shares == 0 {
        return Ok(0);
    }
    let deficit = -claim;
    let decrement = Q64::per_share(-deficit, state.total_shares)?;
    state.acc_profit_per_share = state.acc_profit_per_share.checked_add(decrement)?;
    u64::try_from(deficit).map_err(|_| LedgerError::Overflow)
}

// =============================================================================
// DEPOSIT & WITHDRAW
// =============================================================================

impl<M: Memory, V: Vault> Ledger<M, V> {
    /// Moves `amount` from the owner's wallet into the pool and mints shares
    /// into the position at `slot`. Returns the number of shares minted.
    ///
    /// A later deposit into an open slot merges into it: the profit already
    /// earned by the existing shares is carried over, never increased.
    pub fn provide_liquidity(
        &mut self,
        caller: Principal,
        owner: Principal,
        slot: u64,
        amount: u64,
        min_shares_expected: Option<u128>,
    ) -> Result<u128, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount("liquidity deposit must be greater than zero"));
        }
        if caller != owner {
            warn!(caller = %caller, owner = %owner, "provide_liquidity rejected: foreign position");
            return Err(LedgerError::ConstraintSeeds { caller });
        }

        let (mut state, synced) = self.load_synced()?;
        let minted = shares_for_deposit(&state, amount)?;
        if minted == 0 {
            return Err(LedgerError::InvalidAmount("deposit too small to mint any shares"));
        }
        if let Some(expected_min) = min_shares_expected {
            if minted < expected_min {
                return Err(LedgerError::SlippageExceeded { expected_min, actual: minted });
            }
        }

        let now = self.now();
        let acc = state.acc_profit_per_share;
        let position = match self.store.load_liquidity(owner, slot)? {
            Some(existing) => {
                let shares = existing.shares.checked_add(minted).ok_or(LedgerError::Overflow)?;
                let entry = merged_entry(acc.raw(), existing.profit_entry.raw(), existing.shares, shares)
                    .ok_or(LedgerError::Overflow)?;
                UserLiquidity {
                    owner,
                    slot,
                    deposited: existing.deposited.checked_add(amount).ok_or(LedgerError::Overflow)?,
                    shares,
                    profit_entry: Q64::from_raw(entry),
                    last_deposit_at: now,
                }
            }
            None => UserLiquidity {
                owner,
                slot,
                deposited: amount,
                shares: minted,
                profit_entry: acc,
                last_deposit_at: now,
            },
        };

        state.deposits = state.deposits.checked_add(amount).ok_or(LedgerError::Overflow)?;
        state.last_bankroll = state.last_bankroll.checked_add(amount).ok_or(LedgerError::Overflow)?;
        state.total_shares = state.total_shares.checked_add(minted).ok_or(LedgerError::Overflow)?;

        let mut batch = WriteBatch::new(Authority::Owner(caller));
        if let Some(event) = synced {
            batch = batch.event(event);
        }
        let batch = batch
            .global(state)
            .put_liquidity(position)
            .event(LedgerEvent::LiquidityProvided { owner, slot, amount, shares: minted });
        self.commit(batch, Transfer::Collect { from: caller, amount })?;

        info!(owner = %owner, slot, amount, shares = %minted, "liquidity provided");
        Ok(minted)
    }

    /// Closes the position at `slot`, paying out principal plus profit.
    ///
    /// A position that lost more than its principal pays nothing; the part of
    /// the loss it cannot cover is spread over the remaining shares. When the
    /// payout does not fit the bankroll, other positions that are underwater
    /// are liquidated first, in the same commit.
    pub fn withdraw_liquidity(
        &mut self,
        caller: Principal,
        owner: Principal,
        slot: u64,
    ) -> Result<LiquidityWithdrawal, LedgerError> {
        if caller != owner {
            warn!(caller = %caller, owner = %owner, "withdraw_liquidity rejected: foreign position");
            return Err(LedgerError::ConstraintSeeds { caller });
        }

        let (mut state, synced) = self.load_synced()?;
        let position = self
            .store
            .load_liquidity(owner, slot)?
            .filter(|p| p.shares > 0)
            .ok_or(LedgerError::PositionNotFound { owner, slot })?;

        let lock = self.config.liquidity_lock_nanos;
        if lock > 0 {
            let unlocks_at = position.last_deposit_at.saturating_add(lock);
            if self.now() < unlocks_at {
                return Err(LedgerError::LiquidityLocked { unlocks_at });
            }
        }

        let mut batch = WriteBatch::new(Authority::Owner(caller));
        if let Some(event) = synced {
            batch = batch.event(event);
        }

        let available = state.last_bankroll.min(self.vault.spendable());
        let (mut principal, mut profit) = position_value(&state, &position)?;
        let mut payout = redeemable(principal, profit)?;
        if payout > available {
            // Claims sum to at most the bankroll, so a single claim only
            // exceeds it while another position's claim is negative
            batch = self.liquidate_underwater(&mut state, caller, (owner, slot), batch)?;
            (principal, profit) = position_value(&state, &position)?;
            payout = redeemable(principal, profit)?;
        }
        if payout > available {
            warn!(owner = %owner, slot, payout, available, "withdraw_liquidity rejected: bankroll short");
            return Err(LedgerError::InsufficientOutput { payout, available });
        }

        let deficit = close_position(&mut state, &position, principal, profit)?;
        state.last_bankroll -= payout;
        if deficit > 0 {
            warn!(owner = %owner, slot, deficit, "uncovered position loss socialised");
            batch = batch.event(LedgerEvent::LossSocialised { owner, slot, deficit });
        }

        let batch = batch
            .global(state)
            .remove_liquidity(owner, slot)
            .event(LedgerEvent::LiquidityWithdrawn { owner, slot, shares: position.shares, payout });
        let transfer = if payout > 0 {
            Transfer::Pay { to: owner, amount: payout }
        } else {
            Transfer::None
        };
        self.commit(batch, transfer)?;

        info!(owner = %owner, slot, shares = %position.shares, principal, profit = %profit, payout, "liquidity withdrawn");
        Ok(LiquidityWithdrawal {
            shares_burned: position.shares,
            principal,
            profit,
            payout,
        })
    }

    /// Closes a position that would redeem nothing and spreads its uncovered
    /// loss over the remaining shares. Any caller may liquidate; the owner
    /// forfeits nothing they could have withdrawn. Returns the deficit.
    pub fn liquidate_position(&mut self, caller: Principal, owner: Principal, slot: u64) -> Result<u64, LedgerError> {
        let (mut state, synced) = self.load_synced()?;
        let position = self
            .store
            .load_liquidity(owner, slot)?
            .filter(|p| p.shares > 0)
            .ok_or(LedgerError::PositionNotFound { owner, slot })?;

        let (principal, profit) = position_value(&state, &position)?;
        let redeemable = redeemable(principal, profit)?;
        if redeemable > 0 {
            return Err(LedgerError::NotUnderwater { owner, slot, redeemable });
        }
        let deficit = close_position(&mut state, &position, principal, profit)?;

        let mut batch = WriteBatch::new(Authority::Owner(caller));
        if let Some(event) = synced {
            batch = batch.event(event);
        }
        let batch = batch
            .global(state)
            .liquidate(owner, slot)
            .event(LedgerEvent::PositionLiquidated { owner, slot, by: caller, deficit });
        self.commit(batch, Transfer::None)?;

        warn!(owner = %owner, slot, by = %caller, deficit, "position liquidated");
        Ok(deficit)
    }

    // Liquidates every underwater position except `keep`. Repeats until none
    // is left, since each socialised deficit can push another one under.
    fn liquidate_underwater(
        &self,
        state: &mut GlobalState,
        caller: Principal,
        keep: (Principal, u64),
        mut batch: WriteBatch,
    ) -> Result<WriteBatch, LedgerError> {
        let mut open: Vec<UserLiquidity> = self
            .store
            .liquidity_positions()
            .filter(|p| (p.owner, p.slot) != keep && p.shares > 0)
            .collect();
        loop {
            let mut underwater = None;
            for (i, position) in open.iter().enumerate() {
                let (principal, profit) = position_value(state, position)?;
                if i128::from(principal) + profit < 0 {
                    underwater = Some((i, principal, profit));
                    break;
                }
            }
            let Some((i, principal, profit)) = underwater else {
                return Ok(batch);
            };
            let position = open.swap_remove(i);
            let deficit = close_position(state, &position, principal, profit)?;
            warn!(owner = %position.owner, slot = position.slot, by = %caller, deficit, "position liquidated");
            batch = batch.liquidate(position.owner, position.slot).event(LedgerEvent::PositionLiquidated {
                owner: position.owner,
                slot: position.slot,
                by: caller,
                deficit,
            });
        }
    }
}
