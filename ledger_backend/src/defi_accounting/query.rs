use candid::Principal;
use ic_stable_structures::Memory;

use super::liquidity_pool::{position_value, redeemable, shares_for_deposit};
use super::nat_helpers::mul_div_floor;
use super::types::{AuditEntry, GlobalState, LPPosition, PoolStats, UserBalance, UserLiquidity};
use super::vault::Vault;
use crate::error::LedgerError;
use crate::game;
use crate::ledger::Ledger;

const MAX_EVENTS_PER_PAGE: usize = 100;

// Raw record reads never synchronise the bankroll; the previews below do it
// on a throwaway copy of the global state, so queries never write.
impl<M: Memory, V: Vault> Ledger<M, V> {
    pub fn global_state(&self) -> Option<GlobalState> {
        self.store.global_state()
    }

    pub fn user_liquidity(&self, owner: Principal, slot: u64) -> Result<Option<UserLiquidity>, LedgerError> {
        self.store.load_liquidity(owner, slot)
    }

    pub fn user_balance(&self, owner: Principal) -> Result<Option<UserBalance>, LedgerError> {
        self.store.load_balance(owner)
    }

    pub fn balance_of(&self, owner: Principal) -> u64 {
        self.store
            .load_balance(owner)
            .ok()
            .flatten()
            .map(|b| b.balance)
            .unwrap_or(0)
    }

    /// The position as it would settle right now.
    pub fn lp_position(&self, owner: Principal, slot: u64) -> Result<Option<LPPosition>, LedgerError> {
        let Some(position) = self.store.load_liquidity(owner, slot)? else {
            return Ok(None);
        };
        let (state, _) = self.load_synced()?;
        let (principal, pending_profit) = position_value(&state, &position)?;
        let pool_ownership_bps = mul_div_floor(position.shares, 10_000, state.total_shares)
            .and_then(|bps| u64::try_from(bps).ok())
            .unwrap_or(0);
        Ok(Some(LPPosition {
            owner,
            slot,
            shares: position.shares,
            deposited: position.deposited,
            principal,
            pending_profit,
            redeemable: redeemable(principal, pending_profit)?,
            pool_ownership_bps,
        }))
    }

    pub fn pool_stats(&self) -> Result<PoolStats, LedgerError> {
        let (state, _) = self.load_synced()?;
        Ok(PoolStats {
            total_shares: state.total_shares,
            deposits: state.deposits,
            bankroll: state.last_bankroll,
            user_funds: state.user_funds,
            vault_balance: self.vault.balance(),
            acc_profit_per_share: state.acc_profit_per_share,
            lp_count: self.store.position_count(),
            player_count: self.store.balance_count(),
            wager_count: state.wager_count,
        })
    }

    /// Shares a deposit of `amount` would mint right now.
    pub fn preview_shares(&self, amount: u64) -> Result<u128, LedgerError> {
        let (state, _) = self.load_synced()?;
        shares_for_deposit(&state, amount)
    }

    /// Largest wager currently accepted at `chance`.
    pub fn max_bet(&self, chance: u64) -> Result<u64, LedgerError> {
        let (state, _) = self.load_synced()?;
        game::max_bet(state.last_bankroll, chance, self.config.max_risk_bps)
    }

    pub fn events(&self, offset: u64, limit: usize) -> Vec<AuditEntry> {
        self.store.events(offset, limit.min(MAX_EVENTS_PER_PAGE))
    }
}
