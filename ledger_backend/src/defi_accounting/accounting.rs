// Play balances: value players park in the vault to wager with.
// These funds are owed to players and never count toward the bankroll.
use candid::Principal;
use ic_stable_structures::Memory;
use tracing::{info, warn};

use super::storage::{Authority, WriteBatch};
use super::types::{LedgerEvent, UserBalance};
use super::vault::Vault;
use crate::error::LedgerError;
use crate::ledger::{Ledger, Transfer};

impl<M: Memory, V: Vault> Ledger<M, V> {
    /// Credits `amount` from the owner's wallet to their play balance.
    /// Returns the new balance.
    pub fn deposit_funds(&mut self, caller: Principal, owner: Principal, amount: u64) -> Result<u64, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount("deposit must be greater than zero"));
        }
        if caller != owner {
            warn!(caller = %caller, owner = %owner, "deposit_funds rejected: foreign balance");
            return Err(LedgerError::ConstraintSeeds { caller });
        }

        let (mut state, synced) = self.load_synced()?;
        let current = self.store.load_balance(owner)?.map(|b| b.balance).unwrap_or(0);
        let balance = current.checked_add(amount).ok_or(LedgerError::Overflow)?;
        state.user_funds = state.user_funds.checked_add(amount).ok_or(LedgerError::Overflow)?;

        let mut batch = WriteBatch::new(Authority::Owner(caller));
        if let Some(event) = synced {
            batch = batch.event(event);
        }
        let batch = batch
            .global(state)
            .balance(UserBalance { owner, balance })
            .event(LedgerEvent::FundsDeposited { owner, amount });
        self.commit(batch, Transfer::Collect { from: caller, amount })?;

        info!(owner = %owner, amount, balance, "funds deposited");
        Ok(balance)
    }

    /// Pays `amount` of the owner's play balance back to their wallet.
    /// Returns the remaining balance.
    pub fn withdraw_funds(&mut self, caller: Principal, owner: Principal, amount: u64) -> Result<u64, LedgerError> {
        if caller != owner {
            warn!(caller = %caller, owner = %owner, "withdraw_funds rejected: foreign balance");
            return Err(LedgerError::ConstraintSeeds { caller });
        }
        if amount == 0 {
            return Err(LedgerError::InvalidAmount("withdrawal must be greater than zero"));
        }

        let (mut state, synced) = self.load_synced()?;
        let current = self.store.load_balance(owner)?.map(|b| b.balance).unwrap_or(0);
        if amount > current {
            return Err(LedgerError::NotEnoughFunds { balance: current, requested: amount });
        }
        let balance = current - amount;
        state.user_funds = state.user_funds.checked_sub(amount).ok_or_else(|| {
            LedgerError::InvariantViolation(format!(
                "player funds {} smaller than a single balance {}",
                state.user_funds, current
            ))
        })?;

        let mut batch = WriteBatch::new(Authority::Owner(caller));
        if let Some(event) = synced {
            batch = batch.event(event);
        }
        let batch = batch
            .global(state)
            .balance(UserBalance { owner, balance })
            .event(LedgerEvent::FundsWithdrawn { owner, amount });
        self.commit(batch, Transfer::Pay { to: caller, amount })?;

        info!(owner = %owner, amount, balance, "funds withdrawn");
        Ok(balance)
    }
}
