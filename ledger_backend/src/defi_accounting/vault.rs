//! Value transfer between external wallets and the custodial vault.

use candid::Principal;
use std::collections::BTreeMap;

use crate::error::TransferError;

/// The custodial account holding every unit the ledger is responsible for.
///
/// `collect` and `pay` are the only ways value crosses the vault boundary.
/// Both either move exactly `amount` or fail without moving anything.
pub trait Vault: Send {
    /// Total value held, rent reserve included.
    fn balance(&self) -> u64;

    /// Value that must stay in the vault to keep it alive.
    fn rent_reserve(&self) -> u64;

    fn collect(&mut self, from: Principal, amount: u64) -> Result<(), TransferError>;

    fn pay(&mut self, to: Principal, amount: u64) -> Result<(), TransferError>;

    fn spendable(&self) -> u64 {
        self.balance().saturating_sub(self.rent_reserve())
    }
}

/// Vault plus the external wallets that trade with it.
#[derive(Clone, Debug, Default)]
pub struct InMemoryVault {
    wallets: BTreeMap<Principal, u64>,
    balance: u64,
    rent_reserve: u64,
}

impl InMemoryVault {
    /// A vault created with (and holding) its rent reserve.
    pub fn new(rent_reserve: u64) -> Self {
        Self {
            wallets: BTreeMap::new(),
            balance: rent_reserve,
            rent_reserve,
        }
    }

    /// Mints value into an external wallet (test faucet).
    pub fn fund(&mut self, wallet: Principal, amount: u64) -> Result<(), TransferError> {
        let entry = self.wallets.entry(wallet).or_insert(0);
        *entry = entry.checked_add(amount).ok_or_else(|| TransferError::Overflow {
            account: wallet.to_text(),
        })?;
        Ok(())
    }

    pub fn wallet(&self, wallet: Principal) -> u64 {
        self.wallets.get(&wallet).copied().unwrap_or(0)
    }

    /// A transfer into the vault that bypasses the ledger entirely.
    /// The next bankroll sync hands it to the liquidity providers.
    pub fn donate(&mut self, from: Principal, amount: u64) -> Result<(), TransferError> {
        self.collect(from, amount)
    }

    /// Every unit in existence: wallets plus the vault.
    pub fn total_value(&self) -> u128 {
        self.wallets.values().map(|&v| u128::from(v)).sum::<u128>() + u128::from(self.balance)
    }
}

impl Vault for InMemoryVault {
    fn balance(&self) -> u64 {
        self.balance
    }

    fn rent_reserve(&self) -> u64 {
        self.rent_reserve
    }

    fn collect(&mut self, from: Principal, amount: u64) -> Result<(), TransferError> {
        let available = self.wallet(from);
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                account: from.to_text(),
                available,
                requested: amount,
            });
        }
        let new_balance = self.balance.checked_add(amount).ok_or_else(|| TransferError::Overflow {
            account: "vault".to_string(),
        })?;
        self.wallets.insert(from, available - amount);
        self.balance = new_balance;
        Ok(())
    }

    fn pay(&mut self, to: Principal, amount: u64) -> Result<(), TransferError> {
        let available = self.spendable();
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                account: "vault".to_string(),
                available,
                requested: amount,
            });
        }
        let credited = self.wallet(to).checked_add(amount).ok_or_else(|| TransferError::Overflow {
            account: to.to_text(),
        })?;
        self.wallets.insert(to, credited);
        self.balance -= amount;
        Ok(())
    }
}
