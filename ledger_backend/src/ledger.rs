//! The ledger engine.
//!
//! A [`Ledger`] owns the record store, the vault and the policies that decide
//! wagers. Each operation loads the state it needs into working copies, runs
//! every check and every piece of arithmetic against them, moves value
//! through the vault as its last fallible step, and only then writes the
//! records back. Operations are implemented next to the records they manage
//! (`liquidity_pool`, `accounting`, `game`).

use candid::Principal;
use ic_stable_structures::Memory;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::config::LedgerConfig;
use crate::defi_accounting::fixed_point::Q64;
use crate::defi_accounting::nat_helpers::signed_delta;
use crate::defi_accounting::storage::{RecordStore, SharedMemory, WriteBatch};
use crate::defi_accounting::types::{GlobalState, LedgerEvent};
use crate::defi_accounting::vault::{InMemoryVault, Vault};
use crate::error::LedgerError;
use crate::game::{FairnessPolicy, ModuloHouseEdge};

// =============================================================================
// CLOCKS
// =============================================================================

pub trait Clock: Send {
    fn now_nanos(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_nanos(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

/// A clock moved by hand. Clones share the same time.
#[derive(Clone, Default)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self(Arc::new(AtomicU64::new(start)))
    }

    pub fn set(&self, nanos: u64) {
        self.0.store(nanos, Ordering::SeqCst);
    }

    pub fn advance(&self, nanos: u64) {
        self.0.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

// =============================================================================
// VALUE MOVEMENT
// =============================================================================

/// The single vault movement an operation may perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Transfer {
    None,
    Collect { from: Principal, amount: u64 },
    Pay { to: Principal, amount: u64 },
}

// =============================================================================
// LEDGER
// =============================================================================

pub struct Ledger<M: Memory = SharedMemory, V: Vault = InMemoryVault> {
    pub(crate) config: LedgerConfig,
    pub(crate) store: RecordStore<M>,
    pub(crate) vault: V,
    pub(crate) fairness: Box<dyn FairnessPolicy>,
    pub(crate) clock: Box<dyn Clock>,
}

impl<V: Vault> Ledger<SharedMemory, V> {
    pub fn new(config: LedgerConfig, vault: V) -> Result<Self, LedgerError> {
        Self::with_store(config, RecordStore::in_memory(), vault)
    }
}

impl<M: Memory, V: Vault> Ledger<M, V> {
    pub fn with_store(config: LedgerConfig, store: RecordStore<M>, vault: V) -> Result<Self, LedgerError> {
        config.validate()?;
        let fairness = Box::new(ModuloHouseEdge::new(config.house_edge_modulus));
        Ok(Self {
            config,
            store,
            vault,
            fairness,
            clock: Box::new(SystemClock),
        })
    }

    pub fn with_fairness(mut self, fairness: impl FairnessPolicy + 'static) -> Self {
        self.fairness = Box::new(fairness);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn vault(&self) -> &V {
        &self.vault
    }

    /// Direct vault access, for value movements the ledger does not mediate
    /// (funding wallets, external donations).
    pub fn vault_mut(&mut self) -> &mut V {
        &mut self.vault
    }

    pub fn store(&self) -> &RecordStore<M> {
        &self.store
    }

    pub(crate) fn now(&self) -> u64 {
        self.clock.now_nanos()
    }

    // =========================================================================
    // INITIALIZE
    // =========================================================================

    /// Creates the global state with `caller` as admin. Runs once.
    pub fn initialize(&mut self, caller: Principal) -> Result<(), LedgerError> {
        let mut state = GlobalState::new(caller);
        // Value already sitting in the vault is house surplus, not anyone's claim
        state.last_bankroll = self.vault.spendable();
        let now = self.now();
        self.store.create_global(state, now)?;
        info!(admin = %caller, "ledger initialized");
        Ok(())
    }

    pub(crate) fn load_global(&self) -> Result<GlobalState, LedgerError> {
        self.store.global_state().ok_or(LedgerError::NotInitialized)
    }

    // =========================================================================
    // BANKROLL
    // =========================================================================

    /// Vault value not owed to players and not reserved for rent.
    pub(crate) fn bankroll(&self, state: &GlobalState) -> Result<u64, LedgerError> {
        self.vault
            .balance()
            .checked_sub(self.vault.rent_reserve())
            .and_then(|v| v.checked_sub(state.user_funds))
            .ok_or_else(|| {
                LedgerError::InvariantViolation(format!(
                    "vault {} cannot cover rent {} and player funds {}",
                    self.vault.balance(),
                    self.vault.rent_reserve(),
                    state.user_funds
                ))
            })
    }

    /// Folds any bankroll change since the last sync into the accumulator.
    ///
    /// With no shares outstanding the change is absorbed as house surplus.
    /// Returns the event to record when something changed.
    pub(crate) fn sync_bankroll(&self, state: &mut GlobalState) -> Result<Option<LedgerEvent>, LedgerError> {
        let bankroll = self.bankroll(state)?;
        if bankroll == state.last_bankroll {
            return Ok(None);
        }
        let delta = signed_delta(bankroll, state.last_bankroll);
        let distributed = state.total_shares > 0;
        if distributed {
            let increment = Q64::per_share(delta, state.total_shares)?;
            state.acc_profit_per_share = state.acc_profit_per_share.checked_add(increment)?;
        }
        state.last_bankroll = bankroll;
        debug!(delta = %delta, distributed, bankroll, "bankroll synced");
        Ok(Some(LedgerEvent::BankrollSynced { delta, distributed }))
    }

    /// Loads the global state and brings it up to date with the vault.
    pub(crate) fn load_synced(&self) -> Result<(GlobalState, Option<LedgerEvent>), LedgerError> {
        let mut state = self.load_global()?;
        let event = self.sync_bankroll(&mut state)?;
        Ok((state, event))
    }

    // =========================================================================
    // COMMIT
    // =========================================================================

    /// Checks the batch, performs the vault transfer, then writes the batch.
    /// Nothing is written if either of the first two steps fails.
    pub(crate) fn commit(&mut self, batch: WriteBatch, transfer: Transfer) -> Result<(), LedgerError> {
        self.store.check(&batch)?;
        match transfer {
            Transfer::None => {}
            Transfer::Collect { from, amount } => self.vault.collect(from, amount)?,
            Transfer::Pay { to, amount } => self.vault.pay(to, amount)?,
        }
        let now = self.now();
        self.store.apply(batch, now);
        Ok(())
    }
}
