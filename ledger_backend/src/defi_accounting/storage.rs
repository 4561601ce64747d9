//! Record store for the ledger.
//!
//! Each record family lives in its own `StableBTreeMap`, keyed by the
//! deterministic [`Address`] of the record. Writes go through a
//! [`WriteBatch`]: the batch is checked against the caller's authority as a
//! whole, and only a batch that passed [`RecordStore::check`] is applied.
//! Applying is infallible, so an operation either commits every record it
//! touched or none of them.

use candid::Principal;
use ic_stable_structures::memory_manager::{MemoryId, MemoryManager, VirtualMemory};
use ic_stable_structures::{DefaultMemoryImpl, Memory, StableBTreeMap};
use std::sync::{Arc, RwLock};

use super::addressing::{Address, RecordKey};
use super::memory_ids::{
    AUDIT_LOG_MAP_MEMORY_ID, GLOBAL_STATE_MEMORY_ID, USER_BALANCES_MEMORY_ID, USER_LIQUIDITY_MEMORY_ID,
};
use super::types::{AuditEntry, GlobalState, LedgerEvent, UserBalance, UserLiquidity};
use crate::error::LedgerError;

const WASM_PAGE_SIZE: u64 = 65536;
const MAX_PAGES: u64 = 65536 * 4; // 16 GiB, same ceiling as 64-bit stable memory

// =============================================================================
// THREAD-SAFE MEMORY
// =============================================================================

/// Growable heap memory that can be shared across threads.
///
/// Stands in for stable memory when the ledger runs behind a
/// [`SharedLedger`](super::guard::SharedLedger).
#[derive(Clone, Default)]
pub struct SharedMemory(Arc<RwLock<Vec<u8>>>);

impl SharedMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Memory for SharedMemory {
    fn size(&self) -> u64 {
        let bytes = self.0.read().unwrap_or_else(|e| e.into_inner());
        bytes.len() as u64 / WASM_PAGE_SIZE
    }

    fn grow(&self, pages: u64) -> i64 {
        let mut bytes = self.0.write().unwrap_or_else(|e| e.into_inner());
        let size = bytes.len() as u64 / WASM_PAGE_SIZE;
        match size.checked_add(pages) {
            Some(new_size) if new_size <= MAX_PAGES => {
                bytes.resize((new_size * WASM_PAGE_SIZE) as usize, 0);
                size as i64
            }
            _ => -1,
        }
    }

    fn read(&self, offset: u64, dst: &mut [u8]) {
        let bytes = self.0.read().unwrap_or_else(|e| e.into_inner());
        let start = offset as usize;
        let end = start + dst.len();
        assert!(end <= bytes.len(), "read out of bounds: {}..{} of {}", start, end, bytes.len());
        dst.copy_from_slice(&bytes[start..end]);
    }

    fn write(&self, offset: u64, src: &[u8]) {
        let mut bytes = self.0.write().unwrap_or_else(|e| e.into_inner());
        let start = offset as usize;
        let end = start + src.len();
        assert!(end <= bytes.len(), "write out of bounds: {}..{} of {}", start, end, bytes.len());
        bytes[start..end].copy_from_slice(src);
    }
}

// =============================================================================
// WRITE BATCHES
// =============================================================================

/// Who is writing. Owners may only touch their own records, except to close
/// an underwater position through [`LiquidityWrite::Liquidate`]; the admin
/// may touch any play balance but no liquidity position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Authority {
    Owner(Principal),
    Admin(Principal),
}

impl Authority {
    pub fn caller(&self) -> Principal {
        match self {
            Authority::Owner(p) | Authority::Admin(p) => *p,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LiquidityWrite {
    Put(UserLiquidity),
    Remove { owner: Principal, slot: u64 },
    /// Removal of a position the engine found to redeem nothing.
    Liquidate { owner: Principal, slot: u64 },
}

impl LiquidityWrite {
    // Owner whose authority the write needs, if any
    fn required_owner(&self) -> Option<Principal> {
        match self {
            LiquidityWrite::Put(position) => Some(position.owner),
            LiquidityWrite::Remove { owner, .. } => Some(*owner),
            LiquidityWrite::Liquidate { .. } => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct WriteBatch {
    pub authority: Authority,
    pub global: Option<GlobalState>,
    pub liquidity: Vec<LiquidityWrite>,
    pub balances: Vec<UserBalance>,
    pub events: Vec<LedgerEvent>,
}

impl WriteBatch {
    pub fn new(authority: Authority) -> Self {
        Self {
            authority,
            global: None,
            liquidity: Vec::new(),
            balances: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn global(mut self, state: GlobalState) -> Self {
        self.global = Some(state);
        self
    }

    pub fn put_liquidity(mut self, position: UserLiquidity) -> Self {
        self.liquidity.push(LiquidityWrite::Put(position));
        self
    }

    pub fn remove_liquidity(mut self, owner: Principal, slot: u64) -> Self {
        self.liquidity.push(LiquidityWrite::Remove { owner, slot });
        self
    }

    pub fn liquidate(mut self, owner: Principal, slot: u64) -> Self {
        self.liquidity.push(LiquidityWrite::Liquidate { owner, slot });
        self
    }

    pub fn balance(mut self, balance: UserBalance) -> Self {
        self.balances.push(balance);
        self
    }

    pub fn event(mut self, event: LedgerEvent) -> Self {
        self.events.push(event);
        self
    }
}

// =============================================================================
// RECORD STORE
// =============================================================================

pub struct RecordStore<M: Memory> {
    global: StableBTreeMap<Address, GlobalState, M>,
    liquidity: StableBTreeMap<Address, UserLiquidity, M>,
    balances: StableBTreeMap<Address, UserBalance, M>,
    audit_log: StableBTreeMap<u64, AuditEntry, M>,
}

impl RecordStore<SharedMemory> {
    pub fn in_memory() -> Self {
        Self::init(SharedMemory::new(), SharedMemory::new(), SharedMemory::new(), SharedMemory::new())
    }
}

impl RecordStore<VirtualMemory<DefaultMemoryImpl>> {
    /// Lays the store out over a memory manager using the registered IDs.
    pub fn from_memory_manager(manager: &MemoryManager<DefaultMemoryImpl>) -> Self {
        Self::init(
            manager.get(MemoryId::new(GLOBAL_STATE_MEMORY_ID)),
            manager.get(MemoryId::new(USER_LIQUIDITY_MEMORY_ID)),
            manager.get(MemoryId::new(USER_BALANCES_MEMORY_ID)),
            manager.get(MemoryId::new(AUDIT_LOG_MAP_MEMORY_ID)),
        )
    }
}

impl<M: Memory> RecordStore<M> {
    pub fn init(global: M, liquidity: M, balances: M, audit_log: M) -> Self {
        Self {
            global: StableBTreeMap::init(global),
            liquidity: StableBTreeMap::init(liquidity),
            balances: StableBTreeMap::init(balances),
            audit_log: StableBTreeMap::init(audit_log),
        }
    }

    pub fn global_state(&self) -> Option<GlobalState> {
        self.global.get(&RecordKey::GlobalState.address())
    }

    pub fn create_global(&mut self, state: GlobalState, timestamp: u64) -> Result<(), LedgerError> {
        let address = RecordKey::GlobalState.address();
        if self.global.contains_key(&address) {
            return Err(LedgerError::AlreadyInitialized);
        }
        let admin = state.admin;
        self.global.insert(address, state);
        self.append_event(LedgerEvent::Initialized { admin }, timestamp);
        Ok(())
    }

    /// Reads a liquidity position, verifying the stored record belongs to the
    /// address it was loaded from.
    pub fn load_liquidity(&self, owner: Principal, slot: u64) -> Result<Option<UserLiquidity>, LedgerError> {
        let address = RecordKey::UserLiquidity { owner, slot }.address();
        match self.liquidity.get(&address) {
            Some(position) if position.owner != owner || position.slot != slot => {
                Err(LedgerError::ConstraintSeeds { caller: owner })
            }
            other => Ok(other),
        }
    }

    pub fn load_balance(&self, owner: Principal) -> Result<Option<UserBalance>, LedgerError> {
        let address = RecordKey::UserBalance { owner }.address();
        match self.balances.get(&address) {
            Some(balance) if balance.owner != owner => Err(LedgerError::ConstraintSeeds { caller: owner }),
            other => Ok(other),
        }
    }

    /// Validates every write in the batch against its authority.
    pub fn check(&self, batch: &WriteBatch) -> Result<(), LedgerError> {
        let stored = self.global_state().ok_or(LedgerError::NotInitialized)?;
        match batch.authority {
            Authority::Owner(caller) => {
                if batch.liquidity.iter().any(|w| w.required_owner().is_some_and(|owner| owner != caller))
                    || batch.balances.iter().any(|b| b.owner != caller)
                {
                    return Err(LedgerError::ConstraintSeeds { caller });
                }
            }
            Authority::Admin(caller) => {
                if caller != stored.admin {
                    return Err(LedgerError::Unauthorized { caller });
                }
                if !batch.liquidity.is_empty() {
                    return Err(LedgerError::ConstraintSeeds { caller });
                }
            }
        }
        if let Some(global) = &batch.global {
            if global.admin != stored.admin {
                return Err(LedgerError::Unauthorized { caller: batch.authority.caller() });
            }
        }
        Ok(())
    }

    /// Commits a batch that already passed [`check`](Self::check).
    pub fn apply(&mut self, batch: WriteBatch, timestamp: u64) {
        if let Some(global) = batch.global {
            self.global.insert(RecordKey::GlobalState.address(), global);
        }
        for write in batch.liquidity {
            match write {
                LiquidityWrite::Put(position) => {
                    let key = RecordKey::UserLiquidity { owner: position.owner, slot: position.slot };
                    self.liquidity.insert(key.address(), position);
                }
                LiquidityWrite::Remove { owner, slot } | LiquidityWrite::Liquidate { owner, slot } => {
                    self.liquidity.remove(&RecordKey::UserLiquidity { owner, slot }.address());
                }
            }
        }
        for balance in batch.balances {
            self.balances.insert(RecordKey::UserBalance { owner: balance.owner }.address(), balance);
        }
        for event in batch.events {
            self.append_event(event, timestamp);
        }
    }

    fn append_event(&mut self, event: LedgerEvent, timestamp: u64) {
        let index = self.audit_log.len();
        self.audit_log.insert(index, AuditEntry { timestamp, event });
    }

    pub fn liquidity_positions(&self) -> impl Iterator<Item = UserLiquidity> + '_ {
        self.liquidity.iter().map(|entry| entry.value())
    }

    pub fn user_balances(&self) -> impl Iterator<Item = UserBalance> + '_ {
        self.balances.iter().map(|entry| entry.value())
    }

    pub fn position_count(&self) -> u64 {
        self.liquidity.len()
    }

    pub fn balance_count(&self) -> u64 {
        self.balances.len()
    }

    pub fn audit_log_len(&self) -> u64 {
        self.audit_log.len()
    }

    pub fn events(&self, offset: u64, limit: usize) -> Vec<AuditEntry> {
        self.audit_log.range(offset..).take(limit).map(|entry| entry.value()).collect()
    }
}
