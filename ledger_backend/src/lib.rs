use ic_stable_structures::memory_manager::VirtualMemory;
use ic_stable_structures::DefaultMemoryImpl;

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

pub mod config;
pub mod defi_accounting;
pub mod error;
pub mod game;
pub mod ledger;
pub mod types;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use config::LedgerConfig;
pub use defi_accounting::{
    GlobalState, InMemoryVault, LedgerEvent, RecordStore, SharedLedger, SharedMemory, UserBalance, UserLiquidity,
    Vault, Q64,
};
pub use error::{LedgerError, TransferError};
pub use game::{FairnessPolicy, ModuloHouseEdge};
pub use ledger::{Clock, Ledger, ManualClock, SystemClock};
pub use types::{LiquidityWithdrawal, WagerOutcome};

// =============================================================================
// MEMORY MANAGEMENT
// =============================================================================

/// Memory of a ledger laid out over a `MemoryManager`, as on a canister.
pub type Memory = VirtualMemory<DefaultMemoryImpl>;
