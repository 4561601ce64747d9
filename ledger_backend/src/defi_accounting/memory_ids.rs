//! Central registry for stable memory IDs.
//!
//! IMPORTANT: All memory IDs must be unique across the ledger.
//! Run `cargo test` to verify no collisions exist.
//!
//! Allocation strategy:
//! - 0-9: Singleton ledger state
//! - 10-19: Per-user records (play balances, liquidity positions)
//! - 20-29: Audit & events

// Singleton ledger state (0-9)
pub const GLOBAL_STATE_MEMORY_ID: u8 = 0;

// Per-user records (10-19)
pub const USER_BALANCES_MEMORY_ID: u8 = 10;
pub const USER_LIQUIDITY_MEMORY_ID: u8 = 11;

// Audit & events (20-29)
pub const AUDIT_LOG_MAP_MEMORY_ID: u8 = 24;

pub const ALL_MEMORY_IDS: [u8; 4] = [
    GLOBAL_STATE_MEMORY_ID,
    USER_BALANCES_MEMORY_ID,
    USER_LIQUIDITY_MEMORY_ID,
    AUDIT_LOG_MAP_MEMORY_ID,
];
