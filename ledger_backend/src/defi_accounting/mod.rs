pub mod accounting;
pub mod addressing;
pub mod admin_query;
pub mod fixed_point;
pub mod guard;
pub mod liquidity_pool;
pub mod memory_ids;
pub mod nat_helpers;
pub mod query;
pub mod storage;
pub mod types;
pub mod vault;


pub use addressing::{Address, RecordKey};
pub use fixed_point::Q64;
pub use guard::{OperationGuard, SharedLedger};
pub use storage::{Authority, RecordStore, SharedMemory, WriteBatch};
pub use types::{
    AuditEntry, ConservationReport, GlobalState, HealthCheck, LPPosition, LedgerEvent, PoolStats, UserBalance,
    UserLiquidity,
};
pub use vault::{InMemoryVault, Vault};
