use ic_stable_structures::Memory;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

use super::storage::SharedMemory;
use super::vault::{InMemoryVault, Vault};
use crate::ledger::Ledger;

/// Handle to a ledger shared between concurrent callers.
///
/// Every operation runs under an [`OperationGuard`], so operations touching
/// the global state are serialised. Handles are cheap to clone and are passed
/// explicitly to whoever needs the ledger.
pub struct SharedLedger<M: Memory = SharedMemory, V: Vault = InMemoryVault> {
    inner: Arc<Mutex<Ledger<M, V>>>,
}

impl<M: Memory, V: Vault> Clone for SharedLedger<M, V> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<M: Memory, V: Vault> SharedLedger<M, V> {
    pub fn new(ledger: Ledger<M, V>) -> Self {
        Self { inner: Arc::new(Mutex::new(ledger)) }
    }

    /// Blocks until no other operation holds the ledger.
    ///
    /// A poisoned lock is recovered: operations validate before they write,
    /// so a panicking holder cannot have left a half-applied operation behind.
    pub fn lock(&self) -> OperationGuard<'_, M, V> {
        let guard = self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("ledger lock poisoned by a panicked operation, recovering");
            poisoned.into_inner()
        });
        OperationGuard { guard }
    }

    /// Runs one operation under the guard.
    pub fn with<R>(&self, op: impl FnOnce(&mut Ledger<M, V>) -> R) -> R {
        let mut guard = self.lock();
        op(&mut guard)
    }
}

/// Exclusive access to the ledger for the duration of one operation.
/// Released on drop.
pub struct OperationGuard<'a, M: Memory, V: Vault> {
    guard: MutexGuard<'a, Ledger<M, V>>,
}

impl<M: Memory, V: Vault> Deref for OperationGuard<'_, M, V> {
    type Target = Ledger<M, V>;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<M: Memory, V: Vault> DerefMut for OperationGuard<'_, M, V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}
