//! Lock helpers shared by the registries.
//!
//! Every critical section in this crate is a single map or list update, so a
//! panic while a guard is held cannot leave the data half-written. Poisoned
//! locks are therefore recovered rather than reported.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
