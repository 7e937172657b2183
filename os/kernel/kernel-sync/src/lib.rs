//! # Kernel synchronization primitives
//!
//! * [`SpinLock`]: a named busy-waiting mutual-exclusion lock that owns the
//!   data it guards.
//! * [`SyncOnceCell`]: a write-once cell for boot-time singletons.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod spin_lock;
mod sync_once_cell;

pub use spin_lock::{SpinLock, SpinLockGuard};
pub use sync_once_cell::SyncOnceCell;
