//! Error and fault taxonomy.
//!
//! Two families live here:
//!
//! * [`InitError`] is a plain, recoverable error returned while the allocator
//!   is being configured.
//! * [`Fault`] describes a broken allocator contract (bad address, bad
//!   reference count, corrupted free list). Faults raised by the mutating
//!   operations are fatal: they are logged and the kernel panics. The same
//!   type is returned as a value by [`PageAllocator::audit`](crate::PageAllocator::audit).

use kernel_memory_addresses::PhysicalAddress;
use log::error;

/// Why the allocator could not be set up.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
    #[error("managed range [{start}, {end}) holds no whole page")]
    EmptyRange {
        start: PhysicalAddress,
        end: PhysicalAddress,
    },
    #[error("reference-count table has {provided} entries but {required} are needed")]
    TableTooSmall { required: usize, provided: usize },
    #[error("page allocator already initialized")]
    AlreadyInitialized,
}

/// Why an address was rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressFault {
    #[error("not page aligned")]
    Misaligned,
    #[error("below the managed range starting at {start}")]
    BelowRange { start: PhysicalAddress },
    #[error("at or above the managed range end {end}")]
    AboveRange { end: PhysicalAddress },
}

/// Why a reference count was rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefStateFault {
    #[error("page has no owner")]
    NotOwned,
    #[error("page is already free (double free)")]
    DoubleFree,
    #[error("free page still has owners")]
    StillOwned,
    #[error("owner count would overflow")]
    Saturated,
}

/// A violated allocator invariant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error("invalid page address {addr}: {reason}")]
    InvalidAddress {
        addr: PhysicalAddress,
        reason: AddressFault,
    },
    #[error("invalid reference count {count} for page {addr}: {reason}")]
    InvalidRefState {
        addr: PhysicalAddress,
        count: u32,
        reason: RefStateFault,
    },
    #[error("free list links {walked} pages but records {recorded}")]
    FreeListLength { recorded: usize, walked: usize },
    #[error("{unowned} pages have no owner but {listed} are on the free list")]
    LostPages { unowned: usize, listed: usize },
    #[error("page allocator used before init")]
    NotInitialized,
}

/// Report a fatal fault raised by `op` and stop.
#[cold]
#[track_caller]
pub(crate) fn fatal(op: &'static str, fault: Fault) -> ! {
    error!("{op}: {fault}");
    panic!("{op}: {fault}");
}
