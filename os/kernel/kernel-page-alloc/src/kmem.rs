//! The kernel's single page allocator instance.
//!
//! ```ignore
//! let range = ManagedRange::up_to_phystop(kernel_end)?;
//! unsafe { kmem::init(range, DirectMap::IDENTITY)? };
//!
//! let page = kmem::handle().allocate();
//! ```

use crate::error::{Fault, InitError, fatal};
use crate::mapper::DirectMap;
use crate::page_alloc::PageAllocator;
use crate::range::ManagedRange;
use crate::refcount::RefCountStorage;
use kernel_info::memory::REFCOUNT_TABLE_LEN;
use kernel_sync::SyncOnceCell;
use log::debug;

pub type KernelPageAllocator = PageAllocator<'static, DirectMap>;

static REFCOUNTS: RefCountStorage<REFCOUNT_TABLE_LEN> = RefCountStorage::new();
static KMEM: SyncOnceCell<KernelPageAllocator> = SyncOnceCell::new();

/// Bootstrap the kernel page allocator over `range`. Call once in early boot.
///
/// # Errors
/// - [`InitError::TableTooSmall`] if `range` extends past `PHYSTOP`.
/// - [`InitError::AlreadyInitialized`] on every call after the first
///   successful one.
///
/// # Safety
/// Same contract as [`PageAllocator::init`]; the mapping must be valid for
/// the rest of the kernel's lifetime.
pub unsafe fn init(
    range: ManagedRange,
    mapper: DirectMap,
) -> Result<&'static KernelPageAllocator, InitError> {
    if range.table_len() > REFCOUNT_TABLE_LEN {
        return Err(InitError::TableTooSmall {
            required: range.table_len(),
            provided: REFCOUNT_TABLE_LEN,
        });
    }
    let table = REFCOUNTS.claim().ok_or(InitError::AlreadyInitialized)?;

    // SAFETY: forwarded to the caller.
    let alloc = unsafe { PageAllocator::init(range, table, mapper)? };
    let kmem = KMEM.set(alloc).map_err(|_| InitError::AlreadyInitialized)?;
    debug!("kmem: published page allocator {kmem:?}");
    Ok(kmem)
}

/// The kernel page allocator, if [`init`] has run.
#[inline]
#[must_use]
pub fn get() -> Option<&'static KernelPageAllocator> {
    KMEM.get()
}

/// The kernel page allocator.
///
/// # Panics
/// If [`init`] has not run.
#[inline]
#[must_use]
pub fn handle() -> &'static KernelPageAllocator {
    KMEM.get()
        .unwrap_or_else(|| fatal("kmem", Fault::NotInitialized))
}
