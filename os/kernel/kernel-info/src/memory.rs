//! # Physical Memory Layout

use kernel_memory_addresses::{PageSize, PhysicalAddress, Size4K};

/// Granularity of the physical page allocator.
pub const PAGE_SIZE: u64 = Size4K::SIZE;

/// Physical address at which RAM starts and the kernel image is loaded.
pub const KERNBASE: PhysicalAddress = PhysicalAddress::new(0x8000_0000);

/// Amount of RAM handed to the kernel starting at [`KERNBASE`].
pub const RAM_BYTES: u64 = 128 * 1024 * 1024;

/// Top of managed physical memory (exclusive).
///
/// Every page in `[end of kernel image, PHYSTOP)` belongs to the physical page
/// allocator.
pub const PHYSTOP: PhysicalAddress = PhysicalAddress::new(KERNBASE.as_u64() + RAM_BYTES);

/// Number of entries in the per-page reference-count table.
///
/// The table is indexed by absolute page number, so it covers every page below
/// [`PHYSTOP`], including the ones occupied by firmware and the kernel image.
#[allow(clippy::cast_possible_truncation)]
pub const REFCOUNT_TABLE_LEN: usize = (PHYSTOP.as_u64() / PAGE_SIZE) as usize;

const _: () = {
    assert!(KERNBASE.is_aligned::<Size4K>());
    assert!(PHYSTOP.is_aligned::<Size4K>());
    assert!(PHYSTOP.as_u64() > KERNBASE.as_u64());
};
