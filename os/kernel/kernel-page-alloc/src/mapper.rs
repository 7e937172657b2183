//! # Physical memory access
//!
//! The allocator only knows physical addresses, but the CPU can only
//! dereference virtual ones. [`PhysMapper`] bridges the two so the same
//! allocator runs in the kernel (identity map or higher-half direct map) and
//! in host tests (a heap buffer standing in for RAM).

use kernel_memory_addresses::{PageSize, PhysicalAddress, PhysicalPage, Size4K};

#[allow(clippy::cast_possible_truncation)]
const PAGE_BYTES: usize = Size4K::SIZE as usize;

/// Converts physical addresses to usable references in the current address
/// space.
pub trait PhysMapper {
    /// Convert a *physical* address to a usable mutable reference.
    ///
    /// # Safety
    /// - `pa` must be mapped writable in the current address space for at
    ///   least `size_of::<T>()` bytes and suitably aligned for `T`.
    /// - The mapping must stay valid for `'a`, and no other reference to the
    ///   same bytes may be live while the returned one is used.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T;

    /// Overwrite the whole 4 KiB page with `byte`.
    ///
    /// # Safety
    /// Same contract as [`phys_to_mut`](Self::phys_to_mut) for the full page.
    unsafe fn fill_page(&self, page: PhysicalPage, byte: u8) {
        let bytes: &mut [u8; PAGE_BYTES] = unsafe { self.phys_to_mut(page.base()) };
        bytes.fill(byte);
    }
}

/// [`PhysMapper`] for memory that is mapped linearly at a fixed offset:
/// `virt = phys + offset`.
///
/// An offset of zero is the identity map used by kernels that run with
/// physical memory mapped one-to-one; a higher-half direct map uses its base
/// address as the offset.
///
/// ```
/// # use kernel_memory_addresses::PhysicalAddress;
/// # use kernel_page_alloc::{DirectMap, PhysMapper};
/// let mut word = 0u64;
/// let virt = core::ptr::from_mut(&mut word).expose_provenance() as u64;
/// let map = DirectMap::with_offset(virt.wrapping_sub(0x8000_0000));
///
/// let slot: &mut u64 = unsafe { map.phys_to_mut(PhysicalAddress::new(0x8000_0000)) };
/// *slot = 42;
/// assert_eq!(word, 42);
/// ```
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct DirectMap {
    offset: u64,
}

impl DirectMap {
    /// Physical addresses are usable as-is.
    pub const IDENTITY: Self = Self { offset: 0 };

    #[must_use]
    pub const fn with_offset(offset: u64) -> Self {
        Self { offset }
    }

    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }
}

impl PhysMapper for DirectMap {
    #[allow(clippy::cast_possible_truncation)]
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        let va = pa.as_u64().wrapping_add(self.offset) as usize;
        // SAFETY: caller guarantees `pa` is mapped at `pa + offset`.
        unsafe { &mut *core::ptr::with_exposed_provenance_mut::<T>(va) }
    }
}
