//! Per-page owner counts.

use crate::error::{InitError, RefStateFault};
use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};
use kernel_memory_addresses::PhysicalPage;

/// Owner count for every page number below the end of the managed range.
///
/// The table borrows its storage so it can live in `.bss` (kernel) or in a
/// `Vec` (tests). It performs no locking; the allocator only touches it while
/// holding its lock.
pub(crate) struct RefCountTable<'t> {
    counts: &'t mut [u32],
}

impl<'t> RefCountTable<'t> {
    /// Zero `storage` and use it as a table of at least `required` entries.
    pub(crate) fn new(storage: &'t mut [u32], required: usize) -> Result<Self, InitError> {
        if storage.len() < required {
            return Err(InitError::TableTooSmall {
                required,
                provided: storage.len(),
            });
        }
        storage.fill(0);
        Ok(Self { counts: storage })
    }

    #[allow(clippy::cast_possible_truncation)]
    const fn index(page: PhysicalPage) -> usize {
        page.number() as usize
    }

    /// Overwrite the count. Only for bootstrapping and allocation, where the
    /// previous value has already been checked.
    pub(crate) fn initialize(&mut self, page: PhysicalPage, value: u32) {
        self.counts[Self::index(page)] = value;
    }

    /// Add an owner to a page that already has one.
    pub(crate) fn increment(&mut self, page: PhysicalPage) -> Result<u32, RefStateFault> {
        let count = &mut self.counts[Self::index(page)];
        if *count < 1 {
            return Err(RefStateFault::NotOwned);
        }
        *count = count.checked_add(1).ok_or(RefStateFault::Saturated)?;
        Ok(*count)
    }

    /// Drop an owner and return how many remain.
    pub(crate) fn decrement(&mut self, page: PhysicalPage) -> Result<u32, RefStateFault> {
        let count = &mut self.counts[Self::index(page)];
        *count = count.checked_sub(1).ok_or(RefStateFault::DoubleFree)?;
        Ok(*count)
    }

    pub(crate) fn get(&self, page: PhysicalPage) -> u32 {
        self.counts[Self::index(page)]
    }
}

/// Statically allocated backing store for a [`RefCountTable`], claimable once.
///
/// ```
/// # use kernel_page_alloc::RefCountStorage;
/// static STORAGE: RefCountStorage<16> = RefCountStorage::new();
///
/// let table = STORAGE.claim().unwrap();
/// assert_eq!(table.len(), 16);
/// assert!(STORAGE.claim().is_none());
/// ```
pub struct RefCountStorage<const N: usize> {
    claimed: AtomicBool,
    counts: UnsafeCell<[u32; N]>,
}

// Safety: the only access to `counts` is the single `&mut` handed out by `claim`.
unsafe impl<const N: usize> Sync for RefCountStorage<N> {}

impl<const N: usize> Default for RefCountStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RefCountStorage<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            claimed: AtomicBool::new(false),
            counts: UnsafeCell::new([0; N]),
        }
    }

    /// Hand out the storage; `None` on every call after the first.
    #[must_use]
    #[allow(clippy::mut_from_ref)]
    pub fn claim(&'static self) -> Option<&'static mut [u32]> {
        if self.claimed.swap(true, Ordering::AcqRel) {
            return None;
        }
        // SAFETY: the flag guarantees this is the only reference ever created.
        Some(unsafe { &mut *self.counts.get() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_memory_addresses::{PhysicalAddress, Size4K};

    fn page(number: u64) -> PhysicalPage {
        PhysicalPage::<Size4K>::from_number(number).unwrap()
    }

    #[test]
    fn new_zeroes_storage() {
        let mut storage = vec![7u32; 8];
        let table = RefCountTable::new(&mut storage, 8).unwrap();
        assert_eq!(table.get(page(3)), 0);
        assert!(storage.iter().all(|&c| c == 0));
    }

    #[test]
    fn new_rejects_short_storage() {
        let mut storage = vec![0u32; 4];
        assert_eq!(
            RefCountTable::new(&mut storage, 5).err(),
            Some(InitError::TableTooSmall {
                required: 5,
                provided: 4
            })
        );
    }

    #[test]
    fn increment_requires_an_owner() {
        let mut storage = vec![0u32; 4];
        let mut table = RefCountTable::new(&mut storage, 4).unwrap();
        assert_eq!(table.increment(page(1)), Err(RefStateFault::NotOwned));
        assert_eq!(table.get(page(1)), 0);

        table.initialize(page(1), 1);
        assert_eq!(table.increment(page(1)), Ok(2));
        assert_eq!(table.increment(page(1)), Ok(3));
    }

    #[test]
    fn decrement_reports_remaining_owners() {
        let mut storage = vec![0u32; 4];
        let mut table = RefCountTable::new(&mut storage, 4).unwrap();
        table.initialize(page(2), 2);
        assert_eq!(table.decrement(page(2)), Ok(1));
        assert_eq!(table.decrement(page(2)), Ok(0));
        assert_eq!(table.decrement(page(2)), Err(RefStateFault::DoubleFree));
        assert_eq!(table.get(page(2)), 0);
    }

    #[test]
    fn increment_saturates() {
        let mut storage = vec![0u32; 2];
        let mut table = RefCountTable::new(&mut storage, 2).unwrap();
        table.initialize(page(0), u32::MAX);
        assert_eq!(table.increment(page(0)), Err(RefStateFault::Saturated));
        assert_eq!(table.get(page(0)), u32::MAX);
    }

    #[test]
    fn entries_are_indexed_by_page_number() {
        let mut storage = vec![0u32; 4];
        let mut table = RefCountTable::new(&mut storage, 4).unwrap();
        table.initialize(PhysicalAddress::new(0x3000).page(), 9);
        assert_eq!(storage, [0, 0, 0, 9]);
    }
}
