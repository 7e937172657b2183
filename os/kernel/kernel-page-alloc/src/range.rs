//! The physical address range handed to the allocator.

use crate::error::{AddressFault, InitError};
use core::iter::FusedIterator;
use kernel_info::memory::PHYSTOP;
use kernel_memory_addresses::{PageSize, PhysicalAddress, PhysicalPage, Size4K};

/// Page-aligned, non-empty range `[start, end)` of physical memory owned by
/// the page allocator.
///
/// `start` is the first page boundary at or after the end of the kernel
/// image, `end` the last page boundary at or below the top of RAM. Partial
/// pages at either side are never handed out.
///
/// ```
/// # use kernel_memory_addresses::PhysicalAddress;
/// # use kernel_page_alloc::ManagedRange;
/// let range = ManagedRange::new(
///     PhysicalAddress::new(0x8002_1234),
///     PhysicalAddress::new(0x8003_0000),
/// )
/// .unwrap();
/// assert_eq!(range.start().as_u64(), 0x8002_2000);
/// assert_eq!(range.page_count(), 14);
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ManagedRange {
    start: PhysicalAddress,
    end: PhysicalAddress,
}

impl ManagedRange {
    /// Build the range from the first byte after the kernel image and the top
    /// of physical memory.
    ///
    /// # Errors
    /// [`InitError::EmptyRange`] if no whole page fits between the two.
    pub fn new(kernel_end: PhysicalAddress, phys_top: PhysicalAddress) -> Result<Self, InitError> {
        let end = phys_top.page::<Size4K>().base();
        match kernel_end.align_up::<Size4K>() {
            Some(start) if start < end => Ok(Self { start, end }),
            _ => Err(InitError::EmptyRange {
                start: kernel_end,
                end: phys_top,
            }),
        }
    }

    /// Range from `kernel_end` up to the configured [`PHYSTOP`].
    ///
    /// # Errors
    /// [`InitError::EmptyRange`] if the kernel image reaches `PHYSTOP`.
    pub fn up_to_phystop(kernel_end: PhysicalAddress) -> Result<Self, InitError> {
        Self::new(kernel_end, PHYSTOP)
    }

    #[inline]
    #[must_use]
    pub const fn start(&self) -> PhysicalAddress {
        self.start
    }

    #[inline]
    #[must_use]
    pub const fn end(&self) -> PhysicalAddress {
        self.end
    }

    /// Number of whole pages in the range.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn page_count(&self) -> usize {
        ((self.end.as_u64() - self.start.as_u64()) >> Size4K::SHIFT) as usize
    }

    /// Entries a table indexed by absolute page number needs to cover every
    /// page of the range.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn table_len(&self) -> usize {
        (self.end.as_u64() >> Size4K::SHIFT) as usize
    }

    /// Validate that `addr` names a page of this range.
    ///
    /// # Errors
    /// The [`AddressFault`] describing why `addr` is not a managed page.
    pub fn check(&self, addr: PhysicalAddress) -> Result<PhysicalPage, AddressFault> {
        let Some(page) = PhysicalPage::try_from_addr(addr) else {
            return Err(AddressFault::Misaligned);
        };
        if addr < self.start {
            Err(AddressFault::BelowRange { start: self.start })
        } else if addr >= self.end {
            Err(AddressFault::AboveRange { end: self.end })
        } else {
            Ok(page)
        }
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, addr: PhysicalAddress) -> bool {
        self.check(addr).is_ok()
    }

    /// All pages of the range in ascending order.
    #[must_use]
    pub const fn pages(&self) -> Pages {
        Pages {
            next: self.start.as_u64(),
            end: self.end.as_u64(),
        }
    }
}

/// Iterator over the pages of a [`ManagedRange`].
#[derive(Debug, Clone)]
pub struct Pages {
    next: u64,
    end: u64,
}

impl Iterator for Pages {
    type Item = PhysicalPage;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let page = PhysicalPage::containing(PhysicalAddress::new(self.next));
        self.next += Size4K::SIZE;
        Some(page)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        #[allow(clippy::cast_possible_truncation)]
        let n = (self.end.saturating_sub(self.next) >> Size4K::SHIFT) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Pages {}
impl FusedIterator for Pages {}

#[cfg(test)]
mod tests {
    use super::*;

    fn pa(v: u64) -> PhysicalAddress {
        PhysicalAddress::new(v)
    }

    #[test]
    fn rounds_start_up_and_end_down() {
        let range = ManagedRange::new(pa(0x8000_0001), pa(0x8000_5fff)).unwrap();
        assert_eq!(range.start(), pa(0x8000_1000));
        assert_eq!(range.end(), pa(0x8000_5000));
        assert_eq!(range.page_count(), 4);
        assert_eq!(range.table_len(), 0x8_0005);
    }

    #[test]
    fn rejects_ranges_without_a_whole_page() {
        assert_eq!(
            ManagedRange::new(pa(0x8000_0001), pa(0x8000_1fff)),
            Err(InitError::EmptyRange {
                start: pa(0x8000_0001),
                end: pa(0x8000_1fff)
            })
        );
        assert!(ManagedRange::new(pa(0x9000_0000), pa(0x8000_0000)).is_err());
        assert!(ManagedRange::new(pa(u64::MAX - 5), pa(u64::MAX)).is_err());
    }

    #[test]
    fn phystop_range_ends_at_phystop() {
        let range = ManagedRange::up_to_phystop(pa(0x8002_0000)).unwrap();
        assert_eq!(range.end(), PHYSTOP);
    }

    #[test]
    fn check_classifies_addresses() {
        let range = ManagedRange::new(pa(0x1000), pa(0x4000)).unwrap();
        assert_eq!(range.check(pa(0x2000)).map(PhysicalPage::number), Ok(2));
        assert_eq!(range.check(pa(0x2008)), Err(AddressFault::Misaligned));
        assert_eq!(
            range.check(pa(0x0)),
            Err(AddressFault::BelowRange { start: pa(0x1000) })
        );
        assert_eq!(
            range.check(pa(0x4000)),
            Err(AddressFault::AboveRange { end: pa(0x4000) })
        );
        assert!(range.contains(pa(0x3000)));
        assert!(!range.contains(pa(0x5000)));
    }

    #[test]
    fn pages_walks_every_page_once() {
        let range = ManagedRange::new(pa(0x1000), pa(0x4000)).unwrap();
        let pages = range.pages();
        assert_eq!(pages.len(), 3);
        let numbers: Vec<u64> = pages.map(PhysicalPage::number).collect();
        assert_eq!(numbers, [1, 2, 3]);
    }
}
