//! # Physical Memory Address Types
//!
//! Strongly typed wrappers for raw physical addresses and page frames used by
//! the physical memory manager.
//!
//! ## Overview
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PhysicalAddress`] | A raw 64-bit physical address, no alignment promise. |
//! | [`PhysicalPage<S>`] | A page-aligned base of a physical page of size `S`. |
//! | [`PageSize`] | Marker trait carrying [`SIZE`](PageSize::SIZE) and [`SHIFT`](PageSize::SHIFT). |
//!
//! The only supported page size is [`Size4K`], which is also the default
//! parameter of [`PhysicalPage`].
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let pa = PhysicalAddress::new(0x8002_1234);
//!
//! // Align down to the containing frame and back to an address
//! let page: PhysicalPage = pa.page();
//! assert_eq!(page.base().as_u64(), 0x8002_1000);
//! assert_eq!(page.number(), 0x8_0021);
//!
//! // Only exactly aligned addresses become pages without rounding
//! assert!(PhysicalPage::<Size4K>::try_from_addr(pa).is_none());
//! ```
//!
//! ## Design Notes
//!
//! - The types are `#[repr(transparent)]` and implement `Copy`, `Eq`, `Ord`, and
//!   `Hash`, making them suitable as map keys.
//! - All alignment calculations are `const fn`; overflowing operations return
//!   `Option` instead of wrapping.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod page_size;
mod physical_address;
mod physical_page;

pub use page_size::{PageSize, Size4K};
pub use physical_address::PhysicalAddress;
pub use physical_page::PhysicalPage;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_aligns_down() {
        let a = PhysicalAddress::new(0x12345);
        assert_eq!(a.page::<Size4K>().base().as_u64(), 0x12000);
        assert_eq!(a.offset::<Size4K>(), 0x345);
    }

    #[test]
    fn align_up_rounds_to_next_boundary() {
        assert_eq!(
            PhysicalAddress::new(0x1000).align_up::<Size4K>(),
            Some(PhysicalAddress::new(0x1000))
        );
        assert_eq!(
            PhysicalAddress::new(0x1001).align_up::<Size4K>(),
            Some(PhysicalAddress::new(0x2000))
        );
        assert_eq!(PhysicalAddress::new(u64::MAX).align_up::<Size4K>(), None);
    }

    #[test]
    fn page_numbers_round_trip() {
        let page = PhysicalPage::<Size4K>::from_number(0x80_001).unwrap();
        assert_eq!(page.base().as_u64(), 0x8000_1000);
        assert_eq!(page.number(), 0x80_001);
        assert_eq!(PhysicalPage::<Size4K>::from_number(u64::MAX), None);
    }

    #[test]
    fn try_from_addr_rejects_unaligned() {
        assert!(PhysicalPage::<Size4K>::try_from_addr(PhysicalAddress::new(0x2000)).is_some());
        assert!(PhysicalPage::<Size4K>::try_from_addr(PhysicalAddress::new(0x2008)).is_none());
    }

    #[test]
    fn next_page_stops_at_top_of_address_space() {
        let page = PhysicalPage::<Size4K>::containing(PhysicalAddress::new(0x3000));
        assert_eq!(page.next().map(PhysicalPage::number), Some(4));

        let last = PhysicalPage::<Size4K>::containing(PhysicalAddress::new(u64::MAX));
        assert_eq!(last.next(), None);
    }

    #[test]
    fn display_formats() {
        let page = PhysicalPage::<Size4K>::containing(PhysicalAddress::new(0x8000_0000));
        assert_eq!(format!("{page}"), "0x0000000080000000/4K");
        assert_eq!(
            format!("{}", PhysicalAddress::new(0x42)),
            "0x0000000000000042"
        );
    }
}
