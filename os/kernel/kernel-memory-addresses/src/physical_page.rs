use crate::{PageSize, PhysicalAddress, Size4K};
use core::fmt;
use core::marker::PhantomData;

/// Physical memory page base for size `S`.
///
/// A `PhysicalPage<S>` represents the **page-aligned base** of a physical page
/// of size `S` (`S::SIZE` bytes). Page frames are what physical allocators hand
/// out; the page's [`number`](Self::number) (base divided by the page size) is
/// the natural index into per-frame bookkeeping tables.
///
/// ### Invariants
/// - The low `S::SHIFT` bits of the base are always zero (page aligned).
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let pp = PhysicalPage::<Size4K>::try_from_addr(PhysicalAddress::new(0x8000_3000)).unwrap();
/// assert_eq!(pp.number(), 0x8_0003);
/// assert_eq!(PhysicalPage::<Size4K>::from_number(0x8_0003), Some(pp));
/// assert!(PhysicalPage::<Size4K>::try_from_addr(PhysicalAddress::new(0x8000_3001)).is_none());
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage<S: PageSize = Size4K> {
    base: u64,
    _phantom: PhantomData<S>,
}

impl<S: PageSize> PhysicalPage<S> {
    /// Page that contains `addr` (aligns down).
    #[inline]
    #[must_use]
    pub const fn containing(addr: PhysicalAddress) -> Self {
        Self {
            base: addr.as_u64() & !S::MASK,
            _phantom: PhantomData,
        }
    }

    /// Page starting exactly at `addr`, or `None` if `addr` is not aligned.
    #[inline]
    #[must_use]
    pub const fn try_from_addr(addr: PhysicalAddress) -> Option<Self> {
        if addr.is_aligned::<S>() {
            Some(Self::containing(addr))
        } else {
            None
        }
    }

    /// Page with the given page number, or `None` if its base would not fit
    /// into 64 bits.
    #[inline]
    #[must_use]
    pub const fn from_number(number: u64) -> Option<Self> {
        if number > (u64::MAX >> S::SHIFT) {
            return None;
        }
        Some(Self {
            base: number << S::SHIFT,
            _phantom: PhantomData,
        })
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.base)
    }

    /// Page number, i.e. `base / S::SIZE`.
    #[inline]
    #[must_use]
    pub const fn number(self) -> u64 {
        self.base >> S::SHIFT
    }

    /// The page directly following this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.base.checked_add(S::SIZE) {
            Some(base) => Some(Self {
                base,
                _phantom: PhantomData,
            }),
            None => None,
        }
    }
}

impl<S> fmt::Display for PhysicalPage<S>
where
    S: PageSize,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}/{}", self.base, S::as_str())
    }
}

impl<S: PageSize> fmt::Debug for PhysicalPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalPage<{}>({:#018X})", S::as_str(), self.base)
    }
}
