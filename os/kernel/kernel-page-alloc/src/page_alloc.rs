//! The reference-counted physical page allocator.

use crate::error::{Fault, InitError, RefStateFault, fatal};
use crate::free_list::FreeList;
use crate::mapper::PhysMapper;
use crate::range::ManagedRange;
use crate::refcount::RefCountTable;
use core::fmt;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage};
use kernel_sync::SpinLock;
use log::{info, trace, warn};

/// Byte written over every page handed out by [`PageAllocator::allocate`].
///
/// Deliberately non-zero so code that relies on fresh pages being zeroed
/// without clearing them itself misbehaves visibly.
pub const ALLOC_JUNK: u8 = 5;

/// Byte written over every page whose last owner released it, so dangling
/// references read garbage instead of stale data.
pub const FREE_JUNK: u8 = 1;

/// State guarded by the allocator lock.
struct Kmem<'t> {
    free: FreeList,
    refs: RefCountTable<'t>,
}

/// Allocator of 4 KiB physical pages with per-page owner counts.
///
/// A page is in exactly one of two states:
///
/// * **free**: owner count 0 and linked into the free list;
/// * **owned**: owner count `n >= 1`, not on the free list.
///
/// [`allocate`](Self::allocate) moves a page from free to owned with one
/// owner, [`add_reference`](Self::add_reference) adds owners (e.g. when a
/// copy-on-write fork shares the page), and [`release`](Self::release) drops
/// one; the page only becomes free again when the last owner lets go.
///
/// All bookkeeping is serialized by one spin lock (`"kmem"`). Page contents
/// are scrubbed outside of it.
///
/// Passing an address that is not a managed page, adding an owner to a free
/// page or releasing a free page is a fatal contract violation: the fault is
/// logged and the allocator panics.
pub struct PageAllocator<'t, M: PhysMapper> {
    range: ManagedRange,
    mapper: M,
    kmem: SpinLock<Kmem<'t>>,
}

impl<'t, M: PhysMapper> PageAllocator<'t, M> {
    /// Create the allocator and put every page of `range` on the free list.
    ///
    /// `table` backs the reference-count table. It is zeroed and must have at
    /// least [`range.table_len()`](ManagedRange::table_len) entries.
    ///
    /// # Errors
    /// [`InitError::TableTooSmall`] if `table` cannot index every page of `range`.
    ///
    /// # Safety
    /// - `mapper` must map every page of `range` to valid, writable memory for
    ///   the whole lifetime of the allocator.
    /// - That memory must belong to the allocator: nothing else may touch a
    ///   page unless it currently owns it through [`allocate`](Self::allocate)
    ///   or [`add_reference`](Self::add_reference).
    pub unsafe fn init(
        range: ManagedRange,
        table: &'t mut [u32],
        mapper: M,
    ) -> Result<Self, InitError> {
        let refs = RefCountTable::new(table, range.table_len())?;
        let this = Self {
            range,
            mapper,
            kmem: SpinLock::new(
                "kmem",
                Kmem {
                    free: FreeList::new(),
                    refs,
                },
            ),
        };
        this.free_range();
        info!(
            "page allocator: {} pages free in [{}, {})",
            this.free_pages(),
            range.start(),
            range.end()
        );
        Ok(this)
    }

    /// Register every page with a single synthetic owner and release it, so
    /// bootstrap takes the same path as any later free.
    fn free_range(&self) {
        for page in self.range.pages() {
            self.kmem.lock().refs.initialize(page, 1);
            self.release(page);
        }
    }

    /// Take a free page. The page has one owner and is filled with
    /// [`ALLOC_JUNK`].
    ///
    /// Returns `None` when no page is free; the call never waits for one.
    #[must_use]
    pub fn allocate(&self) -> Option<PhysicalPage> {
        let mut kmem = self.kmem.lock();
        // SAFETY: `check_free` only accepts managed pages, which `init`'s
        // contract guarantees to be mapped.
        let page = unsafe { kmem.free.pop(&self.mapper, |addr| self.check_free(addr)) };
        let Some(page) = page else {
            drop(kmem);
            warn!("allocate: out of physical pages");
            return None;
        };

        let count = kmem.refs.get(page);
        if count != 0 {
            fatal(
                "allocate",
                Fault::InvalidRefState {
                    addr: page.base(),
                    count,
                    reason: RefStateFault::StillOwned,
                },
            );
        }
        kmem.refs.initialize(page, 1);
        drop(kmem);

        // SAFETY: the page just left the free list with a single owner (us).
        unsafe { self.mapper.fill_page(page, ALLOC_JUNK) };
        trace!("allocate: {page}");
        Some(page)
    }

    /// Give up one ownership of `addr`.
    ///
    /// When the last owner releases the page it is filled with [`FREE_JUNK`]
    /// and returned to the free list.
    ///
    /// # Panics
    /// If `addr` is not a managed page, or the page has no owner.
    pub fn release(&self, addr: impl Into<PhysicalAddress>) {
        let addr = addr.into();
        let page = self.check_owned("release", addr);

        let remaining = {
            let mut kmem = self.kmem.lock();
            match kmem.refs.decrement(page) {
                Ok(remaining) => remaining,
                Err(reason) => fatal(
                    "release",
                    Fault::InvalidRefState {
                        addr,
                        count: kmem.refs.get(page),
                        reason,
                    },
                ),
            }
        };
        if remaining > 0 {
            trace!("release: {page} still has {remaining} owners");
            return;
        }

        // SAFETY: the count hit zero, so the caller was the last owner, and the
        // page is not yet reachable through the free list.
        unsafe { self.mapper.fill_page(page, FREE_JUNK) };

        let mut kmem = self.kmem.lock();
        // SAFETY: managed page (mapped), no owner, not on the list.
        unsafe { kmem.free.push(&self.mapper, page) };
        drop(kmem);
        trace!("release: {page} is free");
    }

    /// Record an additional owner of the already owned page `addr`.
    ///
    /// # Panics
    /// If `addr` is not a managed page, or the page currently has no owner.
    pub fn add_reference(&self, addr: impl Into<PhysicalAddress>) {
        let addr = addr.into();
        let page = self.check_owned("add_reference", addr);

        let mut kmem = self.kmem.lock();
        let owners = match kmem.refs.increment(page) {
            Ok(owners) => owners,
            Err(reason) => fatal(
                "add_reference",
                Fault::InvalidRefState {
                    addr,
                    count: kmem.refs.get(page),
                    reason,
                },
            ),
        };
        drop(kmem);
        trace!("add_reference: {page} now has {owners} owners");
    }

    /// Owner count of `addr`, or `None` if it is not a managed page.
    #[must_use]
    pub fn ref_count(&self, addr: impl Into<PhysicalAddress>) -> Option<u32> {
        let page = self.range.check(addr.into()).ok()?;
        Some(self.kmem.lock().refs.get(page))
    }

    /// Number of pages on the free list.
    #[must_use]
    pub fn free_pages(&self) -> usize {
        self.kmem.lock().free.len()
    }

    /// Total number of managed pages.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.range.page_count()
    }

    #[must_use]
    pub const fn range(&self) -> ManagedRange {
        self.range
    }

    #[must_use]
    pub const fn mapper(&self) -> &M {
        &self.mapper
    }

    /// Check the free list against the reference counts and return the
    /// number of free pages.
    ///
    /// Every listed page must be managed and have no owner, the list must be
    /// exactly as long as recorded, and every page without an owner must be on
    /// it. The last check only holds at quiescent points: a concurrent
    /// `release` briefly has an ownerless page that is not listed yet.
    ///
    /// # Errors
    /// The first [`Fault`] found.
    pub fn audit(&self) -> Result<usize, Fault> {
        let kmem = self.kmem.lock();
        let recorded = kmem.free.len();

        let mut walked = 0;
        let mut cursor = kmem.free.head();
        while let Some(addr) = cursor {
            if walked == recorded {
                return Err(Fault::FreeListLength {
                    recorded,
                    walked: walked + 1,
                });
            }
            let page = self
                .range
                .check(addr)
                .map_err(|reason| Fault::InvalidAddress { addr, reason })?;
            let count = kmem.refs.get(page);
            if count != 0 {
                return Err(Fault::InvalidRefState {
                    addr,
                    count,
                    reason: RefStateFault::StillOwned,
                });
            }
            walked += 1;
            // SAFETY: validated page on the list.
            cursor = unsafe { FreeList::next_of(&self.mapper, page) };
        }
        if walked != recorded {
            return Err(Fault::FreeListLength { recorded, walked });
        }

        let unowned = self
            .range
            .pages()
            .filter(|&page| kmem.refs.get(page) == 0)
            .count();
        if unowned != recorded {
            return Err(Fault::LostPages {
                unowned,
                listed: recorded,
            });
        }
        Ok(walked)
    }

    /// Address check for pages coming back from callers.
    fn check_owned(&self, op: &'static str, addr: PhysicalAddress) -> PhysicalPage {
        self.range
            .check(addr)
            .unwrap_or_else(|reason| fatal(op, Fault::InvalidAddress { addr, reason }))
    }

    /// Address check for links read back from the free list.
    fn check_free(&self, addr: PhysicalAddress) -> PhysicalPage {
        self.range
            .check(addr)
            .unwrap_or_else(|reason| fatal("allocate", Fault::InvalidAddress { addr, reason }))
    }
}

impl<M: PhysMapper> fmt::Debug for PageAllocator<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageAllocator")
            .field("range", &self.range)
            .field("capacity", &self.capacity())
            .field("lock", &self.kmem)
            .finish_non_exhaustive()
    }
}
