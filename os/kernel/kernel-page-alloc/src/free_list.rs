use crate::mapper::PhysMapper;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage};

/// Link value terminating the list. Never page aligned, so never a page.
const END: u64 = u64::MAX;

/// Header written into the first bytes of every **free** page.
///
/// ```text
/// +-------------+------------------------------+
/// | Run { next }|  stale bytes (FREE_JUNK)     |
/// +-------------+------------------------------+
/// ^ page base   ^ page base + 8                ^ page base + 4096
/// ```
#[repr(C)]
struct Run {
    /// Physical address of the next free page, or [`END`].
    next: u64,
}

/// Intrusive LIFO stack of free pages.
///
/// The list stores nothing but its head; each free page carries the link to
/// the next one. This is only sound because a page on the list has no owner
/// and nobody reads or writes it until it is popped again.
///
/// Links read back from page memory are untrusted: `pop` runs the caller's
/// check on the head before dereferencing it.
pub(crate) struct FreeList {
    head: Option<PhysicalAddress>,
    len: usize,
}

impl FreeList {
    pub(crate) const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn head(&self) -> Option<PhysicalAddress> {
        self.head
    }

    /// Prepend `page`, overwriting its first bytes with the link.
    ///
    /// # Safety
    /// - `page` must be mapped by `mapper` and have no owner.
    /// - `page` must not already be on the list.
    pub(crate) unsafe fn push<M: PhysMapper>(&mut self, mapper: &M, page: PhysicalPage) {
        let run: &mut Run = unsafe { mapper.phys_to_mut(page.base()) };
        run.next = self.head.map_or(END, PhysicalAddress::as_u64);
        self.head = Some(page.base());
        self.len += 1;
    }

    /// Remove and return the head, or `None` if the list is empty.
    ///
    /// `check` turns the raw head address into a page; it is expected to
    /// diverge if the address is not one the list could legitimately hold.
    ///
    /// # Safety
    /// Every page accepted by `check` must be mapped by `mapper`.
    pub(crate) unsafe fn pop<M: PhysMapper>(
        &mut self,
        mapper: &M,
        check: impl FnOnce(PhysicalAddress) -> PhysicalPage,
    ) -> Option<PhysicalPage> {
        let page = check(self.head?);
        // SAFETY: `check` accepted the page; caller guarantees it is mapped.
        self.head = unsafe { Self::next_of(mapper, page) };
        self.len -= 1;
        Some(page)
    }

    /// The link stored in `page`, i.e. the address of the page after it.
    ///
    /// # Safety
    /// `page` must be on the list and mapped by `mapper`.
    pub(crate) unsafe fn next_of<M: PhysMapper>(
        mapper: &M,
        page: PhysicalPage,
    ) -> Option<PhysicalAddress> {
        let run: &mut Run = unsafe { mapper.phys_to_mut(page.base()) };
        (run.next != END).then(|| PhysicalAddress::new(run.next))
    }
}
