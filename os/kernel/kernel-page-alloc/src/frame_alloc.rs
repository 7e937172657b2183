use crate::mapper::PhysMapper;
use crate::page_alloc::PageAllocator;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage};

/// Source of 4 KiB physical frames, e.g. for page-table pages.
pub trait FrameAlloc {
    /// Allocate one 4 KiB *physical* frame. Must return page-aligned frames.
    fn alloc_4k(&mut self) -> Option<PhysicalAddress>;

    /// Return a frame previously obtained from [`alloc_4k`](Self::alloc_4k).
    fn free_4k(&mut self, pa: PhysicalAddress);
}

/// Frames drawn through this impl have a single owner; `free_4k` drops it.
impl<M: PhysMapper> FrameAlloc for &PageAllocator<'_, M> {
    fn alloc_4k(&mut self) -> Option<PhysicalAddress> {
        self.allocate().map(PhysicalPage::base)
    }

    fn free_4k(&mut self, pa: PhysicalAddress) {
        self.release(pa);
    }
}
