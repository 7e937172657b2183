//! Simulated physical RAM for host tests.

#![allow(dead_code)]

use kernel_memory_addresses::PhysicalAddress;
use kernel_page_alloc::{DirectMap, ManagedRange, PageAllocator};

/// Physical address of the first simulated frame.
pub const RAM_BASE: u64 = 0x10_0000;
pub const PAGE: u64 = 4096;

#[repr(C, align(4096))]
pub struct Frame([u8; 4096]);

/// A run of page-aligned host frames pretending to be physical memory at
/// [`RAM_BASE`].
pub struct TestRam {
    base: *mut Frame,
    frames: usize,
    _storage: Vec<Frame>,
}

impl TestRam {
    pub fn new(frames: usize) -> Self {
        let mut storage: Vec<Frame> = (0..frames).map(|_| Frame([0; 4096])).collect();
        Self {
            base: storage.as_mut_ptr(),
            frames,
            _storage: storage,
        }
    }

    pub fn end(&self) -> PhysicalAddress {
        pa(RAM_BASE + self.frames as u64 * PAGE)
    }

    pub fn mapper(&self) -> DirectMap {
        DirectMap::with_offset((self.base.expose_provenance() as u64).wrapping_sub(RAM_BASE))
    }

    pub fn range(&self) -> ManagedRange {
        ManagedRange::new(pa(RAM_BASE), self.end()).unwrap()
    }

    /// Reference-count storage large enough for [`range`](Self::range).
    pub fn table(&self) -> Vec<u32> {
        vec![0; self.range().table_len()]
    }

    pub fn allocator<'t>(&'t self, table: &'t mut [u32]) -> PageAllocator<'t, DirectMap> {
        unsafe { PageAllocator::init(self.range(), table, self.mapper()) }.unwrap()
    }

    fn frame_ptr(&self, addr: impl Into<PhysicalAddress>) -> *mut Frame {
        let addr = addr.into().as_u64();
        assert!(
            addr >= RAM_BASE && addr < self.end().as_u64(),
            "{addr:#x} is not simulated"
        );
        let index = ((addr - RAM_BASE) / PAGE) as usize;
        unsafe { self.base.add(index) }
    }

    /// Copy of the page containing `addr`.
    pub fn page_bytes(&self, addr: impl Into<PhysicalAddress>) -> Vec<u8> {
        let frame = self.frame_ptr(addr).cast::<[u8; 4096]>();
        unsafe { frame.read() }.to_vec()
    }

    pub fn fill(&self, addr: impl Into<PhysicalAddress>, byte: u8) {
        let frame = self.frame_ptr(addr).cast::<[u8; 4096]>();
        unsafe { frame.write([byte; 4096]) }
    }

    /// Overwrite the first word of a page, i.e. the free-list link.
    pub fn write_link(&self, addr: impl Into<PhysicalAddress>, value: u64) {
        unsafe { self.frame_ptr(addr).cast::<u64>().write(value) }
    }

    pub fn read_link(&self, addr: impl Into<PhysicalAddress>) -> u64 {
        unsafe { self.frame_ptr(addr).cast::<u64>().read() }
    }
}

pub fn pa(value: u64) -> PhysicalAddress {
    PhysicalAddress::new(value)
}

/// Physical address of simulated frame `n`.
pub fn frame(n: u64) -> PhysicalAddress {
    pa(RAM_BASE + n * PAGE)
}
