//! # Reference-Counted Physical Page Allocator
//!
//! Hands out 4 KiB physical pages for kernel stacks, page tables, user memory
//! and pipe buffers. Every page carries an owner count, so one physical page
//! can be shared by several owners (copy-on-write fork being the main user)
//! and only returns to the pool when the last of them releases it.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  PageAllocator                       │
//! │   allocate / release / add_reference / audit         │
//! │                                                      │
//! │   SpinLock "kmem"                                    │
//! │   ┌───────────────────┐   ┌────────────────────────┐ │
//! │   │ FreeList          │   │ RefCountTable          │ │
//! │   │ head ──► page ──► │   │ [u32; PHYSTOP / 4096]  │ │
//! │   │ (links in pages)  │   │ indexed by page number │ │
//! │   └───────────────────┘   └────────────────────────┘ │
//! └──────────────┬───────────────────────────────────────┘
//!                │ PhysMapper (identity / direct map)
//! ┌──────────────▼───────────────────────────────────────┐
//! │     physical RAM  [ManagedRange.start, .end)         │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Page Lifecycle
//!
//! ```text
//!            allocate                add_reference
//!   Free(0) ─────────► Owned(1) ───────────────────► Owned(n + 1)
//!      ▲                  │ ▲                              │
//!      │    release       │ └──────────── release ─────────┘
//!      └──────────────────┘              (n + 1 > 1)
//! ```
//!
//! At boot every page of the managed range is registered with one owner and
//! released once, which is what puts it on the free list.
//!
//! ## Failure Model
//!
//! * Running out of pages is normal: [`PageAllocator::allocate`] returns `None`.
//! * Configuration problems are [`InitError`]s.
//! * Contract violations (foreign or misaligned addresses, double frees, adding
//!   an owner to a free page, a corrupted free list) are logged at `error`
//!   level and panic.
//!
//! ## Usage
//!
//! ```
//! # use kernel_memory_addresses::PhysicalAddress;
//! # use kernel_page_alloc::{DirectMap, ManagedRange, PageAllocator};
//! #[repr(C, align(4096))]
//! struct Frame([u8; 4096]);
//!
//! // Four frames of host memory standing in for physical 0x1_0000..0x1_4000.
//! let mut ram: Vec<Frame> = (0..4).map(|_| Frame([0; 4096])).collect();
//! let offset = ram.as_mut_ptr().expose_provenance() as u64;
//! let mapper = DirectMap::with_offset(offset.wrapping_sub(0x1_0000));
//!
//! let range = ManagedRange::new(PhysicalAddress::new(0x1_0000), PhysicalAddress::new(0x1_4000))?;
//! let mut table = vec![0; range.table_len()];
//! let kmem = unsafe { PageAllocator::init(range, &mut table, mapper)? };
//! assert_eq!(kmem.free_pages(), 4);
//!
//! let page = kmem.allocate().unwrap();
//! kmem.add_reference(page);
//! kmem.release(page);
//! assert_eq!(kmem.ref_count(page), Some(1));
//! kmem.release(page);
//! assert_eq!(kmem.audit(), Ok(4));
//! # Ok::<(), kernel_page_alloc::InitError>(())
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod error;
mod frame_alloc;
mod free_list;
pub mod kmem;
mod mapper;
mod page_alloc;
mod range;
mod refcount;

pub use error::{AddressFault, Fault, InitError, RefStateFault};
pub use frame_alloc::FrameAlloc;
pub use mapper::{DirectMap, PhysMapper};
pub use page_alloc::{ALLOC_JUNK, FREE_JUNK, PageAllocator};
pub use range::{ManagedRange, Pages};
pub use refcount::RefCountStorage;
