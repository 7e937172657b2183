//! # Kernel Configuration
//!
//! Compile-time constants describing the machine the kernel manages. This
//! crate is the single source of truth for the physical memory layout shared
//! by the boot code, the linker script and the physical page allocator.
//!
//! ## Physical Memory Layout
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │     Device MMIO / firmware      │
//! KERNBASE    ├─────────────────────────────────┤ 0x8000_0000
//!             │       Kernel Image              │
//!             │   (Text, Data, BSS)             │
//! end         ├─────────────────────────────────┤ (linker symbol)
//!             │    Available RAM                │
//!             │  (Managed by page allocator)    │
//! PHYSTOP     └─────────────────────────────────┘ KERNBASE + 128 MiB
//! ```
//!
//! The first free address (`end`) is only known at link time; the kernel
//! passes it to the allocator when it initializes the managed range.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;
