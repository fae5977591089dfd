//! # Kernel Memory Layout Facts
//!
//! Compile-time facts shared between the kernel and the build tooling that
//! precomputes the kernel's translation tables.
//!
//! ## Architecture
//!
//! ### Memory Layout Contract ([`memory`])
//! The symbols the kernel exports so host tools can find its layout:
//! * **Address Space**: size and start of the kernel's virtual address space
//! * **Table Slots**: where the translation tables and their base address live
//! * **Granule**: the translation granule the kernel's MMU setup expects
//!
//! ### Board Memory Maps ([`platform`])
//! Per-board physical memory facts, selected by a board identifier:
//! * **Raspberry Pi 3** (`rpi3`): physical space ends at `0x4001_0000`
//! * **Raspberry Pi 4** (`rpi4`): physical space ends at `0xFF85_0000`
//!
//! ```text
//! Physical Memory Layout (Raspberry Pi 4):
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │             DRAM                │
//! 0xFE00_0000 ├─────────────────────────────────┤
//!             │     MMIO (GPIO, UART, GIC)      │
//! 0xFF85_0000 └─────────────────────────────────┘ END
//! ```
//!
//! ## Usage
//! ```rust
//! use kernel_info::platform::Platform;
//!
//! let board: Platform = "rpi3".parse().unwrap();
//! assert_eq!(board.phys_addr_space_end_page().as_u64(), 0x4001_0000);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod memory;
pub mod platform;
