//! # Kernel ELF Introspection
//!
//! Host-side reader for the kernel's 64-bit little-endian ELF image.
//!
//! ## What you get
//! - [`KernelElf`]: parsed program headers, section headers and `.symtab`.
//! - Symbol lookup by exact name ([`KernelElf::symbol_value`]).
//! - Address questions answered through the covering program header:
//!   [`segment_containing`](KernelElf::segment_containing),
//!   [`virt_to_phys`](KernelElf::virt_to_phys) and
//!   [`virt_to_file_offset`](KernelElf::virt_to_file_offset).
//! - [`LoadSegment`]s with the names of the sections they contain.
//!
//! ## Address Relations
//!
//! For a program header covering `va` (`p_vaddr <= va < p_vaddr + p_memsz`):
//!
//! ```text
//! phys(va)        = va - (p_vaddr - p_paddr)    (mod 2⁶⁴)
//! file_offset(va) = va - p_vaddr + p_offset
//! ```
//!
//! ## Features
//! - `builder`: [`ElfBuilder`], a writer for small synthetic images used by
//!   tests.

mod error;
mod kernel_elf;
pub mod raw;
mod section;
mod segment;

#[cfg(any(test, feature = "builder"))]
mod builder;

#[cfg(any(test, feature = "builder"))]
pub use crate::builder::ElfBuilder;
pub use crate::error::ElfError;
pub use crate::kernel_elf::{KernelElf, Machine};
pub use crate::section::{Section, Symbol};
pub use crate::segment::{LoadSegment, Segment, SegmentFlags};
