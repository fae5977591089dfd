//! # Sections and Symbols

use crate::raw::SHF_ALLOC;
use kernel_memory_addresses::VirtualAddress;

/// One section header, with its name resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    /// `sh_type`.
    pub kind: u32,
    /// `sh_flags`.
    pub flags: u64,
    pub addr: VirtualAddress,
    pub offset: u64,
    pub size: u64,
}

impl Section {
    /// Occupies memory at run time (`SHF_ALLOC`).
    #[inline]
    #[must_use]
    pub const fn is_alloc(&self) -> bool {
        self.flags & SHF_ALLOC != 0
    }
}

/// One `.symtab` entry, with its name resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    /// `st_value`: an address for most symbols, a plain number for absolute
    /// ones such as linker-script sizes.
    pub value: u64,
    pub size: u64,
}

impl Symbol {
    #[inline]
    #[must_use]
    pub const fn address(&self) -> VirtualAddress {
        VirtualAddress::new(self.value)
    }
}
