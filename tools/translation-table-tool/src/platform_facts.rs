//! # Platform Facts
//!
//! Everything the generator needs to know about the target: the board's
//! physical memory map, plus the layout facts the kernel publishes through its
//! symbol table.

use crate::error::ToolError;
use kernel_elf::KernelElf;
use kernel_info::memory::{
    KERNEL_GRANULE_SIZE, SYM_KERNEL_TABLES, SYM_KERNEL_VIRT_ADDR_SPACE_SIZE,
    SYM_KERNEL_VIRT_START_ADDR, SYM_PHYS_KERNEL_TABLES_BASE_ADDR,
};
use kernel_info::platform::Platform;
use kernel_memory_addresses::{HexUnderscore, PhysicalAddress, VirtualAddress};
use kernel_vmem::TableLayout;
use log::debug;

/// A patch slot inside the kernel image: a symbol and where it sits in the file.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PatchSlot {
    pub symbol: &'static str,
    pub virt: VirtualAddress,
    pub phys: PhysicalAddress,
    pub file_offset: u64,
    /// `st_size` of the symbol; zero if the linker did not record one.
    pub size: u64,
}

impl PatchSlot {
    fn resolve(elf: &KernelElf, symbol: &'static str) -> Result<Self, ToolError> {
        let sym = elf.symbol(symbol)?;
        let virt = sym.address();
        Ok(Self {
            symbol,
            virt,
            phys: elf.virt_to_phys(virt)?,
            file_offset: elf.virt_to_file_offset(virt)?,
            size: sym.size,
        })
    }
}

/// Per-target facts, gathered once at startup.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PlatformFacts {
    pub platform: Platform,
    pub granule: u64,
    pub virt_addr_space_size: u64,
    pub virt_start: VirtualAddress,
    /// The kernel's translation table structure.
    pub kernel_tables: PatchSlot,
    /// The `u64` receiving the translation table base address.
    pub phys_tables_base_addr: PatchSlot,
    pub phys_addr_space_end_page: PhysicalAddress,
}

impl PlatformFacts {
    /// Resolve the layout symbols of `elf` for `platform`.
    ///
    /// # Errors
    /// [`ToolError::Elf`] if a symbol is missing or its address is not covered
    /// by a program header.
    pub fn from_elf(platform: Platform, elf: &KernelElf) -> Result<Self, ToolError> {
        let facts = Self {
            platform,
            granule: KERNEL_GRANULE_SIZE,
            virt_addr_space_size: elf.symbol_value(SYM_KERNEL_VIRT_ADDR_SPACE_SIZE)?,
            virt_start: VirtualAddress::new(elf.symbol_value(SYM_KERNEL_VIRT_START_ADDR)?),
            kernel_tables: PatchSlot::resolve(elf, SYM_KERNEL_TABLES)?,
            phys_tables_base_addr: PatchSlot::resolve(elf, SYM_PHYS_KERNEL_TABLES_BASE_ADDR)?,
            phys_addr_space_end_page: platform.phys_addr_space_end_page(),
        };

        debug!(
            "{platform}: {} bytes of kernel address space from {}, tables at {} (phys {})",
            HexUnderscore::new(facts.virt_addr_space_size),
            HexUnderscore::new(facts.virt_start.as_u64()),
            HexUnderscore::new(facts.kernel_tables.virt.as_u64()),
            HexUnderscore::new(facts.kernel_tables.phys.as_u64()),
        );
        Ok(facts)
    }

    /// Geometry of the tables to build.
    #[must_use]
    pub const fn table_layout(&self) -> TableLayout {
        TableLayout {
            granule: self.granule,
            virt_addr_space_size: self.virt_addr_space_size,
            virt_start: self.virt_start,
            tables_phys: self.kernel_tables.phys,
            phys_addr_space_end_page: self.phys_addr_space_end_page,
        }
    }
}
