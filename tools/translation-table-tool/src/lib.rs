//! # Translation Table Tool
//!
//! Precomputes the kernel's AArch64 translation tables at build time and
//! patches them, together with their physical base address, into the linked
//! kernel ELF.
//!
//! The kernel reserves room for the tables in a `KERNEL_TABLES` object and
//! for the base address in `PHYS_KERNEL_TABLES_BASE_ADDR`. For every loadable
//! segment the tool maps the segment's link address onto its load address
//! with attributes derived from the segment flags. The finished tables are
//! written over `KERNEL_TABLES`, then the base address over
//! `PHYS_KERNEL_TABLES_BASE_ADDR`. All other bytes of the image are left
//! untouched, so running the tool twice yields the same file.

mod error;
mod logger;
mod mappings;
mod patch;
mod platform_facts;

pub use error::ToolError;
pub use logger::{STATUS_WIDTH, Status, ToolLogger};
pub use mappings::{attributes_for, mapping_descriptors};
pub use platform_facts::{PatchSlot, PlatformFacts};

use kernel_elf::{KernelElf, Machine};
use kernel_info::platform::Platform;
use kernel_memory_addresses::{HexUnderscore, PhysicalAddress};
use kernel_vmem::{MappingReportFormat, TranslationTable};
use log::info;
use std::path::PathBuf;

const TABLES: &str = "kernel tables";
const BASE_ADDR: &str = "tables base address";
const BASE_ADDR_LEN: u64 = size_of::<u64>() as u64;

/// What to patch and for which board.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub platform: Platform,
    pub kernel_elf: PathBuf,
}

/// Outcome of a successful [`run`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PatchSummary {
    pub tables_file_offset: u64,
    pub tables_len: u64,
    pub base_address: PhysicalAddress,
    pub base_addr_file_offset: u64,
    /// Number of mappings installed.
    pub mappings: usize,
}

/// Generate the translation tables for the kernel at `config.kernel_elf` and
/// patch them into the file.
///
/// Both patch windows are validated against the size the tables will have
/// before the tables are allocated. Nothing is written unless the tables were
/// built completely.
///
/// # Errors
/// - [`ToolError::Elf`] if the image cannot be read or lacks a required symbol.
/// - [`ToolError::UnsupportedArchitecture`] for images not built for AArch64.
/// - [`ToolError::InvalidPermissions`], [`ToolError::Region`] or
///   [`ToolError::Table`] if a segment cannot be mapped.
/// - [`ToolError::SymbolTooSmall`] or [`ToolError::PatchWindowOutOfBounds`]
///   if the patched bytes would not fit their symbol.
/// - [`ToolError::Io`] if writing the image fails.
pub fn run(config: &Config) -> Result<PatchSummary, ToolError> {
    let elf = KernelElf::open(&config.kernel_elf)?;
    let machine = elf.machine_type();
    if machine != Machine::AArch64 {
        return Err(ToolError::UnsupportedArchitecture(machine));
    }

    let facts = PlatformFacts::from_elf(config.platform, &elf)?;
    let layout = facts.table_layout();
    let tables_len = layout.serialized_size()?;

    let tables_slot = facts.kernel_tables;
    let base_slot = facts.phys_tables_base_addr;
    patch::check_window(&elf, &tables_slot, TABLES, tables_len)?;
    patch::check_window(&elf, &base_slot, BASE_ADDR, BASE_ADDR_LEN)?;

    let mut tables = TranslationTable::new(layout)?;
    let descriptors = mapping_descriptors(&elf, &facts)?;

    let report = MappingReportFormat::for_descriptors(&descriptors);
    info!("{}", report.divider());
    info!("{}", report.header());
    info!("{}", report.divider());
    for descriptor in &descriptors {
        info!("{} {}", Status("Generating"), report.row(descriptor));
        tables.map(descriptor)?;
    }
    info!("{}", report.divider());

    let table_bytes = tables.serialize();
    let base_address = tables.base_address();
    let base_bytes = tables.base_address_bytes();
    debug_assert_eq!(table_bytes.len() as u64, tables_len);

    info!(
        "{} Kernel table struct at ELF file offset {}",
        Status("Patching"),
        HexUnderscore::new(tables_slot.file_offset)
    );
    patch::write_at(
        &config.kernel_elf,
        TABLES,
        tables_slot.file_offset,
        &table_bytes,
    )?;

    info!(
        "{} Kernel tables physical base address start argument to value {} at ELF file offset {}",
        Status("Patching"),
        HexUnderscore::new(base_address.as_u64()),
        HexUnderscore::new(base_slot.file_offset)
    );
    patch::write_at(
        &config.kernel_elf,
        BASE_ADDR,
        base_slot.file_offset,
        &base_bytes,
    )?;

    Ok(PatchSummary {
        tables_file_offset: tables_slot.file_offset,
        tables_len,
        base_address,
        base_addr_file_offset: base_slot.file_offset,
        mappings: descriptors.len(),
    })
}
