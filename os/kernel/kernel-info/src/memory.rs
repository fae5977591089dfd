//! # Memory Layout Contract
//!
//! Names of the linker-visible symbols through which the kernel publishes its
//! virtual memory layout and the slots the precomputed translation tables are
//! written into.

/// Size of the kernel's virtual address space in bytes (`usize` constant).
///
/// # Kernel Build
/// Defined by the kernel's linker script; must be a multiple of 512 MiB.
pub const SYM_KERNEL_VIRT_ADDR_SPACE_SIZE: &str = "__kernel_virt_addr_space_size";

/// First virtual address of the kernel's address space.
///
/// # Kernel Build
/// Defined by the kernel's linker script.
pub const SYM_KERNEL_VIRT_START_ADDR: &str = "__kernel_virt_start_addr";

/// The statically allocated translation table structure (`#[no_mangle]`).
///
/// Level 3 tables first, then the level 2 table, all 64 KiB aligned.
pub const SYM_KERNEL_TABLES: &str = "KERNEL_TABLES";

/// The `u64` the boot code loads into `TTBR1_EL1`: physical address of the
/// level 2 table.
pub const SYM_PHYS_KERNEL_TABLES_BASE_ADDR: &str = "PHYS_KERNEL_TABLES_BASE_ADDR";

/// Translation granule the kernel is configured for, in bytes.
pub const KERNEL_GRANULE_SIZE: u64 = 64 * 1024;
