use kernel_elf::{ElfError, Machine, SegmentFlags};
use kernel_memory_addresses::VirtualAddress;
use kernel_vmem::{RegionError, TableError};
use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Elf(#[from] ElfError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("invalid mapping region")]
    Region(#[from] RegionError),
    #[error("unsupported architecture {0}; only AArch64 kernels are supported")]
    UnsupportedArchitecture(Machine),
    #[error("segment at {virt_start} is {flags}; only RW- and R-- style segments can be mapped")]
    InvalidPermissions {
        virt_start: VirtualAddress,
        flags: SegmentFlags,
    },
    #[error(
        "{what} patch of {len:#x} bytes at file offset {offset:#x} lies outside the file-backed part of its segment"
    )]
    PatchWindowOutOfBounds {
        what: &'static str,
        offset: u64,
        len: u64,
    },
    #[error("`{symbol}` holds {available:#x} bytes but {needed:#x} bytes must be written")]
    SymbolTooSmall {
        symbol: &'static str,
        available: u64,
        needed: u64,
    },
    #[error("failed to patch {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
