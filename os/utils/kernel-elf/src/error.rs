use kernel_memory_addresses::VirtualAddress;
use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ElfError {
    #[error("failed to read ELF file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed ELF file: {0}")]
    Malformed(&'static str),
    #[error("symbol `{0}` not found in .symtab")]
    SymbolNotFound(String),
    #[error("virtual address {0} is not covered by any program header")]
    AddressNotMapped(VirtualAddress),
}
