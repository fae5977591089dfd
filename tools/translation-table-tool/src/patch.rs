//! # Patching the Kernel Image
//!
//! Overwrites byte ranges of the kernel ELF in place. Nothing outside the
//! patched ranges changes; the file is neither truncated nor extended.

use crate::error::ToolError;
use crate::platform_facts::PatchSlot;
use kernel_elf::KernelElf;
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

/// Check that `len` bytes at `slot` lie within the file-backed part of the
/// segment holding the slot and, if the symbol records a size, within it.
///
/// # Errors
/// - [`ToolError::SymbolTooSmall`] if the symbol is smaller than `len`.
/// - [`ToolError::PatchWindowOutOfBounds`] if the bytes would land in the
///   segment's zero-filled tail or beyond the segment.
pub fn check_window(
    elf: &KernelElf,
    slot: &PatchSlot,
    what: &'static str,
    len: u64,
) -> Result<(), ToolError> {
    if slot.size != 0 && slot.size < len {
        return Err(ToolError::SymbolTooSmall {
            symbol: slot.symbol,
            available: slot.size,
            needed: len,
        });
    }

    let out_of_bounds = || ToolError::PatchWindowOutOfBounds {
        what,
        offset: slot.file_offset,
        len,
    };
    let segment = elf.segment_containing(slot.virt)?;
    let end = slot.file_offset.checked_add(len).ok_or_else(out_of_bounds)?;
    let segment_end = segment.file_end().ok_or_else(out_of_bounds)?;
    if slot.file_offset < segment.offset || end > segment_end {
        return Err(out_of_bounds());
    }
    Ok(())
}

/// Write `bytes` into the file at `path`, starting at `offset`.
///
/// # Errors
/// - [`ToolError::PatchWindowOutOfBounds`] if the range extends past the end
///   of the file.
/// - [`ToolError::Io`] if the file cannot be opened or written.
pub fn write_at(
    path: &Path,
    what: &'static str,
    offset: u64,
    bytes: &[u8],
) -> Result<(), ToolError> {
    let io_error = |source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(io_error)?;

    let len = bytes.len() as u64;
    let file_len = file.metadata().map_err(io_error)?.len();
    if offset.checked_add(len).is_none_or(|end| end > file_len) {
        return Err(ToolError::PatchWindowOutOfBounds { what, offset, len });
    }

    file.seek(SeekFrom::Start(offset)).map_err(io_error)?;
    file.write_all(bytes).map_err(io_error)?;
    file.flush().map_err(io_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image");
        std::fs::write(&path, [0u8; 16]).unwrap();

        write_at(&path, "test", 4, &[1, 2, 3]).unwrap();
        assert_eq!(
            std::fs::read(&path).unwrap(),
            [0, 0, 0, 0, 1, 2, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn refuses_to_extend_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image");
        std::fs::write(&path, [0u8; 16]).unwrap();

        assert!(matches!(
            write_at(&path, "test", 14, &[1, 2, 3]),
            Err(ToolError::PatchWindowOutOfBounds {
                offset: 14,
                len: 3,
                ..
            })
        ));
        assert_eq!(std::fs::read(&path).unwrap(), [0u8; 16]);
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            write_at(&dir.path().join("nope"), "test", 0, &[1]),
            Err(ToolError::Io { .. })
        ));
    }
}
