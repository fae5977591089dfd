//! # Kernel Mappings
//!
//! One [`MappingDescriptor`] per loadable segment of the kernel, mapping the
//! segment at its link address onto its load address.

use crate::error::ToolError;
use crate::platform_facts::PlatformFacts;
use kernel_elf::{KernelElf, LoadSegment, SegmentFlags};
use kernel_vmem::{
    AccessPermissions, AttributeFields, MappingDescriptor, MemoryAttributes, MemoryRegion,
};
use log::debug;

/// Attributes for a segment with the given `p_flags`.
///
/// # Errors
/// [`ToolError::InvalidPermissions`] unless the segment is readable, and
/// writable only alongside readable.
pub fn attributes_for(segment: &LoadSegment) -> Result<AttributeFields, ToolError> {
    let flags: SegmentFlags = segment.flags;
    let acc_perms = match (flags.read(), flags.write()) {
        (true, true) => AccessPermissions::ReadWrite,
        (true, false) => AccessPermissions::ReadOnly,
        _ => {
            return Err(ToolError::InvalidPermissions {
                virt_start: segment.virt_start,
                flags,
            });
        }
    };

    Ok(AttributeFields::new(
        MemoryAttributes::CacheableDram,
        acc_perms,
        !flags.execute(),
    ))
}

/// Mapping descriptors for all loadable segments, in program header order.
///
/// Segments occupying no memory are skipped. Sizes are rounded up to the
/// granule.
///
/// # Errors
/// - [`ToolError::InvalidPermissions`] for segments that cannot be mapped.
/// - [`ToolError::Region`] if a segment does not start on a granule boundary.
pub fn mapping_descriptors(
    elf: &KernelElf,
    facts: &PlatformFacts,
) -> Result<Vec<MappingDescriptor>, ToolError> {
    let mut descriptors = Vec::new();
    for segment in elf.load_segments() {
        if segment.mem_size == 0 {
            debug!("skipping empty segment at {}", segment.virt_start);
            continue;
        }

        let attributes = attributes_for(&segment)?;
        let virt_region =
            MemoryRegion::covering(segment.virt_start, segment.mem_size, facts.granule)?;
        let phys_region =
            MemoryRegion::covering(segment.phys_start, segment.mem_size, facts.granule)?;

        descriptors.push(MappingDescriptor::new(
            segment.joined_section_names(),
            virt_region,
            phys_region,
            attributes,
        ));
    }
    Ok(descriptors)
}
