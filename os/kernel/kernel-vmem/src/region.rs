//! # Memory Regions
//!
//! A [`MemoryRegion`] is a run of equally sized, granule-aligned pages in
//! either the virtual or the physical address space. Page addresses are
//! computed on demand, so a region describing gigabytes costs three words.

use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use kernel_memory_addresses::{AlignmentError, HexUnderscore, align_up, is_aligned};

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    #[error(transparent)]
    Alignment(#[from] AlignmentError),
    #[error("region start {start:#x} is not aligned to the {granule:#x} byte granule")]
    MisalignedRegion { start: u64, granule: u64 },
    #[error("region is empty")]
    EmptyRegion,
    #[error("region size {size:#x} is not a multiple of the {granule:#x} byte granule")]
    UnalignedSize { size: u64, granule: u64 },
    #[error("region at {start:#x} of {size:#x} bytes wraps around the address space")]
    Overflow { start: u64, size: u64 },
}

/// A non-empty sequence of page start addresses `start, start + granule, ...`.
///
/// `A` is [`VirtualAddress`](kernel_memory_addresses::VirtualAddress) or
/// [`PhysicalAddress`](kernel_memory_addresses::PhysicalAddress).
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct MemoryRegion<A> {
    start: u64,
    size: u64,
    granule: u64,
    _space: PhantomData<A>,
}

impl<A> MemoryRegion<A>
where
    A: Copy + From<u64> + Into<u64>,
{
    /// Build a region of `size` bytes starting at `start`.
    ///
    /// # Errors
    /// - [`RegionError::Alignment`] if `granule` is not a power of two.
    /// - [`RegionError::MisalignedRegion`] if `start` is not granule aligned.
    /// - [`RegionError::EmptyRegion`] if `size` is zero.
    /// - [`RegionError::UnalignedSize`] if `size` is not a multiple of the
    ///   granule.
    /// - [`RegionError::Overflow`] if the region runs past the end of the
    ///   64-bit address space.
    pub fn new(start: A, size: u64, granule: u64) -> Result<Self, RegionError> {
        let start: u64 = start.into();
        if !is_aligned(start, granule)? {
            return Err(RegionError::MisalignedRegion { start, granule });
        }
        if size == 0 {
            return Err(RegionError::EmptyRegion);
        }
        if !is_aligned(size, granule)? {
            return Err(RegionError::UnalignedSize { size, granule });
        }
        if start.checked_add(size - granule).is_none() {
            return Err(RegionError::Overflow { start, size });
        }

        Ok(Self {
            start,
            size,
            granule,
            _space: PhantomData,
        })
    }

    /// Like [`new`](Self::new), but rounds `size` up to the granule first.
    ///
    /// # Errors
    /// See [`new`](Self::new).
    pub fn covering(start: A, size: u64, granule: u64) -> Result<Self, RegionError> {
        Self::new(start, align_up(size, granule)?, granule)
    }

    /// Number of pages.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn len(&self) -> usize {
        (self.size / self.granule) as usize
    }

    /// Always `false` for a successfully built region.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    #[must_use]
    pub fn start(&self) -> A {
        A::from(self.start)
    }

    /// Size in bytes.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    #[must_use]
    pub const fn granule(&self) -> u64 {
        self.granule
    }

    #[inline]
    #[must_use]
    pub fn first(&self) -> A {
        self.start()
    }

    /// Start address of the last page.
    #[inline]
    #[must_use]
    pub fn last(&self) -> A {
        A::from(self.start + (self.size - self.granule))
    }

    /// Start address of page `index`, if it is part of the region.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<A> {
        if index < self.len() {
            Some(A::from(self.start + index as u64 * self.granule))
        } else {
            None
        }
    }

    /// Page start addresses in ascending order.
    #[must_use]
    pub fn iter(&self) -> Pages<A> {
        Pages {
            next: self.start,
            remaining: self.len(),
            granule: self.granule,
            _space: PhantomData,
        }
    }
}

impl<A> IntoIterator for &MemoryRegion<A>
where
    A: Copy + From<u64> + Into<u64>,
{
    type Item = A;
    type IntoIter = Pages<A>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<A> fmt::Debug for MemoryRegion<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MemoryRegion({}..{}, granule {:#x})",
            HexUnderscore::new(self.start),
            HexUnderscore::new(self.start.wrapping_add(self.size)),
            self.granule
        )
    }
}

/// Iterator over the page start addresses of a [`MemoryRegion`].
#[derive(Clone, Debug)]
pub struct Pages<A> {
    next: u64,
    remaining: usize,
    granule: u64,
    _space: PhantomData<A>,
}

impl<A: From<u64>> Iterator for Pages<A> {
    type Item = A;

    fn next(&mut self) -> Option<A> {
        if self.remaining == 0 {
            return None;
        }
        let page = self.next;
        self.remaining -= 1;
        // Wraps only after the last page of a region ending at the top of memory.
        self.next = self.next.wrapping_add(self.granule);
        Some(A::from(page))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<A: From<u64>> ExactSizeIterator for Pages<A> {}
impl<A: From<u64>> FusedIterator for Pages<A> {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

    const G: u64 = 0x1_0000;

    #[test]
    fn three_pages() {
        let region = MemoryRegion::new(PhysicalAddress::new(0x8_0000), 3 * G, G).unwrap();
        assert_eq!(region.len(), 3);
        assert!(!region.is_empty());
        assert_eq!(region.first().as_u64(), 0x8_0000);
        assert_eq!(region.last().as_u64(), 0xA_0000);
        assert_eq!(region.get(1).map(PhysicalAddress::as_u64), Some(0x9_0000));
        assert_eq!(region.get(3), None);

        let pages: Vec<u64> = region.iter().map(PhysicalAddress::as_u64).collect();
        assert_eq!(pages, [0x8_0000, 0x9_0000, 0xA_0000]);
    }

    #[test]
    fn rejects_misaligned_start() {
        assert_eq!(
            MemoryRegion::new(VirtualAddress::new(0x8_0100), G, G),
            Err(RegionError::MisalignedRegion {
                start: 0x8_0100,
                granule: G
            })
        );
    }

    #[test]
    fn rejects_empty_and_ragged_sizes() {
        assert_eq!(
            MemoryRegion::new(VirtualAddress::new(0), 0, G),
            Err(RegionError::EmptyRegion)
        );
        assert_eq!(
            MemoryRegion::new(VirtualAddress::new(0), G + 1, G),
            Err(RegionError::UnalignedSize {
                size: G + 1,
                granule: G
            })
        );
    }

    #[test]
    fn rejects_bad_granule() {
        assert_eq!(
            MemoryRegion::new(VirtualAddress::new(0), 3 * 3, 3),
            Err(RegionError::Alignment(AlignmentError::NotPowerOfTwo(3)))
        );
    }

    #[test]
    fn covering_rounds_up() {
        let region = MemoryRegion::covering(VirtualAddress::new(0x1_0000), 0x1_2345, G).unwrap();
        assert_eq!(region.size(), 0x2_0000);
        assert_eq!(region.len(), 2);
    }

    #[test]
    fn top_of_address_space() {
        let region = MemoryRegion::new(VirtualAddress::new(0xFFFF_FFFF_FFFF_0000), G, G).unwrap();
        assert_eq!(region.last().as_u64(), 0xFFFF_FFFF_FFFF_0000);
        assert_eq!(region.iter().count(), 1);

        assert!(matches!(
            MemoryRegion::new(VirtualAddress::new(0xFFFF_FFFF_FFFF_0000), 2 * G, G),
            Err(RegionError::Overflow { .. })
        ));
    }
}
