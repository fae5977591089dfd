use core::fmt;
use core::hash::Hash;

mod sealed {
    pub trait Sealed {}
}

/// A translation size of the 64 KiB granule scheme.
///
/// Only the sizes the kernel's two-level walk uses implement this trait.
pub trait PageSize: sealed::Sealed + Copy + Eq + Ord + Hash + fmt::Debug {
    /// log2 of [`SIZE`](Self::SIZE).
    const SHIFT: u32;
    /// Size in bytes.
    const SIZE: u64 = 1 << Self::SHIFT;
    /// In-page offset bits.
    const MASK: u64 = Self::SIZE - 1;
    /// Short label for diagnostics, e.g. `64K`.
    const NAME: &'static str;
}

macro_rules! page_size {
    ($(#[$meta:meta])* $name:ident, shift = $shift:literal, $label:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name;

        impl sealed::Sealed for $name {}

        impl PageSize for $name {
            const SHIFT: u32 = $shift;
            const NAME: &'static str = $label;
        }
    };
}

page_size!(
    /// 64 KiB translation granule: one level 3 page.
    Size64K,
    shift = 16,
    "64K"
);

page_size!(
    /// Span of one level 2 entry: 8192 level 3 pages.
    Size512M,
    shift = 29,
    "512M"
);

const _: () = {
    assert!(Size64K::SIZE == 64 * 1024);
    assert!(Size512M::SIZE == 512 * 1024 * 1024);
    assert!(Size512M::SIZE / Size64K::SIZE == 8192);
};
