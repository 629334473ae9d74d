//! Address decomposition into set, page and offset indices.

use crate::{AddressLayout, MemoryError};

/// Set, page and offset indices of one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecodedAddress {
    /// Index of the page table within the address space.
    pub set: u64,
    /// Index of the page within its set.
    pub page: u64,
    /// Byte offset within the page.
    pub offset: u64,
}

/// Immutable address splitter built from a validated [`AddressLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressCodec {
    layout: AddressLayout,
    set_shift: u32,
    set_mask: u64,
    page_mask: u64,
    offset_mask: u64,
}

/// Mask with the low `bits` bits set, saturating at all 64.
const fn low_mask(bits: u32) -> u64 {
    if bits >= u64::BITS {
        u64::MAX
    } else {
        (1 << bits) - 1
    }
}

impl AddressCodec {
    /// Validates `layout` and precomputes the field masks.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Configuration`] when `layout` fails
    /// [`AddressLayout::validate`].
    pub fn new(layout: AddressLayout) -> Result<Self, MemoryError> {
        layout.validate()?;
        Ok(Self {
            layout,
            set_shift: layout.page_bits + layout.offset_bits,
            set_mask: low_mask(layout.set_bits),
            page_mask: low_mask(layout.page_bits),
            offset_mask: low_mask(layout.offset_bits),
        })
    }

    /// Splits `addr` into its field indices.
    ///
    /// Bits above the address width are dropped, so every `u64` decodes.
    #[must_use]
    pub const fn decode(&self, addr: u64) -> DecodedAddress {
        DecodedAddress {
            set: shr(addr, self.set_shift) & self.set_mask,
            page: shr(addr, self.layout.offset_bits) & self.page_mask,
            offset: addr & self.offset_mask,
        }
    }

    /// Reassembles an address from field indices, masking each to its width.
    #[must_use]
    pub const fn compose(&self, set: u64, page: u64, offset: u64) -> u64 {
        shl(set & self.set_mask, self.set_shift)
            | shl(page & self.page_mask, self.layout.offset_bits)
            | (offset & self.offset_mask)
    }

    /// Layout this codec was built from.
    #[must_use]
    pub const fn layout(&self) -> AddressLayout {
        self.layout
    }

    /// Mask of all addressable bits.
    #[must_use]
    pub const fn address_mask(&self) -> u64 {
        low_mask(self.layout.address_bits)
    }

    /// Number of sets, `2^set_bits`.
    #[must_use]
    pub const fn set_count(&self) -> u64 {
        self.set_mask + 1
    }

    /// Number of pages per set, `2^page_bits`.
    #[must_use]
    pub const fn page_count(&self) -> u64 {
        self.page_mask + 1
    }

    /// Number of bytes per page, `2^offset_bits`.
    #[must_use]
    pub const fn offset_count(&self) -> u64 {
        self.offset_mask + 1
    }

    /// Page size in bytes as a host length.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub(crate) const fn page_len(&self) -> usize {
        // validate() bounds offset_bits below usize::BITS.
        self.offset_count() as usize
    }
}

const fn shr(value: u64, shift: u32) -> u64 {
    match value.checked_shr(shift) {
        Some(shifted) => shifted,
        None => 0,
    }
}

const fn shl(value: u64, shift: u32) -> u64 {
    match value.checked_shl(shift) {
        Some(shifted) => shifted,
        None => 0,
    }
}
