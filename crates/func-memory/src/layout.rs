//! Address-field width configuration.

use crate::{ConfigIssue, MemoryError};

/// Default address width in bits.
pub const DEFAULT_ADDRESS_BITS: u32 = 32;
/// Default set-field width in bits.
pub const DEFAULT_SET_BITS: u32 = 10;
/// Default page-field width in bits.
pub const DEFAULT_PAGE_BITS: u32 = 10;
/// Default offset-field width in bits (4 KiB pages).
pub const DEFAULT_OFFSET_BITS: u32 = 12;
/// Widest offset field accepted; page buffers are allocated whole.
pub const MAX_OFFSET_BITS: u32 = 32;

/// Split of an address into set, page and offset fields.
///
/// Fields are listed from the most significant end: `set | page | offset`.
/// A layout is only a request; [`AddressLayout::validate`] decides whether it
/// describes a usable address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AddressLayout {
    /// Total address width.
    pub address_bits: u32,
    /// Width of the set index.
    pub set_bits: u32,
    /// Width of the page index within a set.
    pub page_bits: u32,
    /// Width of the byte offset within a page.
    pub offset_bits: u32,
}

impl Default for AddressLayout {
    fn default() -> Self {
        Self {
            address_bits: DEFAULT_ADDRESS_BITS,
            set_bits: DEFAULT_SET_BITS,
            page_bits: DEFAULT_PAGE_BITS,
            offset_bits: DEFAULT_OFFSET_BITS,
        }
    }
}

impl AddressLayout {
    /// Creates a layout from explicit field widths without validating it.
    #[must_use]
    pub const fn new(address_bits: u32, set_bits: u32, page_bits: u32, offset_bits: u32) -> Self {
        Self {
            address_bits,
            set_bits,
            page_bits,
            offset_bits,
        }
    }

    /// Creates a layout whose set field takes every bit not used by the page
    /// and offset fields.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Configuration`] with
    /// [`ConfigIssue::SetBitsUnderflow`] when `page_bits + offset_bits`
    /// exceeds `address_bits`.
    pub fn with_derived_sets(
        address_bits: u32,
        page_bits: u32,
        offset_bits: u32,
    ) -> Result<Self, MemoryError> {
        let set_bits = page_bits
            .checked_add(offset_bits)
            .and_then(|low| address_bits.checked_sub(low))
            .ok_or(MemoryError::Configuration {
                address_bits,
                set_bits: 0,
                page_bits,
                offset_bits,
                reason: ConfigIssue::SetBitsUnderflow,
            })?;
        Ok(Self::new(address_bits, set_bits, page_bits, offset_bits))
    }

    /// Checks that the widths describe a representable address space.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Configuration`] when the address is wider than
    /// 64 bits, the fields do not sum to `address_bits`, a field is 64 bits or
    /// wider, or the offset field exceeds [`MAX_OFFSET_BITS`].
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.address_bits > u64::BITS {
            return Err(self.reject(ConfigIssue::AddressTooWide));
        }

        let sum = self
            .set_bits
            .checked_add(self.page_bits)
            .and_then(|partial| partial.checked_add(self.offset_bits));
        if sum != Some(self.address_bits) {
            return Err(self.reject(ConfigIssue::WidthMismatch));
        }

        if self.set_bits >= u64::BITS || self.page_bits >= u64::BITS {
            return Err(self.reject(ConfigIssue::FieldTooWide));
        }

        if self.offset_bits > MAX_OFFSET_BITS || self.offset_bits >= usize::BITS {
            return Err(self.reject(ConfigIssue::PageTooLarge));
        }

        Ok(())
    }

    const fn reject(&self, reason: ConfigIssue) -> MemoryError {
        MemoryError::Configuration {
            address_bits: self.address_bits,
            set_bits: self.set_bits,
            page_bits: self.page_bits,
            offset_bits: self.offset_bits,
            reason,
        }
    }
}
