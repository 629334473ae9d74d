use thiserror::Error;

/// Coarse error classes used by callers that only need to branch on the kind
/// of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Address-field widths were rejected before any memory existed.
    Configuration,
    /// A byte was read before it was ever written.
    Unmapped,
    /// A multi-byte access asked for an unsupported width.
    Width,
}

/// Reason an [`AddressLayout`](crate::AddressLayout) was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ConfigIssue {
    /// Address width exceeds 64 bits.
    #[error("address width exceeds 64 bits")]
    AddressTooWide,
    /// Set, page and offset widths do not add up to the address width.
    #[error("set, page and offset widths do not sum to the address width")]
    WidthMismatch,
    /// A single field is too wide for its entry count to fit in 64 bits.
    #[error("field width overflows the 64-bit entry count")]
    FieldTooWide,
    /// Offset field is too wide for a page buffer to be allocated in one piece.
    #[error("page size exceeds the maximum of 2^{max} bytes", max = crate::MAX_OFFSET_BITS)]
    PageTooLarge,
    /// Page and offset widths already exceed the address width.
    #[error("page and offset widths exceed the address width")]
    SetBitsUnderflow,
}

/// Failures reported by the functional memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum MemoryError {
    /// Address layout is inconsistent.
    #[error(
        "invalid address layout (address {address_bits}, set {set_bits}, page {page_bits}, \
         offset {offset_bits} bits): {reason}"
    )]
    Configuration {
        /// Requested address width.
        address_bits: u32,
        /// Requested set-field width.
        set_bits: u32,
        /// Requested page-field width.
        page_bits: u32,
        /// Requested offset-field width.
        offset_bits: u32,
        /// Rule the layout broke.
        reason: ConfigIssue,
    },
    /// Read of a byte that was never written.
    #[error("read from unmapped address {addr:#x} ({num_bytes}-byte access at {access_addr:#x})")]
    UnmappedAddress {
        /// Address of the first byte that was never written.
        addr: u64,
        /// Start address of the access that touched it.
        access_addr: u64,
        /// Width of that access in bytes.
        num_bytes: u8,
    },
    /// Multi-byte access width outside `1..=8`.
    #[error("invalid access width {num_bytes} at address {addr:#x} (expected 1..=8 bytes)")]
    InvalidWidth {
        /// Start address of the rejected access.
        addr: u64,
        /// Rejected width in bytes.
        num_bytes: u8,
    },
}

impl MemoryError {
    /// Returns the coarse class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::UnmappedAddress { .. } => ErrorKind::Unmapped,
            Self::InvalidWidth { .. } => ErrorKind::Width,
        }
    }

    /// Builds the error for a single-byte read of `addr`.
    #[must_use]
    pub const fn unmapped_byte(addr: u64) -> Self {
        Self::UnmappedAddress {
            addr,
            access_addr: addr,
            num_bytes: 1,
        }
    }

    /// Returns the faulting address for access errors.
    #[must_use]
    pub const fn addr(&self) -> Option<u64> {
        match self {
            Self::UnmappedAddress { addr, .. } | Self::InvalidWidth { addr, .. } => Some(*addr),
            Self::Configuration { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigIssue, ErrorKind, MemoryError};

    #[test]
    fn kind_mapping_matches_variants() {
        let config = MemoryError::Configuration {
            address_bits: 32,
            set_bits: 1,
            page_bits: 1,
            offset_bits: 1,
            reason: ConfigIssue::WidthMismatch,
        };
        assert_eq!(config.kind(), ErrorKind::Configuration);
        assert_eq!(config.addr(), None);

        let unmapped = MemoryError::unmapped_byte(0x40);
        assert_eq!(unmapped.kind(), ErrorKind::Unmapped);
        assert_eq!(unmapped.addr(), Some(0x40));

        let width = MemoryError::InvalidWidth {
            addr: 0x80,
            num_bytes: 9,
        };
        assert_eq!(width.kind(), ErrorKind::Width);
        assert_eq!(width.addr(), Some(0x80));
    }

    #[test]
    fn messages_carry_address_and_width() {
        let unmapped = MemoryError::UnmappedAddress {
            addr: 0x40_0003,
            access_addr: 0x40_0000,
            num_bytes: 4,
        };
        assert_eq!(
            unmapped.to_string(),
            "read from unmapped address 0x400003 (4-byte access at 0x400000)"
        );
        assert_eq!(unmapped.addr(), Some(0x40_0003));

        let width = MemoryError::InvalidWidth {
            addr: 0x10,
            num_bytes: 0,
        };
        assert_eq!(
            width.to_string(),
            "invalid access width 0 at address 0x10 (expected 1..=8 bytes)"
        );
    }

    #[test]
    fn configuration_message_names_the_rule() {
        let error = MemoryError::Configuration {
            address_bits: 32,
            set_bits: 10,
            page_bits: 10,
            offset_bits: 10,
            reason: ConfigIssue::WidthMismatch,
        };
        assert!(error
            .to_string()
            .ends_with("set, page and offset widths do not sum to the address width"));
    }
}
