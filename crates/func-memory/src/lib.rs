//! Sparse hierarchical functional memory for instruction-set simulators.
//!
//! Addresses are split into set, page and offset fields. Storage for a page,
//! and for the page table of its set, is allocated on the first write that
//! touches it, so wide address spaces cost only what the simulated program
//! actually writes.

/// Error taxonomy for configuration and access failures.
pub mod error;
pub use error::{ConfigIssue, ErrorKind, MemoryError};

/// Address-field width configuration.
pub mod layout;
pub use layout::{
    AddressLayout, DEFAULT_ADDRESS_BITS, DEFAULT_OFFSET_BITS, DEFAULT_PAGE_BITS, DEFAULT_SET_BITS,
    MAX_OFFSET_BITS,
};

/// Address codec and lazily allocated storage.
pub mod memory;
pub use memory::{AddressCodec, DecodedAddress, Page, PageTable, SparseAddressSpace};

/// Multi-byte read/write API seeded from loader segments.
pub mod image;
pub use image::{MemoryImage, Segment, CODE_SEGMENT_NAME, MAX_ACCESS_BYTES};

/// Diagnostic tree dump.
pub mod dump;
pub use dump::{DumpFormatter, ImageDump};
