//! Address decomposition and sparse two-level storage.

/// Set/page/offset address splitting.
pub mod codec;
/// Lazily allocated set and page tables.
pub mod space;

pub use codec::{AddressCodec, DecodedAddress};
pub use space::{Page, PageTable, SparseAddressSpace};
