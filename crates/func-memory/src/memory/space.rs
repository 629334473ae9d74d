//! Two-level lazily allocated byte storage.

use std::collections::BTreeMap;

use log::debug;

use crate::{AddressCodec, MemoryError};

const BITMAP_WORD_BITS: usize = u64::BITS as usize;

/// One allocated page: a zero-filled byte buffer plus a written-byte bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    bytes: Box<[u8]>,
    written: Box<[u64]>,
}

impl Page {
    fn new(len: usize) -> Self {
        Self {
            bytes: vec![0; len].into_boxed_slice(),
            written: vec![0; len.div_ceil(BITMAP_WORD_BITS)].into_boxed_slice(),
        }
    }

    fn is_written(&self, offset: usize) -> bool {
        self.written[offset / BITMAP_WORD_BITS] & (1 << (offset % BITMAP_WORD_BITS)) != 0
    }

    fn store(&mut self, offset: usize, value: u8) {
        self.bytes[offset] = value;
        self.written[offset / BITMAP_WORD_BITS] |= 1 << (offset % BITMAP_WORD_BITS);
    }

    fn load(&self, offset: usize) -> Option<u8> {
        self.is_written(offset).then(|| self.bytes[offset])
    }

    /// Iterates written bytes as `(offset, value)` in ascending offset order.
    pub fn written_bytes(&self) -> impl Iterator<Item = (u64, u8)> + '_ {
        self.written
            .iter()
            .enumerate()
            .filter(|(_, word)| **word != 0)
            .flat_map(move |(word_index, word)| {
                let word = *word;
                (0..BITMAP_WORD_BITS)
                    .filter(move |bit| word & (1 << bit) != 0)
                    .map(move |bit| word_index * BITMAP_WORD_BITS + bit)
            })
            .map(|offset| (offset as u64, self.bytes[offset]))
    }

    /// Number of bytes written at least once.
    #[must_use]
    pub fn written_len(&self) -> usize {
        self.written
            .iter()
            .map(|word| word.count_ones() as usize)
            .sum()
    }
}

/// Pages allocated within one set, keyed by page index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageTable {
    pages: BTreeMap<u64, Page>,
}

impl PageTable {
    /// Iterates allocated pages in ascending page-index order.
    pub fn pages(&self) -> impl Iterator<Item = (u64, &Page)> + '_ {
        self.pages.iter().map(|(index, page)| (*index, page))
    }

    /// Number of allocated pages in this set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns `true` when the set holds no pages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Sparse byte-addressable storage, allocated one page at a time on write.
///
/// A set entry exists only once a byte in that set was written, and a page
/// only once a byte in that page was written. Reading any byte that was never
/// written fails with [`MemoryError::UnmappedAddress`]; a byte written as zero
/// reads back as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseAddressSpace {
    codec: AddressCodec,
    sets: BTreeMap<u64, PageTable>,
}

impl SparseAddressSpace {
    /// Creates an empty address space for `codec`.
    #[must_use]
    pub const fn new(codec: AddressCodec) -> Self {
        Self {
            codec,
            sets: BTreeMap::new(),
        }
    }

    /// Codec used to split addresses.
    #[must_use]
    pub const fn codec(&self) -> &AddressCodec {
        &self.codec
    }

    /// Reads the byte at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::UnmappedAddress`] when the byte's set or page
    /// was never allocated or the byte itself was never written.
    pub fn read_byte(&self, addr: u64) -> Result<u8, MemoryError> {
        let decoded = self.codec.decode(addr);
        self.sets
            .get(&decoded.set)
            .and_then(|table| table.pages.get(&decoded.page))
            .and_then(|page| page.load(offset_index(decoded.offset)))
            .ok_or(MemoryError::unmapped_byte(addr))
    }

    /// Writes `value` at `addr`, allocating the set and page on first touch.
    ///
    /// Zero is stored like any other value, so the byte becomes readable.
    pub fn write_byte(&mut self, addr: u64, value: u8) {
        let decoded = self.codec.decode(addr);
        let page_len = self.codec.page_len();

        let table = self.sets.entry(decoded.set).or_insert_with(|| {
            debug!("allocated page table for set {:#x}", decoded.set);
            PageTable::default()
        });
        let page = table.pages.entry(decoded.page).or_insert_with(|| {
            debug!(
                "allocated {page_len}-byte page {:#x} in set {:#x}",
                decoded.page, decoded.set
            );
            Page::new(page_len)
        });
        page.store(offset_index(decoded.offset), value);
    }

    /// Returns `true` when a read of `addr` would succeed.
    #[must_use]
    pub fn is_mapped(&self, addr: u64) -> bool {
        self.read_byte(addr).is_ok()
    }

    /// Iterates allocated sets in ascending set-index order.
    pub fn sets(&self) -> impl Iterator<Item = (u64, &PageTable)> + '_ {
        self.sets.iter().map(|(index, table)| (*index, table))
    }

    /// Number of allocated page tables.
    #[must_use]
    pub fn allocated_sets(&self) -> usize {
        self.sets.len()
    }

    /// Number of allocated pages across all sets.
    #[must_use]
    pub fn allocated_pages(&self) -> usize {
        self.sets.values().map(PageTable::len).sum()
    }

    /// Returns `true` when nothing has been written since creation or release.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Frees every page, then every page table.
    ///
    /// The space stays usable; later writes allocate afresh.
    pub fn release(&mut self) {
        let sets = self.allocated_sets();
        let pages = self.allocated_pages();
        for table in self.sets.values_mut() {
            table.pages.clear();
        }
        self.sets.clear();
        debug!("released {pages} pages across {sets} sets");
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn offset_index(offset: u64) -> usize {
    // Offsets are masked to at most MAX_OFFSET_BITS bits.
    offset as usize
}
