//! Multi-byte functional memory seeded from executable segments.

use log::{info, trace};

use crate::{AddressCodec, AddressLayout, DumpFormatter, MemoryError, SparseAddressSpace};

/// Segment name marking the program code.
pub const CODE_SEGMENT_NAME: &str = ".text";

/// Widest multi-byte access in bytes.
pub const MAX_ACCESS_BYTES: u8 = 8;

/// Contiguous initial memory content handed over by an executable loader.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Segment {
    /// Section name, e.g. `.text` or `.data`.
    pub name: String,
    /// Address of the first byte.
    pub start_addr: u64,
    /// Initial bytes in ascending address order.
    pub content: Vec<u8>,
}

impl Segment {
    /// Creates a segment.
    pub fn new(name: impl Into<String>, start_addr: u64, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            start_addr,
            content: content.into(),
        }
    }

    /// Size of the segment in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    /// Inclusive address of the last byte; equal to the start for an empty segment.
    #[must_use]
    pub fn last_addr(&self) -> u64 {
        self.start_addr
            .wrapping_add(self.size().saturating_sub(1))
    }

    fn is_code(&self) -> bool {
        self.name == CODE_SEGMENT_NAME
    }
}

/// Programmer-visible memory of a simulated target.
///
/// Multi-byte values are composed most-significant byte first from
/// increasing addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryImage {
    name: String,
    begin_addr: u64,
    end_addr: u64,
    code_start_addr: u64,
    space: SparseAddressSpace,
}

impl MemoryImage {
    /// Builds an image and seeds it with every segment, in order.
    ///
    /// The loaded range spans from the first segment's start to the last
    /// segment's final byte, or `(0, 0)` without segments. The code start is
    /// the address of the last segment named [`CODE_SEGMENT_NAME`], or `0`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Configuration`] when `layout` is inconsistent.
    pub fn new(
        name: impl Into<String>,
        segments: &[Segment],
        layout: AddressLayout,
    ) -> Result<Self, MemoryError> {
        let codec = AddressCodec::new(layout)?;
        let (begin_addr, end_addr) = match (segments.first(), segments.last()) {
            (Some(first), Some(last)) => (first.start_addr, last.last_addr()),
            _ => (0, 0),
        };
        let code_start_addr = segments
            .iter()
            .rev()
            .find(|segment| segment.is_code())
            .map_or(0, |segment| segment.start_addr);

        let mut image = Self {
            name: name.into(),
            begin_addr,
            end_addr,
            code_start_addr,
            space: SparseAddressSpace::new(codec),
        };
        for segment in segments {
            image.load_segment(segment);
        }

        info!(
            "seeded image {:?}: {} segments, range {begin_addr:#x}..={end_addr:#x}, {} pages in {} sets",
            image.name,
            segments.len(),
            image.space.allocated_pages(),
            image.space.allocated_sets()
        );
        Ok(image)
    }

    fn load_segment(&mut self, segment: &Segment) {
        let mut addr = segment.start_addr;
        for byte in &segment.content {
            self.space.write_byte(addr, *byte);
            addr = addr.wrapping_add(1);
        }
    }

    /// Reads `num_bytes` consecutive bytes starting at `addr` as one value.
    ///
    /// The byte at `addr` is the most significant.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidWidth`] when `num_bytes` is outside
    /// `1..=8`, and [`MemoryError::UnmappedAddress`] naming the first byte
    /// that was never written together with `addr` and `num_bytes`.
    pub fn read(&self, addr: u64, num_bytes: u8) -> Result<u64, MemoryError> {
        check_width(addr, num_bytes)?;
        let mut value = 0_u64;
        for i in 0..u64::from(num_bytes) {
            let byte_addr = addr.wrapping_add(i);
            let byte = self
                .space
                .read_byte(byte_addr)
                .map_err(|_| MemoryError::UnmappedAddress {
                    addr: byte_addr,
                    access_addr: addr,
                    num_bytes,
                })?;
            value = (value << 8) | u64::from(byte);
        }
        trace!("read {num_bytes} bytes at {addr:#x}: {value:#x}");
        Ok(value)
    }

    /// Writes the low `num_bytes` bytes of `value` starting at `addr`.
    ///
    /// The most significant of those bytes lands at `addr`. Every byte is
    /// stored, including zeros; higher bits of `value` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidWidth`] when `num_bytes` is outside
    /// `1..=8`. Nothing is written in that case.
    pub fn write(&mut self, value: u64, addr: u64, num_bytes: u8) -> Result<(), MemoryError> {
        check_width(addr, num_bytes)?;
        let bytes = value.to_be_bytes();
        let first = bytes.len() - usize::from(num_bytes);
        let mut target = addr;
        for byte in &bytes[first..] {
            self.space.write_byte(target, *byte);
            target = target.wrapping_add(1);
        }
        trace!("wrote {num_bytes} bytes at {addr:#x}: {value:#x}");
        Ok(())
    }

    /// Reads a single byte.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::UnmappedAddress`] when the byte was never written.
    pub fn read_byte(&self, addr: u64) -> Result<u8, MemoryError> {
        self.space.read_byte(addr)
    }

    /// Writes a single byte.
    pub fn write_byte(&mut self, addr: u64, value: u8) {
        self.space.write_byte(addr, value);
    }

    /// Image identifier, usually the executable path.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inclusive `(begin, end)` of the loaded segments.
    #[must_use]
    pub const fn loaded_range(&self) -> (u64, u64) {
        (self.begin_addr, self.end_addr)
    }

    /// First loaded address.
    #[must_use]
    pub const fn begin_addr(&self) -> u64 {
        self.begin_addr
    }

    /// Last loaded address.
    #[must_use]
    pub const fn end_addr(&self) -> u64 {
        self.end_addr
    }

    /// Start of the code segment, used to seed the program counter.
    #[must_use]
    pub const fn code_start_addr(&self) -> u64 {
        self.code_start_addr
    }

    /// Address codec shared with the backing space.
    #[must_use]
    pub const fn codec(&self) -> &AddressCodec {
        self.space.codec()
    }

    /// Backing sparse storage.
    #[must_use]
    pub const fn space(&self) -> &SparseAddressSpace {
        &self.space
    }

    /// Renders the diagnostic dump with every line prefixed by `indent`.
    #[must_use]
    pub fn dump(&self, indent: &str) -> String {
        DumpFormatter::render_with_indent(self, indent)
    }
}

const fn check_width(addr: u64, num_bytes: u8) -> Result<(), MemoryError> {
    if num_bytes == 0 || num_bytes > MAX_ACCESS_BYTES {
        Err(MemoryError::InvalidWidth { addr, num_bytes })
    } else {
        Ok(())
    }
}
